//! Renders the probe registry as Prometheus text exposition.
//!
//! Output is a pure function of the registry contents: families always
//! appear in the same order, probes in ascending index order, and values
//! with exactly two fractional digits. Probes that have not completed a
//! conversion yet are left out of the temperature families rather than
//! reported as zero; they still count towards the device total.

use crate::metrics::writer::ExpositionWriter;
use crate::probes::registry::ProbeRegistry;
use std::fmt::{self, Display, Write};

/// Content type of the exposition format, version 0.0.4.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const DEVICE_TOTAL: &str = "beertemp_device_total";
pub const TEMPERATURE_CELSIUS: &str = "beertemp_device_temperature_celsius";
pub const TEMPERATURE_FAHRENHEIT: &str = "beertemp_device_temperature_fahrenheit";

const DEVICE_TOTAL_HELP: &str = "A count of probe devices connected.";
const CELSIUS_HELP: &str = "Current device temperature in celsius.";
const FAHRENHEIT_HELP: &str = "Current device temperature in fahrenheit.";

// Upper bounds used to size the output buffer.
const FAMILY_HEADER_BYTES: usize = 160;
const SAMPLE_LINE_BYTES: usize = 112;

/// Bytes to reserve for rendering `probes` probes.
///
/// Covers three family headers, the device total and two sample lines per
/// probe; a render only reallocates if a value is unusually wide.
pub fn estimated_len(probes: usize) -> usize {
    3 * FAMILY_HEADER_BYTES + SAMPLE_LINE_BYTES * (1 + 2 * probes)
}

/// Render the registry into a freshly sized string.
pub fn render(registry: &ProbeRegistry) -> String {
    let mut out = String::with_capacity(estimated_len(registry.directory().len()));
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, registry);
    out
}

/// Render the registry into any text sink.
pub fn render_into<W: Write>(out: W, registry: &ProbeRegistry) -> fmt::Result {
    let mut writer = ExpositionWriter::new(out);

    writer.gauge_family(DEVICE_TOTAL, DEVICE_TOTAL_HELP)?;
    writer.sample(DEVICE_TOTAL, &[], registry.directory().len())?;

    // One consistent copy per probe, so both families agree even while the
    // sampler is writing.
    let readings: Vec<_> = registry
        .readings()
        .filter_map(|(probe, reading)| reading.map(|reading| (probe, reading)))
        .collect();
    if readings.is_empty() {
        return Ok(());
    }

    writer.gauge_family(TEMPERATURE_CELSIUS, CELSIUS_HELP)?;
    for (probe, reading) in &readings {
        let labels = [
            ("id", &probe.id as &dyn Display),
            ("resolution", &probe.resolution_bits as &dyn Display),
        ];
        writer.sample(TEMPERATURE_CELSIUS, &labels, format_args!("{:.2}", reading.celsius))?;
    }

    writer.gauge_family(TEMPERATURE_FAHRENHEIT, FAHRENHEIT_HELP)?;
    for (probe, reading) in &readings {
        let labels = [
            ("id", &probe.id as &dyn Display),
            ("resolution", &probe.resolution_bits as &dyn Display),
        ];
        writer.sample(
            TEMPERATURE_FAHRENHEIT,
            &labels,
            format_args!("{:.2}", reading.fahrenheit),
        )?;
    }

    Ok(())
}
