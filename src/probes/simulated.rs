//! In-memory bus for tests, benchmarks and running without hardware.
//!
//! Conversions behave like the real thing: a value only becomes readable
//! after a conversion request, and what is readable is the temperature the
//! probe saw when the latest request was issued.

use crate::error::BusError;
use crate::probes::bus::{BusDriver, BusResult};
use crate::probes::data::ProbeIdentity;

/// DS18B20 family code.
pub const DS18B20_FAMILY: u8 = 0x28;

#[derive(Debug, Clone)]
struct SimulatedProbe {
    /// `None` models a ghost device whose address cannot be read
    id: Option<ProbeIdentity>,
    resolution_bits: u8,
    temperature: f32,
    converted: Option<f32>,
    failing: bool,
}

/// Scripted one-wire bus.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    probes: Vec<SimulatedProbe>,
    fail_requests: bool,
    parasite: Option<bool>,
    requests: Vec<bool>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus with `count` DS18B20 probes, each at a distinct temperature.
    pub fn with_probes(count: usize) -> Self {
        (0..count).fold(Self::new(), |bus, i| {
            bus.with_probe(
                ProbeIdentity::from_parts(DS18B20_FAMILY, 0x0316_a279_6b00 + i as u64),
                12,
                18.0 + i as f32 * 0.5,
            )
        })
    }

    pub fn with_probe(mut self, id: ProbeIdentity, resolution_bits: u8, celsius: f32) -> Self {
        self.probes.push(SimulatedProbe {
            id: Some(id),
            resolution_bits,
            temperature: celsius,
            converted: None,
            failing: false,
        });
        self
    }

    /// Add a device that answers the search but whose address is unreadable.
    pub fn with_ghost(mut self) -> Self {
        self.probes.push(SimulatedProbe {
            id: None,
            resolution_bits: 0,
            temperature: 0.0,
            converted: None,
            failing: true,
        });
        self
    }

    pub fn with_parasite_power(mut self, parasite: bool) -> Self {
        self.parasite = Some(parasite);
        self
    }

    /// Change the temperature a probe will report at its next conversion.
    pub fn set_temperature(&mut self, position: usize, celsius: f32) {
        if let Some(probe) = self.probes.get_mut(position) {
            probe.temperature = celsius;
        }
    }

    /// Make a probe stop (or resume) answering reads.
    pub fn set_failing(&mut self, position: usize, failing: bool) {
        if let Some(probe) = self.probes.get_mut(position) {
            probe.failing = failing;
        }
    }

    /// Make every conversion request fail.
    pub fn set_request_failure(&mut self, fail: bool) {
        self.fail_requests = fail;
    }

    /// The `non_blocking` flag of every conversion request issued so far.
    pub fn conversion_requests(&self) -> &[bool] {
        &self.requests
    }

    fn probe_mut(&mut self, id: &ProbeIdentity) -> BusResult<&mut SimulatedProbe> {
        self.probes
            .iter_mut()
            .find(|probe| probe.id.as_ref() == Some(id))
            .ok_or(BusError::Disconnected { id: *id })
    }
}

impl BusDriver for SimulatedBus {
    fn device_count(&mut self) -> usize {
        self.probes.len()
    }

    fn discover(&mut self, index: usize) -> BusResult<ProbeIdentity> {
        self.probes
            .get(index)
            .and_then(|probe| probe.id)
            .ok_or(BusError::NoDevice { index })
    }

    fn resolution(&mut self, id: &ProbeIdentity) -> BusResult<u8> {
        Ok(self.probe_mut(id)?.resolution_bits)
    }

    fn request_conversion(&mut self, non_blocking: bool) -> BusResult<()> {
        self.requests.push(non_blocking);
        if self.fail_requests {
            return Err(BusError::invalid_data("conversion request not acknowledged"));
        }
        for probe in self.probes.iter_mut().filter(|probe| !probe.failing) {
            probe.converted = Some(probe.temperature);
        }
        Ok(())
    }

    fn temp_celsius(&mut self, id: &ProbeIdentity) -> BusResult<f32> {
        let probe = self.probe_mut(id)?;
        if probe.failing {
            return Err(BusError::Disconnected { id: *id });
        }
        probe
            .converted
            .ok_or_else(|| BusError::invalid_data(format!("probe {} has not converted yet", id)))
    }

    fn parasite_power(&mut self) -> Option<bool> {
        self.parasite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_readable_only_after_request() {
        let id = ProbeIdentity::from_parts(DS18B20_FAMILY, 1);
        let mut bus = SimulatedBus::new().with_probe(id, 12, 20.0);
        assert!(bus.temp_celsius(&id).is_err());

        bus.request_conversion(true).unwrap();
        bus.set_temperature(0, 30.0);
        assert_eq!(bus.temp_celsius(&id).unwrap(), 20.0);

        bus.request_conversion(true).unwrap();
        assert_eq!(bus.temp_celsius(&id).unwrap(), 30.0);
        assert_eq!(bus.conversion_requests(), &[true, true]);
    }

    #[test]
    fn test_ghost_device_has_no_address() {
        let mut bus = SimulatedBus::new().with_ghost();
        assert_eq!(bus.device_count(), 1);
        assert!(matches!(bus.discover(0), Err(BusError::NoDevice { index: 0 })));
    }

    #[test]
    fn test_failing_probe_reports_disconnected() {
        let mut bus = SimulatedBus::with_probes(2);
        let id = bus.discover(1).unwrap();
        bus.request_conversion(true).unwrap();
        bus.set_failing(1, true);
        assert!(matches!(
            bus.temp_celsius(&id),
            Err(BusError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_with_probes_generates_distinct_addresses() {
        let mut bus = SimulatedBus::with_probes(3);
        let a = bus.discover(0).unwrap();
        let b = bus.discover(2).unwrap();
        assert_ne!(a, b);
        assert!(a.crc_valid());
        assert_eq!(bus.resolution(&b).unwrap(), 12);
    }
}
