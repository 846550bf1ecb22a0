//! Startup enumeration of the probes on the bus.

use crate::probes::bus::BusDriver;
use crate::probes::data::{ProbeIdentity, ProbeIndex, ProbeInfo};
use tracing::{debug, info, warn};

/// Resolution recorded when a probe does not report one (DS18B20 power-on default).
pub const DEFAULT_RESOLUTION_BITS: u8 = 12;

/// Fixed set of probes found at startup, in discovery order.
///
/// Ghost devices (present on the bus but with an unreadable address) are
/// skipped and do not consume a slot, so indices stay dense.
#[derive(Debug, Clone, Default)]
pub struct BusDeviceDirectory {
    probes: Vec<ProbeInfo>,
}

impl BusDeviceDirectory {
    /// Walk the bus once and record up to `max_devices` probes.
    ///
    /// Probes beyond the capacity are ignored. Nothing is retried.
    pub fn enumerate<B: BusDriver + ?Sized>(bus: &mut B, max_devices: usize) -> Self {
        match bus.parasite_power() {
            Some(true) => info!("Parasite power is ON"),
            Some(false) => info!("Parasite power is OFF"),
            None => debug!("Parasite power mode unknown"),
        }

        let found = bus.device_count();
        if found > max_devices {
            debug!(found, max_devices, "more devices on the bus than slots, truncating");
        }

        let mut probes = Vec::with_capacity(found.min(max_devices));
        for position in 0..found {
            if probes.len() == max_devices {
                break;
            }

            let id = match bus.discover(position) {
                Ok(id) => id,
                Err(err) => {
                    warn!(
                        position,
                        error = %err,
                        "Found ghost device but could not detect address. Check power and cabling"
                    );
                    continue;
                }
            };

            let resolution_bits = bus.resolution(&id).unwrap_or_else(|err| {
                warn!(probe = %id, error = %err, "could not read resolution, assuming {} bits", DEFAULT_RESOLUTION_BITS);
                DEFAULT_RESOLUTION_BITS
            });

            let index = ProbeIndex(probes.len());
            info!(index = index.get(), probe = %id, resolution_bits, "Found device");
            probes.push(ProbeInfo {
                index,
                id,
                resolution_bits,
            });
        }

        info!("Device count: {}", probes.len());
        Self { probes }
    }

    /// Build a directory from known probes, keeping at most `max_devices`.
    pub fn from_probes(
        probes: impl IntoIterator<Item = (ProbeIdentity, u8)>,
        max_devices: usize,
    ) -> Self {
        let probes = probes
            .into_iter()
            .take(max_devices)
            .enumerate()
            .map(|(i, (id, resolution_bits))| ProbeInfo {
                index: ProbeIndex(i),
                id,
                resolution_bits,
            })
            .collect();
        Self { probes }
    }

    /// Number of enumerated probes; fixed for the life of the directory.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn get(&self, index: ProbeIndex) -> Option<&ProbeInfo> {
        self.probes.get(index.get())
    }

    pub fn identity_of(&self, index: ProbeIndex) -> Option<ProbeIdentity> {
        self.get(index).map(|probe| probe.id)
    }

    pub fn resolution_of(&self, index: ProbeIndex) -> Option<u8> {
        self.get(index).map(|probe| probe.resolution_bits)
    }

    /// Probes in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = &ProbeInfo> {
        self.probes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::simulated::{SimulatedBus, DS18B20_FAMILY};

    #[test]
    fn test_enumerate_assigns_dense_indices() {
        let mut bus = SimulatedBus::with_probes(3);
        let directory = BusDeviceDirectory::enumerate(&mut bus, 15);

        assert_eq!(directory.len(), 3);
        for (i, probe) in directory.iter().enumerate() {
            assert_eq!(probe.index, ProbeIndex(i));
            assert_eq!(directory.identity_of(ProbeIndex(i)), Some(probe.id));
            assert_eq!(directory.resolution_of(ProbeIndex(i)), Some(12));
        }
        assert_eq!(directory.identity_of(ProbeIndex(3)), None);
    }

    #[test]
    fn test_enumerate_truncates_to_capacity() {
        let mut bus = SimulatedBus::with_probes(20);
        let directory = BusDeviceDirectory::enumerate(&mut bus, 15);
        assert_eq!(directory.len(), 15);
        assert!(directory.get(ProbeIndex(14)).is_some());
        assert!(directory.get(ProbeIndex(15)).is_none());
    }

    #[test]
    fn test_ghost_devices_are_skipped() {
        let a = ProbeIdentity::from_parts(DS18B20_FAMILY, 0xa);
        let b = ProbeIdentity::from_parts(DS18B20_FAMILY, 0xb);
        let mut bus = SimulatedBus::new()
            .with_ghost()
            .with_probe(a, 10, 20.0)
            .with_ghost()
            .with_probe(b, 11, 21.0);

        let directory = BusDeviceDirectory::enumerate(&mut bus, 15);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.identity_of(ProbeIndex(0)), Some(a));
        assert_eq!(directory.identity_of(ProbeIndex(1)), Some(b));
        assert_eq!(directory.resolution_of(ProbeIndex(1)), Some(11));
    }

    #[test]
    fn test_ghosts_do_not_consume_capacity() {
        let mut bus = SimulatedBus::new().with_ghost();
        for i in 0..3 {
            bus = bus.with_probe(ProbeIdentity::from_parts(DS18B20_FAMILY, i), 12, 20.0);
        }
        let directory = BusDeviceDirectory::enumerate(&mut bus, 2);
        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory.identity_of(ProbeIndex(0)),
            Some(ProbeIdentity::from_parts(DS18B20_FAMILY, 0))
        );
    }

    #[test]
    fn test_from_probes_truncates() {
        let probes = (0..5).map(|i| (ProbeIdentity::from_parts(DS18B20_FAMILY, i), 9));
        let directory = BusDeviceDirectory::from_probes(probes, 4);
        assert_eq!(directory.len(), 4);
        assert_eq!(directory.resolution_of(ProbeIndex(3)), Some(9));
    }
}
