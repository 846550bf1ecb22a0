//! Directory and readings bundled as one shared object.

use crate::probes::data::{ProbeInfo, Reading};
use crate::probes::directory::BusDeviceDirectory;
use crate::probes::store::ReadingStore;

/// The enumerated probes plus one reading slot per probe.
///
/// Written only by the sampler; read by any number of renderers.
#[derive(Debug)]
pub struct ProbeRegistry {
    directory: BusDeviceDirectory,
    store: ReadingStore,
}

impl ProbeRegistry {
    /// Create the registry with every slot unread.
    pub fn new(directory: BusDeviceDirectory) -> Self {
        let store = ReadingStore::new(directory.len());
        Self { directory, store }
    }

    pub fn directory(&self) -> &BusDeviceDirectory {
        &self.directory
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Every probe with its current reading, in ascending index order.
    pub fn readings(&self) -> impl Iterator<Item = (&ProbeInfo, Option<Reading>)> + '_ {
        self.directory
            .iter()
            .map(|probe| (probe, self.store.read(probe.index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::data::{ProbeIdentity, ProbeIndex};

    #[test]
    fn test_store_matches_directory() {
        let probes = (0..4).map(|i| (ProbeIdentity::from_parts(0x28, i), 12));
        let registry = ProbeRegistry::new(BusDeviceDirectory::from_probes(probes, 15));
        assert_eq!(registry.store().len(), registry.directory().len());

        registry
            .store()
            .update(ProbeIndex(2), Reading::from_celsius(19.5, 12, 0))
            .unwrap();
        let readings: Vec<_> = registry.readings().map(|(_, r)| r.is_some()).collect();
        assert_eq!(readings, vec![false, false, true, false]);
    }
}
