//! Latest reading per probe.

use crate::error::{ExporterError, Result};
use crate::probes::data::{ProbeIndex, Reading};
use std::sync::{Mutex, MutexGuard};

/// One slot per probe index, sized once at startup.
///
/// Each slot sits behind its own mutex and is replaced as a whole, so a
/// reader on another thread sees either the previous reading or the new
/// one, never Celsius from one cycle next to Fahrenheit from another.
#[derive(Debug)]
pub struct ReadingStore {
    slots: Box<[Mutex<Option<Reading>>]>,
}

impl ReadingStore {
    /// Create `len` slots, all unread.
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Overwrite the slot for `index`.
    pub fn update(&self, index: ProbeIndex, reading: Reading) -> Result<()> {
        let slot = self
            .slots
            .get(index.get())
            .ok_or(ExporterError::IndexOutOfRange {
                index: index.get(),
                count: self.slots.len(),
            })?;
        *lock(slot) = Some(reading);
        Ok(())
    }

    /// Current reading for `index`; `None` until its first completed cycle
    /// (and for indices outside the store).
    pub fn read(&self, index: ProbeIndex) -> Option<Reading> {
        self.slots.get(index.get()).and_then(|slot| *lock(slot))
    }

    /// Copy of every slot in index order.
    pub fn snapshot(&self) -> Vec<Option<Reading>> {
        self.slots.iter().map(|slot| *lock(slot)).collect()
    }
}

// A slot holds plain `Copy` data that is assigned in one statement, so a
// poisoned lock still guards a whole value.
fn lock(slot: &Mutex<Option<Reading>>) -> MutexGuard<'_, Option<Reading>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_store_is_unread() {
        let store = ReadingStore::new(3);
        assert_eq!(store.len(), 3);
        assert!((0..3).all(|i| store.read(ProbeIndex(i)).is_none()));
    }

    #[test]
    fn test_zero_degrees_is_a_real_reading() {
        let store = ReadingStore::new(1);
        store
            .update(ProbeIndex(0), Reading::from_celsius(0.0, 12, 10))
            .unwrap();
        let reading = store.read(ProbeIndex(0)).unwrap();
        assert_eq!(reading.celsius, 0.0);
        assert_eq!(reading.fahrenheit, 32.0);
    }

    #[test]
    fn test_update_overwrites_in_place() {
        let store = ReadingStore::new(2);
        store
            .update(ProbeIndex(1), Reading::from_celsius(20.0, 12, 1))
            .unwrap();
        store
            .update(ProbeIndex(1), Reading::from_celsius(21.0, 12, 2))
            .unwrap();
        assert_eq!(store.read(ProbeIndex(1)).unwrap().celsius, 21.0);
        assert_eq!(store.read(ProbeIndex(0)), None);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_update_out_of_range() {
        let store = ReadingStore::new(2);
        let err = store
            .update(ProbeIndex(2), Reading::from_celsius(1.0, 12, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            ExporterError::IndexOutOfRange { index: 2, count: 2 }
        ));
        assert_eq!(store.read(ProbeIndex(2)), None);
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        let store = Arc::new(ReadingStore::new(1));
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for cycle in 0..10_000u32 {
                    store
                        .update(ProbeIndex(0), Reading::from_celsius(cycle as f32, 12, cycle))
                        .unwrap();
                }
            })
        };

        for _ in 0..10_000 {
            if let Some(reading) = store.read(ProbeIndex(0)) {
                assert_eq!(reading.celsius, reading.sampled_at_ms as f32);
                assert_eq!(reading.fahrenheit, reading.celsius * 1.8 + 32.0);
            }
        }
        writer.join().unwrap();
    }
}
