//! Probe enumeration, sampling and reading storage.
//!
//! This module owns everything between the one-wire bus and the latest
//! per-probe readings: the bus driver contract and its implementations, the
//! startup device directory, the reading store, and the sampling scheduler
//! that keeps the store fresh without ever blocking on a conversion.

pub mod bus;
pub mod config;
pub mod data;
pub mod directory;
pub mod registry;
pub mod scheduler;
pub mod simulated;
pub mod store;
pub mod w1;

// Re-export commonly used items
pub use bus::BusDriver;
pub use config::{BusConfig, SamplerConfig};
pub use data::{ProbeIdentity, ProbeIndex, ProbeInfo, Reading};
pub use directory::BusDeviceDirectory;
pub use registry::ProbeRegistry;
pub use scheduler::{MonotonicClock, SamplerState, SamplingScheduler, TickOutcome};
pub use simulated::SimulatedBus;
pub use store::ReadingStore;
pub use w1::W1SysfsBus;
