//! # Beertemp Exporter - One-Wire Temperature Probes for Prometheus
//!
//! Samples DS18B20-style temperature probes on a one-wire bus at a fixed
//! cadence and serves the latest reading of each probe in the Prometheus
//! text exposition format.
//!
//! ## Features
//!
//! - **Startup enumeration**: probes are discovered once and get a stable index
//! - **Non-blocking sampling**: each cycle collects the previous conversion
//!   and starts the next, so the sampler never waits on the bus
//! - **Deterministic exposition**: byte-identical output for identical readings
//! - **Linux w1 support**: reads the kernel `w1_therm` sysfs interface, or a
//!   simulated bus for development
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beertemp_exporter::{
//!     start_web_server, BusDeviceDirectory, MonotonicClock, ProbeRegistry, SamplingScheduler,
//!     SimulatedBus, WebConfig,
//! };
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut bus = SimulatedBus::with_probes(2);
//!     let directory = BusDeviceDirectory::enumerate(&mut bus, 15);
//!     let registry = Arc::new(ProbeRegistry::new(directory));
//!
//!     let sampler = SamplingScheduler::new(bus, Arc::clone(&registry), 5000);
//!     tokio::spawn(sampler.run(MonotonicClock::new(), Duration::from_millis(100)));
//!
//!     start_web_server(WebConfig::default().with_port(8080), registry).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod probes;
pub mod web;

// Re-export public API
pub use error::{BusError, ExporterError, Result};
pub use metrics::{render, EXPOSITION_CONTENT_TYPE};
pub use probes::{
    BusConfig, BusDeviceDirectory, BusDriver, MonotonicClock, ProbeIdentity, ProbeIndex,
    ProbeRegistry, Reading, ReadingStore, SamplerConfig, SamplerState, SamplingScheduler,
    SimulatedBus, TickOutcome, W1SysfsBus,
};
pub use web::{create_app, start_web_server, WebConfig};

/// The default sampling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u32 = 5000;

/// How often the cooperative loop polls the scheduler, in milliseconds
pub const DEFAULT_POLL_MS: u64 = 100;

/// The maximum number of probes tracked
pub const MAX_DEVICES: usize = 15;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
