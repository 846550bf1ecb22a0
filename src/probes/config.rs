//! Sampler and bus configuration.

use crate::error::{BusError, ExporterError, Result};
use crate::probes::bus::BusDriver;
use crate::probes::simulated::SimulatedBus;
use crate::probes::w1::W1SysfsBus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the kernel one-wire devices.
pub const DEFAULT_W1_ROOT: &str = "/sys/bus/w1/devices";

/// Configuration for the sampling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Cadence between sampling cycles, in milliseconds
    pub interval_ms: u32,
    /// Maximum number of probes tracked; extra probes are ignored
    pub max_devices: usize,
    /// How often the cooperative loop calls `tick`, in milliseconds
    pub poll_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: crate::DEFAULT_INTERVAL_MS,
            max_devices: crate::MAX_DEVICES,
            poll_ms: crate::DEFAULT_POLL_MS,
        }
    }
}

impl SamplerConfig {
    /// Set the sampling interval.
    pub fn with_interval_ms(mut self, interval_ms: u32) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the probe capacity.
    pub fn with_max_devices(mut self, max_devices: usize) -> Self {
        self.max_devices = max_devices;
        self
    }

    /// Set the tick polling period.
    pub fn with_poll_ms(mut self, poll_ms: u64) -> Self {
        self.poll_ms = poll_ms;
        self
    }

    /// Reject values the sampler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(ExporterError::config_error("interval must be greater than zero"));
        }
        if self.max_devices == 0 {
            return Err(ExporterError::config_error("max devices must be greater than zero"));
        }
        if self.poll_ms == 0 {
            return Err(ExporterError::config_error("poll period must be greater than zero"));
        }
        Ok(())
    }
}

/// Which bus driver to sample from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusConfig {
    /// Linux `w1_therm` devices under `root`
    W1Sysfs { root: PathBuf },
    /// In-memory bus with `probes` simulated DS18B20s
    Simulated { probes: usize },
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::W1Sysfs {
            root: PathBuf::from(DEFAULT_W1_ROOT),
        }
    }
}

impl BusConfig {
    /// Open the configured bus.
    pub fn open(&self) -> Result<Box<dyn BusDriver>> {
        match self {
            Self::W1Sysfs { root } => {
                if !root.is_dir() {
                    return Err(ExporterError::config_error(format!(
                        "w1 device directory {} does not exist (is the w1-gpio overlay loaded?)",
                        root.display()
                    )));
                }
                let bus = W1SysfsBus::new(root.clone()).map_err(|err| match err {
                    BusError::NoBulkConversion { .. } => ExporterError::config_error(format!(
                        "{} (non-blocking conversion needs the w1_therm driver from Linux 5.10 or later)",
                        err
                    )),
                    err => err.into(),
                })?;
                Ok(Box::new(bus))
            }
            Self::Simulated { probes } => Ok(Box::new(SimulatedBus::with_probes(*probes))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_config_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.interval_ms, 5000);
        assert_eq!(config.max_devices, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampler_config_validation() {
        assert!(SamplerConfig::default().with_interval_ms(0).validate().is_err());
        assert!(SamplerConfig::default().with_max_devices(0).validate().is_err());
        assert!(SamplerConfig::default().with_poll_ms(0).validate().is_err());
    }

    #[test]
    fn test_bus_config_serde() {
        let json = r#"{"kind":"simulated","probes":3}"#;
        let config: BusConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, BusConfig::Simulated { probes: 3 });
    }

    #[test]
    fn test_open_simulated_bus() {
        let mut bus = BusConfig::Simulated { probes: 4 }.open().unwrap();
        assert_eq!(bus.device_count(), 4);
    }

    #[test]
    fn test_open_missing_w1_root() {
        let config = BusConfig::W1Sysfs {
            root: PathBuf::from("/nonexistent/w1/devices"),
        };
        assert!(matches!(config.open(), Err(ExporterError::Config(_))));
    }

    #[test]
    fn test_open_w1_root_without_bulk_read() {
        let root = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("28-0316a2796bff")).unwrap();
        let config = BusConfig::W1Sysfs {
            root: root.path().to_path_buf(),
        };
        match config.open() {
            Err(ExporterError::Config(msg)) => assert!(msg.contains("therm_bulk_read")),
            other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
        }
    }
}
