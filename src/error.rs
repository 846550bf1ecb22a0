//! Error handling for the beertemp exporter.

use crate::probes::data::ProbeIdentity;
use std::path::PathBuf;

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Failures reported by a bus driver for a single operation.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// A device answered the search at this position but its address could not be read
    #[error("no readable device address at bus position {index}")]
    NoDevice { index: usize },

    /// The probe did not answer (unplugged, bad cabling, or lost power)
    #[error("probe {id} is disconnected")]
    Disconnected { id: ProbeIdentity },

    /// The probe answered with something that is not a temperature
    #[error("invalid data from bus: {0}")]
    InvalidData(String),

    /// No bus master can start a conversion without blocking the reader
    #[error("no bus master under {} provides therm_bulk_read", .root.display())]
    NoBulkConversion { root: PathBuf },

    /// I/O error talking to the bus master
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BusError {
    /// Create a new invalid data error
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }
}

/// The main error type for the exporter.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// Bus operation failed
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// A probe index outside the enumerated directory was used
    #[error("Probe index {index} out of range (device count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExporterError {
    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
