//! Prometheus text exposition of the probe readings.

pub mod encoder;
pub mod writer;

// Re-export commonly used items
pub use encoder::{render, render_into, EXPOSITION_CONTENT_TYPE};
pub use writer::ExpositionWriter;
