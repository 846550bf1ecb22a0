//! Contract between the sampler and the one-wire bus.
//!
//! The sampler owns its bus exclusively; nothing else issues bus commands.

use crate::error::BusError;
use crate::probes::data::{celsius_to_fahrenheit, ProbeIdentity};

/// Result of a single bus operation.
pub type BusResult<T> = std::result::Result<T, BusError>;

/// Narrow view of a one-wire temperature bus.
pub trait BusDriver: Send {
    /// Number of devices that answered the bus search.
    fn device_count(&mut self) -> usize;

    /// Address of the device at a search position.
    ///
    /// Fails with [`BusError::NoDevice`] when a device is present but its
    /// address cannot be read.
    fn discover(&mut self, index: usize) -> BusResult<ProbeIdentity>;

    /// Conversion resolution of a probe, in bits.
    fn resolution(&mut self, id: &ProbeIdentity) -> BusResult<u8>;

    /// Ask every probe on the bus to start a conversion.
    ///
    /// With `non_blocking` set the call returns as soon as the command is
    /// issued; results become readable once the conversion completes.
    fn request_conversion(&mut self, non_blocking: bool) -> BusResult<()>;

    /// Result of the last completed conversion, in degrees Celsius.
    fn temp_celsius(&mut self, id: &ProbeIdentity) -> BusResult<f32>;

    /// Result of the last completed conversion, in degrees Fahrenheit.
    fn temp_fahrenheit(&mut self, id: &ProbeIdentity) -> BusResult<f32> {
        self.temp_celsius(id).map(celsius_to_fahrenheit)
    }

    /// Whether any probe draws parasite power from the data line, if known.
    fn parasite_power(&mut self) -> Option<bool> {
        None
    }
}

impl<B: BusDriver + ?Sized> BusDriver for Box<B> {
    fn device_count(&mut self) -> usize {
        (**self).device_count()
    }

    fn discover(&mut self, index: usize) -> BusResult<ProbeIdentity> {
        (**self).discover(index)
    }

    fn resolution(&mut self, id: &ProbeIdentity) -> BusResult<u8> {
        (**self).resolution(id)
    }

    fn request_conversion(&mut self, non_blocking: bool) -> BusResult<()> {
        (**self).request_conversion(non_blocking)
    }

    fn temp_celsius(&mut self, id: &ProbeIdentity) -> BusResult<f32> {
        (**self).temp_celsius(id)
    }

    fn temp_fahrenheit(&mut self, id: &ProbeIdentity) -> BusResult<f32> {
        (**self).temp_fahrenheit(id)
    }

    fn parasite_power(&mut self) -> Option<bool> {
        (**self).parasite_power()
    }
}
