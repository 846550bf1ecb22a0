//! Data structures for probes and their readings.

use serde::{Serialize, Serializer};
use std::fmt;

/// Length of a one-wire ROM address in bytes.
pub const ADDRESS_LEN: usize = 8;

/// 64-bit one-wire ROM address of a probe: family code, 48-bit serial
/// (least significant byte first) and CRC-8, in bus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeIdentity([u8; ADDRESS_LEN]);

impl ProbeIdentity {
    /// Wrap raw ROM bytes as read from the bus.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a family code and a 48-bit serial number,
    /// computing the trailing CRC the way the probe itself does.
    pub fn from_parts(family: u8, serial: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = family;
        for (i, byte) in bytes[1..7].iter_mut().enumerate() {
            *byte = (serial >> (8 * i)) as u8;
        }
        bytes[7] = crc8(&bytes[..7]);
        Self(bytes)
    }

    /// Raw ROM bytes in bus order.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Family code (0x28 for a DS18B20).
    pub fn family(&self) -> u8 {
        self.0[0]
    }

    /// Whether the trailing byte matches the CRC of the first seven.
    pub fn crc_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }
}

/// Renders as 16 lowercase hex digits, two per byte, zero-padded.
impl fmt::Display for ProbeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for ProbeIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Dense, startup-assigned position of a probe in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProbeIndex(pub usize);

impl ProbeIndex {
    /// Position as a plain slot index.
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProbeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Latest completed measurement of one probe.
///
/// Both temperatures always come from the same conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Temperature in degrees Celsius
    pub celsius: f32,
    /// Temperature in degrees Fahrenheit
    pub fahrenheit: f32,
    /// Conversion resolution in bits (9 to 12 for a DS18B20)
    pub resolution_bits: u8,
    /// Monotonic clock value (ms, wrapping) of the tick that collected it
    pub sampled_at_ms: u32,
}

impl Reading {
    /// Build a reading from a Celsius value, deriving Fahrenheit from it.
    pub fn from_celsius(celsius: f32, resolution_bits: u8, sampled_at_ms: u32) -> Self {
        Self {
            celsius,
            fahrenheit: celsius_to_fahrenheit(celsius),
            resolution_bits,
            sampled_at_ms,
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

/// Summary of a discovered probe, as reported by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeInfo {
    pub index: ProbeIndex,
    pub id: ProbeIdentity,
    pub resolution_bits: u8,
}
