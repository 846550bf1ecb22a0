//! Linux `w1_therm` bus driver.
//!
//! Talks to the kernel one-wire subsystem through sysfs. Probes show up as
//! `<family>-<serial>` directories under the w1 root; a non-blocking
//! conversion for the whole bus is started by writing `trigger` to the bus
//! master's `therm_bulk_read` attribute. Without it every `temperature`
//! read converts synchronously in the kernel, so such buses are refused.

use crate::error::BusError;
use crate::probes::bus::{BusDriver, BusResult};
use crate::probes::data::ProbeIdentity;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Family codes served by the `w1_therm` driver.
const THERM_FAMILIES: [u8; 5] = [0x10, 0x22, 0x28, 0x3b, 0x42];

/// Worst-case conversion time of a DS18B20 at 12-bit resolution.
pub const MAX_CONVERSION_TIME: Duration = Duration::from_millis(750);

const BULK_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
struct W1Device {
    /// `None` when the directory name does not parse as an address
    id: Option<ProbeIdentity>,
    path: PathBuf,
}

/// Bus driver backed by `/sys/bus/w1/devices`.
#[derive(Debug)]
pub struct W1SysfsBus {
    root: PathBuf,
    devices: Vec<W1Device>,
    masters: Vec<PathBuf>,
}

impl W1SysfsBus {
    /// Open the bus rooted at `root` (normally `/sys/bus/w1/devices`).
    ///
    /// Fails with [`BusError::NoBulkConversion`] unless some bus master
    /// exposes `therm_bulk_read`.
    pub fn new(root: impl Into<PathBuf>) -> BusResult<Self> {
        let mut bus = Self {
            root: root.into(),
            devices: Vec::new(),
            masters: Vec::new(),
        };
        bus.rescan()?;
        if bus.bulk_read_files().is_empty() {
            return Err(BusError::NoBulkConversion { root: bus.root });
        }
        Ok(bus)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn rescan(&mut self) -> BusResult<()> {
        let mut devices = Vec::new();
        let mut masters = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("w1_bus_master") {
                masters.push(entry.path());
            } else if let Some(family) = therm_family(&name) {
                debug!(device = %name, family, "found w1_therm device");
                devices.push((name, entry.path()));
            }
        }

        // Directory order is unspecified; sort so indices are stable across restarts.
        devices.sort_by(|a, b| a.0.cmp(&b.0));
        masters.sort();

        self.devices = devices
            .into_iter()
            .map(|(name, path)| W1Device {
                id: parse_device_name(&name),
                path,
            })
            .collect();
        self.masters = masters;
        Ok(())
    }

    fn device_path(&self, id: &ProbeIdentity) -> BusResult<&Path> {
        self.devices
            .iter()
            .find(|device| device.id.as_ref() == Some(id))
            .map(|device| device.path.as_path())
            .ok_or(BusError::Disconnected { id: *id })
    }

    fn bulk_read_files(&self) -> Vec<PathBuf> {
        self.masters
            .iter()
            .map(|master| master.join("therm_bulk_read"))
            .filter(|path| path.exists())
            .collect()
    }

    fn wait_for_bulk(&self, files: &[PathBuf]) -> BusResult<()> {
        let deadline = Instant::now() + MAX_CONVERSION_TIME * 2;
        for file in files {
            // -1: conversion in progress, 1: results ready, 0: nothing pending
            while fs::read_to_string(file)?.trim() == "-1" {
                if Instant::now() >= deadline {
                    return Err(BusError::invalid_data("bulk conversion did not complete"));
                }
                thread::sleep(BULK_POLL_INTERVAL);
            }
        }
        Ok(())
    }
}

impl BusDriver for W1SysfsBus {
    fn device_count(&mut self) -> usize {
        if let Err(err) = self.rescan() {
            warn!(root = %self.root.display(), error = %err, "failed to scan w1 bus");
        }
        self.devices.len()
    }

    fn discover(&mut self, index: usize) -> BusResult<ProbeIdentity> {
        self.devices
            .get(index)
            .and_then(|device| device.id)
            .ok_or(BusError::NoDevice { index })
    }

    fn resolution(&mut self, id: &ProbeIdentity) -> BusResult<u8> {
        let raw = read_attribute(self.device_path(id)?, "resolution", id)?;
        raw.parse::<u8>()
            .map_err(|_| BusError::invalid_data(format!("resolution '{}' of {}", raw, id)))
    }

    fn request_conversion(&mut self, non_blocking: bool) -> BusResult<()> {
        let files = self.bulk_read_files();
        if files.is_empty() {
            // The master went away after startup.
            return Err(BusError::NoBulkConversion {
                root: self.root.clone(),
            });
        }

        for file in &files {
            fs::write(file, "trigger")?;
        }
        if !non_blocking {
            self.wait_for_bulk(&files)?;
        }
        Ok(())
    }

    fn temp_celsius(&mut self, id: &ProbeIdentity) -> BusResult<f32> {
        let path = self.device_path(id)?.to_path_buf();
        let millis = match read_attribute(&path, "temperature", id) {
            Ok(raw) => raw
                .parse::<i32>()
                .map_err(|_| BusError::invalid_data(format!("temperature '{}' of {}", raw, id)))?,
            Err(BusError::Disconnected { .. }) if path.join("w1_slave").exists() => {
                parse_w1_slave(&read_attribute(&path, "w1_slave", id)?, id)?
            }
            Err(err) => return Err(err),
        };
        Ok(millis as f32 / 1000.0)
    }

    fn parasite_power(&mut self) -> Option<bool> {
        let mut known = false;
        for device in &self.devices {
            let Ok(raw) = fs::read_to_string(device.path.join("ext_power")) else {
                continue;
            };
            match raw.trim() {
                "0" => return Some(true),
                "1" => known = true,
                _ => {}
            }
        }
        known.then_some(false)
    }
}

fn read_attribute(device: &Path, name: &str, id: &ProbeIdentity) -> BusResult<String> {
    match fs::read_to_string(device.join(name)) {
        Ok(raw) => Ok(raw.trim().to_string()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(BusError::Disconnected { id: *id }),
        Err(err) => Err(err.into()),
    }
}

/// Family byte of a `w1_therm` device directory name, if it is one.
fn therm_family(name: &str) -> Option<u8> {
    let (family, _) = name.split_once('-')?;
    let family = u8::from_str_radix(family, 16).ok()?;
    THERM_FAMILIES.contains(&family).then_some(family)
}

/// Parse `28-0316a2796bff` into a full ROM address.
///
/// sysfs prints the 48-bit serial most significant byte first.
fn parse_device_name(name: &str) -> Option<ProbeIdentity> {
    let (family, serial) = name.split_once('-')?;
    if family.len() != 2 || serial.len() != 12 {
        return None;
    }
    let family = u8::from_str_radix(family, 16).ok()?;
    let serial = u64::from_str_radix(serial, 16).ok()?;
    Some(ProbeIdentity::from_parts(family, serial))
}

/// Parse the legacy two-line `w1_slave` output into millidegrees.
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
fn parse_w1_slave(raw: &str, id: &ProbeIdentity) -> BusResult<i32> {
    let mut lines = raw.lines();
    let crc_ok = lines.next().is_some_and(|line| line.trim_end().ends_with("YES"));
    if !crc_ok {
        return Err(BusError::invalid_data(format!("CRC mismatch reading {}", id)));
    }
    lines
        .next()
        .and_then(|line| line.rsplit_once("t="))
        .and_then(|(_, value)| value.trim().parse::<i32>().ok())
        .ok_or_else(|| BusError::invalid_data(format!("no temperature in w1_slave of {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_device(root: &Path, name: &str, temperature: Option<&str>, resolution: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        if let Some(temperature) = temperature {
            fs::write(dir.join("temperature"), temperature).unwrap();
        }
        fs::write(dir.join("resolution"), resolution).unwrap();
    }

    fn add_master(root: &Path) {
        let master = root.join("w1_bus_master1");
        fs::create_dir_all(&master).unwrap();
        fs::write(master.join("therm_bulk_read"), "0").unwrap();
    }

    fn fake_bus() -> TempDir {
        let root = TempDir::new().unwrap();
        add_master(root.path());
        add_device(root.path(), "28-0316a2796bff", Some("23125\n"), "12\n");
        add_device(root.path(), "28-000005e2fdc3", Some("-1500\n"), "9\n");
        // Not a temperature sensor family.
        fs::create_dir_all(root.path().join("01-000000000001")).unwrap();
        root
    }

    #[test]
    fn test_enumerates_therm_devices_sorted() {
        let root = fake_bus();
        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        assert_eq!(bus.device_count(), 2);

        let first = bus.discover(0).unwrap();
        assert_eq!(first.family(), 0x28);
        assert_eq!(&first.as_bytes()[1..7], &[0xc3, 0xfd, 0xe2, 0x05, 0x00, 0x00]);
        assert!(first.crc_valid());
        assert!(matches!(bus.discover(2), Err(BusError::NoDevice { index: 2 })));
    }

    #[test]
    fn test_reads_temperature_and_resolution() {
        let root = fake_bus();
        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        let cold = bus.discover(0).unwrap();
        let warm = bus.discover(1).unwrap();

        assert_eq!(bus.temp_celsius(&warm).unwrap(), 23.125);
        assert_eq!(bus.temp_celsius(&cold).unwrap(), -1.5);
        assert_eq!(bus.resolution(&cold).unwrap(), 9);
    }

    #[test]
    fn test_non_blocking_request_writes_trigger() {
        let root = fake_bus();
        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        bus.request_conversion(true).unwrap();
        let written =
            fs::read_to_string(root.path().join("w1_bus_master1/therm_bulk_read")).unwrap();
        assert_eq!(written, "trigger");
    }

    #[test]
    fn test_falls_back_to_w1_slave() {
        let root = TempDir::new().unwrap();
        add_master(root.path());
        add_device(root.path(), "28-0316a2796bff", None, "12");
        fs::write(
            root.path().join("28-0316a2796bff/w1_slave"),
            "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n",
        )
        .unwrap();

        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        let id = bus.discover(0).unwrap();
        assert_eq!(bus.temp_celsius(&id).unwrap(), 23.125);
    }

    #[test]
    fn test_w1_slave_crc_failure() {
        let id = ProbeIdentity::from_parts(0x28, 1);
        let raw = "72 01 4b 46 7f ff 0e 10 57 : crc=00 NO\n72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        assert!(matches!(
            parse_w1_slave(raw, &id),
            Err(BusError::InvalidData(_))
        ));
    }

    #[test]
    fn test_missing_device_is_disconnected() {
        let root = fake_bus();
        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        let id = bus.discover(1).unwrap();
        fs::remove_dir_all(root.path().join("28-0316a2796bff")).unwrap();
        assert!(matches!(
            bus.temp_celsius(&id),
            Err(BusError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_malformed_name_is_ghost() {
        let root = TempDir::new().unwrap();
        add_master(root.path());
        fs::create_dir_all(root.path().join("28-zzzz")).unwrap();
        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        assert_eq!(bus.device_count(), 1);
        assert!(matches!(bus.discover(0), Err(BusError::NoDevice { index: 0 })));
    }

    #[test]
    fn test_parasite_power_from_ext_power() {
        let root = fake_bus();
        fs::write(root.path().join("28-0316a2796bff/ext_power"), "1\n").unwrap();
        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        assert_eq!(bus.parasite_power(), Some(false));

        fs::write(root.path().join("28-000005e2fdc3/ext_power"), "0\n").unwrap();
        assert_eq!(bus.parasite_power(), Some(true));
    }

    #[test]
    fn test_bus_without_bulk_read_is_refused() {
        let root = TempDir::new().unwrap();
        add_device(root.path(), "28-0316a2796bff", Some("23125\n"), "12\n");
        assert!(matches!(
            W1SysfsBus::new(root.path()),
            Err(BusError::NoBulkConversion { .. })
        ));

        // A master without the attribute is no better than none at all.
        fs::create_dir_all(root.path().join("w1_bus_master1")).unwrap();
        assert!(matches!(
            W1SysfsBus::new(root.path()),
            Err(BusError::NoBulkConversion { .. })
        ));
    }

    #[test]
    fn test_request_fails_once_bulk_read_disappears() {
        let root = fake_bus();
        let mut bus = W1SysfsBus::new(root.path()).unwrap();
        fs::remove_dir_all(root.path().join("w1_bus_master1")).unwrap();
        assert!(matches!(
            bus.request_conversion(true),
            Err(BusError::NoBulkConversion { .. })
        ));
    }
}
