//! HID channel to the mouse's vendor command interface.
//!
//! The mouse exposes several HID interfaces; the one that accepts vendor
//! commands is identified by a vendor-defined usage page/usage pair in
//! addition to the VID/PID. Discovery picks the first enumerated interface
//! matching all four, and the polling rate is set with a single fixed-layout
//! output report.

use hidapi::{HidApi, HidDevice};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Finalmouse USB Vendor ID.
pub const VENDOR_ID: u16 = 0x361D;
/// ULX product ID.
pub const PRODUCT_ID: u16 = 0x0100;

/// Vendor-defined usage page/usage identifying the command interface.
const USAGE_PAGE: u16 = 0xFF00;
const USAGE: u16 = 0x0001;

const REPORT_ID: u8 = 0x04;
/// Output report length including the report-id byte.
const REPORT_LEN: usize = 64;
const CMD_MARKER: u8 = 0x04;
const CMD_POLLING_RATE: u8 = 0x91;
const CMD_SUB: u8 = 0x02;

/// HID channel error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HID device communication failure.
    #[error("HID error: {0}")]
    Hid(String),

    /// No interface matching VID/PID/usage-page/usage during enumeration.
    #[error("no matching device found")]
    DeviceNotFound,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Abstraction over the rate-setting channel so the polling loop can be
/// driven against a mock device in tests.
pub trait RateChannel: Send {
    /// Discover and exclusively open the command interface, closing any
    /// previously held handle first.
    fn open(&self) -> Result<()>;

    /// Write the polling-rate command, opening the channel first if needed.
    /// A failed write invalidates the handle; retrying is the caller's job.
    fn set_rate(&self, hz: u16) -> Result<()>;

    /// Release the handle. Idempotent, never errors.
    fn close(&self);
}

/// Builds the fixed-layout rate command report.
fn build_rate_report(hz: u16) -> [u8; REPORT_LEN] {
    let mut report = [0u8; REPORT_LEN];
    report[0] = REPORT_ID;
    report[1] = CMD_MARKER;
    report[2] = CMD_POLLING_RATE;
    report[3] = CMD_SUB;
    report[4..6].copy_from_slice(&hz.to_le_bytes());
    report
}

/// The real HID channel. At most one open handle at a time, guarded by a
/// mutex so a second caller cannot corrupt the open/invalidate transitions.
pub struct DeviceChannel {
    handle: Mutex<Option<HidDevice>>,
}

impl DeviceChannel {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Rediscovers and opens the command interface into `slot`.
    ///
    /// Runs under the channel mutex (the caller holds the guard). Any
    /// previous handle is dropped first so a half-dead handle can't leak.
    fn open_slot(slot: &mut Option<HidDevice>) -> Result<()> {
        *slot = None;

        let api = HidApi::new().map_err(|e| Error::Hid(e.to_string()))?;
        let target = api
            .device_list()
            .find(|d| {
                d.vendor_id() == VENDOR_ID
                    && d.product_id() == PRODUCT_ID
                    && d.usage_page() == USAGE_PAGE
                    && d.usage() == USAGE
            })
            .ok_or(Error::DeviceNotFound)?;

        info!(
            vid = format_args!("0x{:04X}", target.vendor_id()),
            pid = format_args!("0x{:04X}", target.product_id()),
            path = %target.path().to_string_lossy(),
            "Found mouse command interface"
        );

        let device = target
            .open_device(&api)
            .map_err(|e| Error::Hid(e.to_string()))?;
        *slot = Some(device);
        Ok(())
    }
}

impl RateChannel for DeviceChannel {
    fn open(&self) -> Result<()> {
        let mut slot = self.handle.lock().unwrap();
        Self::open_slot(&mut slot)
    }

    fn set_rate(&self, hz: u16) -> Result<()> {
        let mut slot = self.handle.lock().unwrap();
        if slot.is_none() {
            Self::open_slot(&mut slot)?;
        }
        let Some(device) = slot.as_ref() else {
            return Err(Error::DeviceNotFound);
        };

        let report = build_rate_report(hz);
        debug!(hz, report_hex = format_args!("{:02X?}", &report[..6]), "rate command TX");
        match device.write(&report) {
            Ok(_) => Ok(()),
            Err(e) => {
                // Invalidate so the next attempt rediscovers the device.
                *slot = None;
                Err(Error::Hid(e.to_string()))
            }
        }
    }

    fn close(&self) {
        let mut slot = self.handle.lock().unwrap();
        *slot = None;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    // ── report layout ─────────────────────────────────────────────────────────

    #[test]
    fn report_has_fixed_command_prefix() {
        let report = build_rate_report(1000);
        assert_eq!(&report[..4], &[0x04, 0x04, 0x91, 0x02]);
    }

    #[test]
    fn rate_is_encoded_little_endian() {
        let report = build_rate_report(4000); // 0x0FA0
        assert_eq!(report[4], 0xA0);
        assert_eq!(report[5], 0x0F);

        let report = build_rate_report(1000); // 0x03E8
        assert_eq!(report[4], 0xE8);
        assert_eq!(report[5], 0x03);
    }

    #[test]
    fn report_tail_is_zero_padded() {
        let report = build_rate_report(8000);
        assert_eq!(report.len(), REPORT_LEN);
        assert!(report[6..].iter().all(|&b| b == 0));
    }

    // ── channel state ─────────────────────────────────────────────────────────

    #[test]
    fn close_is_idempotent() {
        let channel = DeviceChannel::new();
        channel.close();
        channel.close();
    }

    #[test]
    fn open_without_device_errs_instead_of_panicking() {
        // No Finalmouse is attached in any test environment this runs in;
        // enumeration failures take the same path.
        let channel = DeviceChannel::new();
        assert!(channel.open().is_err());
    }

    #[test]
    fn set_rate_without_device_errs() {
        let channel = DeviceChannel::new();
        assert!(channel.set_rate(1000).is_err());
    }
}
