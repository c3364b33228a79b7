//! Exposed channels which can be used to share data with transport tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::hid::Report;

pub type RawMutex = CriticalSectionRawMutex;

pub const REPORT_CHANNEL_SIZE: usize = 16;

/// Channel for HID reports from the pipeline to the USB/BLE writer task.
pub static REPORT_CHANNEL: Channel<RawMutex, Report, REPORT_CHANNEL_SIZE> = Channel::new();
