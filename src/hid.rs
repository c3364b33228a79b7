//! HID report types and the pointer-sink contract.

use serde::Serialize;
use usbd_hid::descriptor::{AsInputReport, MouseReport};

use crate::channel::REPORT_CHANNEL;
use crate::error::TransportError;

/// Reports the pipeline can produce.
#[derive(Serialize)]
pub enum Report {
    /// Relative pointer movement.
    MouseReport(MouseReport),
}

impl AsInputReport for Report {}

/// Where computed pointer deltas go.
///
/// Deltas are perishable: an implementation may fail fast, the pipeline
/// drops the delta and moves on. It must never buffer a stale one.
#[allow(async_fn_in_trait)]
pub trait PointerSink {
    async fn emit(&mut self, delta_x: i8, delta_y: i8) -> Result<(), TransportError>;
}

/// Sink that frames deltas as HID mouse reports on [`REPORT_CHANNEL`].
///
/// Non-blocking: a full channel means the transport task is not keeping
/// up, and the delta is dropped rather than delivered late.
#[derive(Default)]
pub struct ReportSink;

impl PointerSink for ReportSink {
    async fn emit(&mut self, delta_x: i8, delta_y: i8) -> Result<(), TransportError> {
        let report = MouseReport {
            buttons: 0,
            x: delta_x,
            y: delta_y,
            wheel: 0,
            pan: 0,
        };
        REPORT_CHANNEL
            .try_send(Report::MouseReport(report))
            .map_err(|_| TransportError::BufferFull)
    }
}
