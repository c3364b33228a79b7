//! Air-mouse firmware core.
//!
//! Turns periodic 6-axis IMU samples into 2-D HID pointer deltas inside an
//! interrupt-driven embassy runtime. The crate owns the sensor-event
//! pipeline — interrupt-to-task handoff, the dispatch loop, the
//! enable/disable state machine, mounting-matrix correction and the
//! contracts with the motion algorithm and the output sink — and leaves
//! bus transport, the algorithm's math and report transmission to their
//! respective collaborators.
//!
//! ```ignore
//! static CTX: PipelineContext = PipelineContext::new();
//!
//! // In separate embassy tasks:
//! watch_data_ready(int_pin, &CTX).await;
//! run_air_mouse(bus, algorithm, ReportSink, &CTX, AirMouseConfig::default()).await;
//! ```
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod algorithm;
pub mod bus;
pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod hid;
pub mod mounting;
pub mod pipeline;
pub mod register;
pub mod sensor;

pub use algorithm::{AlgoConfig, AlgoInput, AlgoOutput, MotionAlgorithm};
pub use bus::{I2cRegisterBus, RegisterBus};
pub use config::AirMouseConfig;
pub use error::{DeviceError, InitError, TransportError};
pub use hid::{PointerSink, Report, ReportSink};
pub use pipeline::{AirMouse, PipelineContext, watch_data_ready};

/// Brings up the pipeline and runs the dispatch loop forever.
///
/// Verifies the sensor identity, initializes the motion algorithm,
/// programs ranges, data rates and FIFO streaming, applies the configured
/// initial state and then never returns — except with an [`InitError`]
/// when bring-up fails.
pub async fn run_air_mouse<B, A, S>(
    bus: B,
    algorithm: A,
    sink: S,
    ctx: &PipelineContext,
    config: AirMouseConfig,
) -> Result<(), InitError>
where
    B: RegisterBus,
    A: MotionAlgorithm,
    S: PointerSink,
{
    let mut air_mouse = AirMouse::new(bus, algorithm, sink, ctx, config);
    air_mouse.initialize().await?;
    air_mouse.run().await
}
