//! The sensor-event pipeline: shared flags, the interrupt bridge and the
//! dispatch loop.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Timer};
use embedded_hal_async::digital::Wait;

use crate::algorithm::{MotionAdapter, MotionAlgorithm, status};
use crate::bus::RegisterBus;
use crate::config::AirMouseConfig;
use crate::error::InitError;
use crate::hid::PointerSink;
use crate::sensor::Imu;

/// Idle granularity of the dispatch loop. 1 ms is the cheapest safe tick
/// for this class of device.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Shared state between interrupt producers and the dispatch loop.
///
/// Exactly three single-slot flags, accessed with load/store granularity
/// only: producers set, the loop reads then clears. Multiple interrupts
/// between two dispatch cycles therefore collapse into one signal. The
/// struct is `const`-constructible so it can live in a `static` next to
/// the ISR registration.
pub struct PipelineContext {
    data_ready: AtomicBool,
    toggle_pending: AtomicBool,
    enabled: AtomicBool,
}

impl PipelineContext {
    pub const fn new() -> Self {
        Self {
            data_ready: AtomicBool::new(false),
            toggle_pending: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
        }
    }

    /// The interrupt bridge. The only action legal in interrupt context:
    /// one store, no bus access, no blocking.
    pub fn on_data_ready(&self) {
        self.data_ready.store(true, Ordering::Release);
    }

    /// Requests an enable/disable transition, e.g. from a button edge.
    ///
    /// The level flips immediately; the pending flag makes the physical
    /// reconfiguration run once per burst. A double-toggle between two
    /// dispatch cycles thus lands on the second request's state with a
    /// single reconfiguration — transitions are collapsed, not queued.
    /// The level is written only here (single writer), so the
    /// load-then-store pair cannot race.
    pub fn request_toggle(&self) {
        let enabled = !self.enabled.load(Ordering::Acquire);
        self.enabled.store(enabled, Ordering::Release);
        self.toggle_pending.store(true, Ordering::Release);
        if enabled {
            info!("Pipeline is getting enabled");
        } else {
            info!("Pipeline is getting disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Bring-up only; steady-state changes go through [`request_toggle`].
    ///
    /// [`request_toggle`]: PipelineContext::request_toggle
    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn take_toggle(&self) -> bool {
        if self.toggle_pending.load(Ordering::Acquire) {
            self.toggle_pending.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    fn data_ready(&self) -> bool {
        self.data_ready.load(Ordering::Acquire)
    }

    fn clear_data_ready(&self) {
        self.data_ready.store(false, Ordering::Release);
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts the sensor's INT pin to the interrupt bridge: waits for the
/// data-ready edge and sets the flag, nothing else on that path.
pub async fn watch_data_ready<P: Wait>(mut pin: P, ctx: &PipelineContext) -> ! {
    loop {
        match pin.wait_for_rising_edge().await {
            Ok(()) => ctx.on_data_ready(),
            Err(_) => {
                warn!("Data-ready pin wait failed");
                Timer::after(POLL_INTERVAL).await;
            }
        }
    }
}

/// The assembled pipeline: sensor, adapter, sink and shared flags, driven
/// by one long-lived dispatch loop.
pub struct AirMouse<'a, B: RegisterBus, A: MotionAlgorithm, S: PointerSink> {
    imu: Imu<B>,
    adapter: MotionAdapter<A>,
    sink: S,
    ctx: &'a PipelineContext,
    config: AirMouseConfig,
}

impl<'a, B: RegisterBus, A: MotionAlgorithm, S: PointerSink> AirMouse<'a, B, A, S> {
    pub fn new(bus: B, algorithm: A, sink: S, ctx: &'a PipelineContext, config: AirMouseConfig) -> Self {
        Self {
            imu: Imu::new(bus, config.accel_fsr, config.gyro_fsr, config.odr),
            adapter: MotionAdapter::new(algorithm, config.accel_mounting, config.gyro_mounting),
            sink,
            ctx,
            config,
        }
    }

    /// Device identity check, algorithm init, sensor configuration and the
    /// initial power state. Any failure here is fatal.
    pub async fn initialize(&mut self) -> Result<(), InitError> {
        self.imu.check_identity().await?;
        self.adapter.init(&self.config.algo_config())?;
        self.imu.configure().await?;

        self.ctx.set_enabled(self.config.initial_enabled);
        if self.config.initial_enabled {
            self.imu.enable().await?;
        } else {
            self.imu.disable().await?;
        }
        self.imu.reset_fifo().await?;

        info!("Air-mouse pipeline ready, enabled: {}", self.config.initial_enabled);
        Ok(())
    }

    /// Runs the dispatch loop forever: apply a pending toggle, service
    /// data-ready, sleep one tick.
    pub async fn run(&mut self) -> ! {
        loop {
            self.dispatch_cycle().await;
            Timer::after(POLL_INTERVAL).await;
        }
    }

    async fn dispatch_cycle(&mut self) {
        if self.ctx.take_toggle() {
            self.apply_transition().await;
        }

        if self.ctx.is_enabled() && self.ctx.data_ready() {
            self.drain_and_process().await;
        }
    }

    /// One physical reconfiguration targeting the current level, plus a
    /// FIFO flush so stale pre-toggle samples are discarded. A bus error
    /// abandons the transition; the next cycle starts clean.
    async fn apply_transition(&mut self) {
        let res = if self.ctx.is_enabled() {
            self.imu.enable().await
        } else {
            self.imu.disable().await
        };
        let res = match res {
            Ok(()) => self.imu.reset_fifo().await,
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            warn!("State transition failed: {:?}", e);
        }
    }

    async fn drain_and_process(&mut self) {
        let frames = self.imu.drain().await;
        self.ctx.clear_data_ready();

        let frames = match frames {
            Ok(frames) => frames,
            Err(e) => {
                warn!("FIFO drain aborted: {:?}", e);
                return;
            }
        };

        for frame in frames.iter() {
            // Partial batches are dropped whole, never processed piecemeal.
            let Some(sample) = frame.complete() else {
                continue;
            };
            let output = self.adapter.process(&sample);
            if output.status & status::DELTA_COMPUTED != 0 {
                if let Err(e) = self.sink.emit(output.delta[0], output.delta[1]).await {
                    warn!("Pointer delta dropped: {:?}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_toggle_collapses_to_the_second_request() {
        let ctx = PipelineContext::new();
        ctx.set_enabled(true);

        ctx.request_toggle();
        ctx.request_toggle();

        // Level reflects the second toggle, one pending transition only.
        assert!(ctx.is_enabled());
        assert!(ctx.take_toggle());
        assert!(!ctx.take_toggle());
    }

    #[test]
    fn single_toggle_flips_the_level() {
        let ctx = PipelineContext::new();
        ctx.set_enabled(true);

        ctx.request_toggle();

        assert!(!ctx.is_enabled());
        assert!(ctx.take_toggle());
    }

    #[test]
    fn data_ready_saturates() {
        let ctx = PipelineContext::new();

        ctx.on_data_ready();
        ctx.on_data_ready();
        ctx.on_data_ready();

        assert!(ctx.data_ready());
        ctx.clear_data_ready();
        assert!(!ctx.data_ready());
    }
}
