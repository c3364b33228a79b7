//! Shared test harness: a mock-time executor, a scripted register bus, a
//! spy algorithm and counting sinks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use airmouse::algorithm::{AlgoConfig, AlgoInput, AlgoOutput, MotionAlgorithm};
use airmouse::bus::RegisterBus;
use airmouse::error::{DeviceError, InitError, TransportError};
use airmouse::hid::PointerSink;
use airmouse::register;
use embassy_time::{Duration, MockDriver};
use futures::task::noop_waker;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

const MAX_POLLS: usize = 1_000_000;
const TICK: Duration = Duration::from_micros(500);

/// Polls the future to completion, advancing the mock clock on every
/// pending poll so settle delays and loop ticks elapse instantly.
pub fn test_block_on<F: Future>(fut: F) -> F::Output {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    let mut fut = pin!(fut);
    for _ in 0..MAX_POLLS {
        if let Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
            return out;
        }
        MockDriver::get().advance(TICK);
    }
    panic!("test future did not complete within the simulated deadline");
}

#[derive(Default)]
pub struct BusState {
    /// Identity returned for WHO_AM_I reads.
    pub whoami: u8,
    /// FIFO contents, one blob per data-ready batch.
    pub fifo_batches: VecDeque<Vec<u8>>,
    /// Every register read, in order.
    pub reads: Vec<u8>,
    /// Every register write, in order.
    pub writes: Vec<(u8, Vec<u8>)>,
}

impl BusState {
    pub fn writes_to(&self, reg: u8) -> usize {
        self.writes.iter().filter(|(r, _)| *r == reg).count()
    }

    pub fn read_from(&self, reg: u8) -> bool {
        self.reads.contains(&reg)
    }
}

/// Register bus backed by shared scripted state, so tests keep a handle
/// while the pipeline owns the bus.
pub struct MockBus {
    state: Rc<RefCell<BusState>>,
}

impl MockBus {
    pub fn new() -> (Self, Rc<RefCell<BusState>>) {
        let state = Rc::new(RefCell::new(BusState {
            whoami: register::CHIP_ID,
            ..BusState::default()
        }));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl RegisterBus for MockBus {
    async fn read_register(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), DeviceError> {
        let mut state = self.state.borrow_mut();
        state.reads.push(reg);
        match reg {
            register::WHO_AM_I => buf[0] = state.whoami,
            register::FIFO_COUNTH => {
                let count = state.fifo_batches.front().map_or(0, |b| b.len()) as u16;
                buf.copy_from_slice(&count.to_be_bytes());
            }
            register::FIFO_DATA => {
                if let Some(batch) = state.fifo_batches.pop_front() {
                    let n = buf.len().min(batch.len());
                    buf[..n].copy_from_slice(&batch[..n]);
                }
            }
            _ => buf.fill(0),
        }
        Ok(())
    }

    async fn write_register(&mut self, reg: u8, data: &[u8]) -> Result<(), DeviceError> {
        self.state.borrow_mut().writes.push((reg, data.to_vec()));
        Ok(())
    }
}

/// Motion algorithm spy: records every input, replays scripted outputs.
pub struct SpyAlgorithm {
    state: Rc<RefCell<SpyState>>,
}

#[derive(Default)]
pub struct SpyState {
    pub fail_init: bool,
    pub init_config: Option<AlgoConfig>,
    pub inputs: Vec<AlgoInput>,
    pub outputs: VecDeque<AlgoOutput>,
}

impl SpyAlgorithm {
    pub fn new() -> (Self, Rc<RefCell<SpyState>>) {
        let state = Rc::new(RefCell::new(SpyState::default()));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl MotionAlgorithm for SpyAlgorithm {
    fn init(&mut self, config: &AlgoConfig) -> Result<(), InitError> {
        let mut state = self.state.borrow_mut();
        state.init_config = Some(*config);
        if state.fail_init {
            return Err(InitError::Algorithm);
        }
        Ok(())
    }

    fn process(&mut self, input: &AlgoInput) -> AlgoOutput {
        let mut state = self.state.borrow_mut();
        state.inputs.push(*input);
        state.outputs.pop_front().unwrap_or_default()
    }
}

/// Sink that records deliveries and can fail its first calls.
pub struct VecSink {
    state: Rc<RefCell<SinkState>>,
}

#[derive(Default)]
pub struct SinkState {
    pub fail_next: usize,
    pub attempts: usize,
    pub emitted: Vec<(i8, i8)>,
}

impl VecSink {
    pub fn new() -> (Self, Rc<RefCell<SinkState>>) {
        let state = Rc::new(RefCell::new(SinkState::default()));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl PointerSink for VecSink {
    async fn emit(&mut self, delta_x: i8, delta_y: i8) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.attempts += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(TransportError::Endpoint);
        }
        state.emitted.push((delta_x, delta_y));
        Ok(())
    }
}

fn push_axes(out: &mut Vec<u8>, axes: [i16; 3]) {
    for a in axes {
        out.extend_from_slice(&a.to_be_bytes());
    }
}

/// A FIFO frame carrying both sensors.
pub fn frame_full(accel: [i16; 3], gyro: [i16; 3]) -> Vec<u8> {
    let mut out = vec![register::fifo_header::ACCEL | register::fifo_header::GYRO];
    push_axes(&mut out, accel);
    push_axes(&mut out, gyro);
    out.extend_from_slice(&[0, 0, 0]); // temp + timestamp
    out
}

/// A FIFO frame with only the accelerometer contribution.
pub fn frame_accel_only(accel: [i16; 3]) -> Vec<u8> {
    let mut out = vec![register::fifo_header::ACCEL];
    push_axes(&mut out, accel);
    out.push(0); // temp
    out
}

/// An output with the delta-computed bit set.
pub fn delta_output(x: i8, y: i8) -> AlgoOutput {
    AlgoOutput {
        status: airmouse::algorithm::status::DELTA_COMPUTED,
        delta: [x, y],
        ..AlgoOutput::default()
    }
}
