//! Contract with the external air-motion algorithm and the adapter that
//! feeds it.
//!
//! The algorithm itself is a vendor black box: it owns its calibration
//! state and converts raw 6-axis samples into pointer deltas, swipe flags
//! and an orientation estimate. The adapter's job is purely mechanical:
//! mounting-correct the sample, build the input record, hand it over.

use crate::error::InitError;
use crate::event::RawSample;
use crate::mounting::MountingMatrix;

/// Default per-axis delta gain.
pub const DELTA_GAIN_DEFAULT: i8 = 15;

/// Output status bits.
pub mod status {
    /// A new delta pair was computed this cycle.
    pub const DELTA_COMPUTED: u8 = 0x01;
    /// The device is static; the algorithm is (re)calibrating.
    pub const STATIC: u8 = 0x02;
    /// New gyroscope offsets were computed.
    pub const NEW_GYRO_OFFSET: u8 = 0x04;
    /// The device orientation estimate changed.
    pub const POSITION_CHANGED: u8 = 0x08;
}

/// Swipe-detection bits.
pub mod swipe {
    pub const LEFT: u8 = 0x01;
    pub const RIGHT: u8 = 0x02;
    pub const UP: u8 = 0x04;
    pub const DOWN: u8 = 0x08;
    pub const CLOCKWISE: u8 = 0x10;
    pub const COUNTERCLOCKWISE: u8 = 0x20;
}

/// Orientation of the device as estimated by the algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    /// Z down.
    #[default]
    Top,
    /// Z up.
    Bottom,
    /// Y up.
    Left,
    /// Y down.
    Right,
    /// X up.
    Front,
    /// X down.
    Rear,
}

/// Algorithm input: mounting-corrected 6-axis sample plus the click-button
/// state. Built fresh every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlgoInput {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
    pub click_button: u8,
}

/// Algorithm output. Only `delta` is consumed by the pipeline, and only
/// when [`status::DELTA_COMPUTED`] is set; the rest is exposed for
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlgoOutput {
    pub status: u8,
    pub gyro_offset: [i16; 3],
    pub delta: [i8; 2],
    pub swipes: u8,
    pub quaternion: [i32; 4],
    pub orientation: Orientation,
}

/// Algorithm configuration, handed over once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlgoConfig {
    /// Delta gain for the X and Y screen axes.
    pub delta_gain: [i8; 2],
    /// Initial gyroscope offsets, from a previous calibration if any.
    pub gyro_offset: [i16; 3],
    /// Accelerometer full-scale range in g.
    pub accel_fsr_g: u16,
    /// Gyroscope full-scale range in degrees per second.
    pub gyro_fsr_dps: u16,
    /// Re-arm swipe recognition automatically after each detection.
    pub gestures_auto_reset: bool,
}

impl Default for AlgoConfig {
    fn default() -> Self {
        Self {
            delta_gain: [DELTA_GAIN_DEFAULT; 2],
            gyro_offset: [0; 3],
            accel_fsr_g: 16,
            gyro_fsr_dps: 2000,
            gestures_auto_reset: false,
        }
    }
}

/// The external motion-processing algorithm.
///
/// Synchronous and deterministic given the calibration state it owns; the
/// pipeline does not track or reset that state beyond [`init`].
///
/// [`init`]: MotionAlgorithm::init
pub trait MotionAlgorithm {
    fn init(&mut self, config: &AlgoConfig) -> Result<(), InitError>;
    fn process(&mut self, input: &AlgoInput) -> AlgoOutput;
}

/// Packages corrected samples into the algorithm's input shape and
/// interprets nothing on the way out.
pub struct MotionAdapter<A: MotionAlgorithm> {
    algorithm: A,
    accel_mounting: MountingMatrix,
    gyro_mounting: MountingMatrix,
}

impl<A: MotionAlgorithm> MotionAdapter<A> {
    pub fn new(algorithm: A, accel_mounting: MountingMatrix, gyro_mounting: MountingMatrix) -> Self {
        Self {
            algorithm,
            accel_mounting,
            gyro_mounting,
        }
    }

    pub fn init(&mut self, config: &AlgoConfig) -> Result<(), InitError> {
        self.algorithm.init(config)
    }

    /// Corrects the sample, runs the algorithm, returns its output
    /// unmodified. There is no click source in this deployment, so
    /// `click_button` is always 0.
    pub fn process(&mut self, sample: &RawSample) -> AlgoOutput {
        let input = AlgoInput {
            accel: self.accel_mounting.apply(sample.accel),
            gyro: self.gyro_mounting.apply(sample.gyro),
            click_button: 0,
        };
        self.algorithm.process(&input)
    }
}
