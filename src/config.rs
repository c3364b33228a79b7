//! Tunable configuration for the air-mouse pipeline.

use crate::algorithm::{AlgoConfig, DELTA_GAIN_DEFAULT};
use crate::mounting::{ACCEL_MOUNTING, GYRO_MOUNTING, MountingMatrix};
use crate::register::{AccelFsr, GyroFsr, OutputDataRate};

/// The config struct for the air-mouse pipeline.
///
/// The defaults reproduce the reference product: 100 Hz sampling at
/// ±16 g / ±2000 dps with the reference mounting matrices, starting
/// enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AirMouseConfig {
    /// State the pipeline starts in; toggles move it from there.
    pub initial_enabled: bool,
    pub accel_fsr: AccelFsr,
    pub gyro_fsr: GyroFsr,
    pub odr: OutputDataRate,
    /// Delta gain for the X and Y screen axes.
    pub delta_gain: [i8; 2],
    /// Re-arm swipe recognition automatically after each detection.
    pub gestures_auto_reset: bool,
    pub accel_mounting: MountingMatrix,
    pub gyro_mounting: MountingMatrix,
}

impl Default for AirMouseConfig {
    fn default() -> Self {
        Self {
            initial_enabled: true,
            accel_fsr: AccelFsr::G16,
            gyro_fsr: GyroFsr::Dps2000,
            odr: OutputDataRate::Hz100,
            delta_gain: [DELTA_GAIN_DEFAULT; 2],
            gestures_auto_reset: false,
            accel_mounting: ACCEL_MOUNTING,
            gyro_mounting: GYRO_MOUNTING,
        }
    }
}

impl AirMouseConfig {
    /// The algorithm's view of this configuration.
    pub fn algo_config(&self) -> AlgoConfig {
        AlgoConfig {
            delta_gain: self.delta_gain,
            gyro_offset: [0; 3],
            accel_fsr_g: self.accel_fsr.as_g(),
            gyro_fsr_dps: self.gyro_fsr.as_dps(),
            gestures_auto_reset: self.gestures_auto_reset,
        }
    }
}
