//! Sample types shared between the FIFO reader and the motion adapter.

/// One complete 6-axis acquisition instant.
///
/// Ephemeral: produced while draining the FIFO, consumed in the same
/// dispatch cycle, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

/// One parsed FIFO frame. Either sensor may be absent when the device
/// batched only part of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorFrame {
    pub accel: Option<[i16; 3]>,
    pub gyro: Option<[i16; 3]>,
}

impl SensorFrame {
    /// Returns the sample only when both contributions are present.
    ///
    /// Partial frames are dropped whole by the dispatch loop; they must
    /// never be processed piecemeal.
    pub fn complete(&self) -> Option<RawSample> {
        match (self.accel, self.gyro) {
            (Some(accel), Some(gyro)) => Some(RawSample { accel, gyro }),
            _ => None,
        }
    }
}
