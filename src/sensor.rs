//! ICM-42670 access: identity check, power control and FIFO draining.

use embassy_time::{Duration, Timer};
use heapless::Vec;

use crate::bus::RegisterBus;
use crate::error::{DeviceError, InitError};
use crate::event::SensorFrame;
use crate::register::{self, fifo_header, pwr_mgmt0, signal_path_reset};
use crate::register::{AccelFsr, GyroFsr, OutputDataRate};

/// Settle time after each power-mode step. The part needs it to reach
/// low-noise operation; removing it produces garbage samples.
const SETTLE_DELAY: Duration = Duration::from_millis(5);

/// Frames accepted per drain.
pub const MAX_FRAMES: usize = 16;

/// Largest combined frame: header + accel + gyro + temp + timestamp.
const FRAME_MAX_LEN: usize = 16;

const FIFO_BUF_LEN: usize = MAX_FRAMES * FRAME_MAX_LEN;

/// The physical sensor behind a [`RegisterBus`].
pub struct Imu<B: RegisterBus> {
    bus: B,
    accel_fsr: AccelFsr,
    gyro_fsr: GyroFsr,
    odr: OutputDataRate,
}

impl<B: RegisterBus> Imu<B> {
    pub fn new(bus: B, accel_fsr: AccelFsr, gyro_fsr: GyroFsr, odr: OutputDataRate) -> Self {
        Self {
            bus,
            accel_fsr,
            gyro_fsr,
            odr,
        }
    }

    /// Reads registers, retrying once. A single failed transfer is common
    /// enough on a shared bus that the retry keeps whole drain cycles from
    /// being thrown away; a second failure surfaces.
    async fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), DeviceError> {
        if self.bus.read_register(reg, buf).await.is_ok() {
            return Ok(());
        }
        self.bus.read_register(reg, buf).await
    }

    async fn read_reg(&mut self, reg: u8) -> Result<u8, DeviceError> {
        let mut buf = [0u8; 1];
        self.read_regs(reg, &mut buf).await?;
        Ok(buf[0])
    }

    async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), DeviceError> {
        self.bus.write_register(reg, &[value]).await
    }

    async fn update_reg(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), DeviceError> {
        let current = self.read_reg(reg).await?;
        self.write_reg(reg, (current & !mask) | value).await
    }

    /// Verifies the identity register. A mismatch means the wrong part (or
    /// no part) is on the bus and is fatal.
    pub async fn check_identity(&mut self) -> Result<(), InitError> {
        let id = self.read_reg(register::WHO_AM_I).await?;
        if id != register::CHIP_ID {
            error!("Unexpected sensor identity: {} (expected {})", id, register::CHIP_ID);
            return Err(InitError::UnknownDevice(id));
        }
        info!("IMU detected, identity {}", id);
        Ok(())
    }

    /// Programs full-scale ranges, output data rates and FIFO streaming.
    pub async fn configure(&mut self) -> Result<(), DeviceError> {
        self.write_reg(register::GYRO_CONFIG0, self.gyro_fsr.bits() | self.odr.bits())
            .await?;
        self.write_reg(register::ACCEL_CONFIG0, self.accel_fsr.bits() | self.odr.bits())
            .await?;
        self.write_reg(register::FIFO_CONFIG1, register::fifo_config1::MODE_STREAM)
            .await
    }

    /// Brings both sensors into low-noise sampling. Each step gets its
    /// settle delay before the next touches the part.
    pub async fn enable(&mut self) -> Result<(), DeviceError> {
        self.update_reg(register::PWR_MGMT0, pwr_mgmt0::ACCEL_MODE_MASK, pwr_mgmt0::ACCEL_MODE_LN)
            .await?;
        Timer::after(SETTLE_DELAY).await;
        self.update_reg(register::PWR_MGMT0, pwr_mgmt0::GYRO_MODE_MASK, pwr_mgmt0::GYRO_MODE_LN)
            .await?;
        Timer::after(SETTLE_DELAY).await;
        Ok(())
    }

    /// Powers both sensors down, same settle discipline as [`enable`].
    ///
    /// [`enable`]: Imu::enable
    pub async fn disable(&mut self) -> Result<(), DeviceError> {
        self.update_reg(register::PWR_MGMT0, pwr_mgmt0::ACCEL_MODE_MASK, pwr_mgmt0::ACCEL_MODE_OFF)
            .await?;
        Timer::after(SETTLE_DELAY).await;
        self.update_reg(register::PWR_MGMT0, pwr_mgmt0::GYRO_MODE_MASK, pwr_mgmt0::GYRO_MODE_OFF)
            .await?;
        Timer::after(SETTLE_DELAY).await;
        Ok(())
    }

    /// Flushes the device-side FIFO so stale pre-transition samples never
    /// reach the algorithm.
    pub async fn reset_fifo(&mut self) -> Result<(), DeviceError> {
        self.write_reg(register::SIGNAL_PATH_RESET, signal_path_reset::FIFO_FLUSH)
            .await
    }

    /// Pulls whatever the FIFO currently holds. An empty result is
    /// legitimate; a bus error aborts the whole drain.
    pub async fn drain(&mut self) -> Result<Vec<SensorFrame, MAX_FRAMES>, DeviceError> {
        let mut count_bytes = [0u8; 2];
        self.read_regs(register::FIFO_COUNTH, &mut count_bytes).await?;
        let count = u16::from_be_bytes(count_bytes) as usize;
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut buf = [0u8; FIFO_BUF_LEN];
        let len = count.min(FIFO_BUF_LEN);
        self.read_regs(register::FIFO_DATA, &mut buf[..len]).await?;

        Ok(parse_frames(&buf[..len]))
    }
}

fn read_axes(bytes: &[u8]) -> [i16; 3] {
    [
        i16::from_be_bytes([bytes[0], bytes[1]]),
        i16::from_be_bytes([bytes[2], bytes[3]]),
        i16::from_be_bytes([bytes[4], bytes[5]]),
    ]
}

/// Splits a raw FIFO drain into frames.
///
/// Frame layout: header byte, accel words if flagged, gyro words if
/// flagged, one temperature byte, and a 2-byte timestamp when both sensors
/// are present. An empty-FIFO marker, an unrecognizable header or a
/// truncated tail ends the parse; everything before it is kept.
fn parse_frames(bytes: &[u8]) -> Vec<SensorFrame, MAX_FRAMES> {
    let mut frames: Vec<SensorFrame, MAX_FRAMES> = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() && !frames.is_full() {
        let header = bytes[offset];
        if header & fifo_header::MSG != 0 {
            break;
        }
        let has_accel = header & fifo_header::ACCEL != 0;
        let has_gyro = header & fifo_header::GYRO != 0;
        if !has_accel && !has_gyro {
            break;
        }

        let mut len = 1 + 1; // header + temperature
        if has_accel {
            len += 6;
        }
        if has_gyro {
            len += 6;
        }
        if has_accel && has_gyro {
            len += 2; // timestamp
        }
        if offset + len > bytes.len() {
            warn!("Truncated FIFO frame dropped");
            break;
        }

        let mut frame = SensorFrame::default();
        let mut at = offset + 1;
        if has_accel {
            frame.accel = Some(read_axes(&bytes[at..at + 6]));
            at += 6;
        }
        if has_gyro {
            frame.gyro = Some(read_axes(&bytes[at..at + 6]));
        }
        // Frame capacity was checked above, the push cannot fail.
        let _ = frames.push(frame);
        offset += len;
    }

    frames
}
