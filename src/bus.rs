//! Register-bus abstraction between the pipeline and the transport.
//!
//! The pipeline only ever moves bytes to and from numbered registers; how
//! they travel is the platform's business. One adapter over
//! `embedded-hal-async` I2C is provided since that is how the reference
//! hardware wires the sensor.

use embedded_hal_async::i2c::I2c;
use heapless::Vec;

use crate::error::DeviceError;

/// Point-to-point register transport to the sensor.
#[allow(async_fn_in_trait)]
pub trait RegisterBus {
    /// Reads `buf.len()` bytes starting at `reg`.
    async fn read_register(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), DeviceError>;
    /// Writes `data` starting at `reg`.
    async fn write_register(&mut self, reg: u8, data: &[u8]) -> Result<(), DeviceError>;
}

/// Register bus over an I2C peripheral: a write of the register address
/// followed by a repeated-start read, or a single write of address + data.
pub struct I2cRegisterBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cRegisterBus<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Releases the underlying peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus for I2cRegisterBus<I2C> {
    async fn read_register(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.i2c
            .write_read(self.address, &[reg], buf)
            .await
            .map_err(|_| DeviceError::ReadRegister(reg))
    }

    async fn write_register(&mut self, reg: u8, data: &[u8]) -> Result<(), DeviceError> {
        // Register writes on this part are at most a couple of bytes.
        let mut frame: Vec<u8, 8> = Vec::new();
        frame.push(reg).map_err(|_| DeviceError::WriteRegister(reg))?;
        frame
            .extend_from_slice(data)
            .map_err(|_| DeviceError::WriteRegister(reg))?;
        self.i2c
            .write(self.address, &frame)
            .await
            .map_err(|_| DeviceError::WriteRegister(reg))
    }
}
