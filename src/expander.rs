//! MCP23008 I2C backpack transport
//!
//! The backpack wires the expander's GPIO port to the LCD as:
//!
//! | Bit | Line      |
//! |-----|-----------|
//! | 1   | RS        |
//! | 2   | E         |
//! | 3-6 | D4..D7    |
//! | 7   | Backlight |
//!
//! R/W is tied to ground, so the controller cannot be read and the driver
//! falls back to fixed settle delays.
//!
//! Every line change is one register write. Data nibbles are folded into the
//! cached output latch and written in a single transaction.

use core::convert::Infallible;

use embedded_hal::i2c::I2c;
use log::trace;

use crate::error::BuilderError;
use crate::interface::{DataWidth, Direction, InterfaceError, Line, PinMap, Transport};

/// I/O direction register (1 = input)
pub const IODIR: u8 = 0x00;
/// Port register, reads the pin levels
pub const GPIO: u8 = 0x09;
/// Output latch register
pub const OLAT: u8 = 0x0A;

/// Base bus address of the MCP23008, selected by A2..A0
pub const BASE_ADDRESS: u8 = 0x20;

/// Backpack pin map
pub const PIN_MAP: PinMap = PinMap {
    register_select: 1,
    enable: 2,
    data: [3, 4, 5, 6],
    backlight: 7,
};

/// I2C expander transport
pub struct I2cExpanderTransport<I2C> {
    i2c: I2C,
    address: u8,
    /// Last value written to OLAT
    latch: u8,
    /// Last value written to IODIR
    iodir: u8,
}

impl<I2C: I2c> I2cExpanderTransport<I2C> {
    /// Create a transport for the expander at `address`
    ///
    /// `address` is either the A2..A0 strap value (`0..=7`) or the full
    /// 7-bit bus address (`0x20..=0x27`).
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidI2cAddress` for any other value.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, BuilderError> {
        let address = match address {
            0..=7 => BASE_ADDRESS | address,
            0x20..=0x27 => address,
            _ => return Err(BuilderError::InvalidI2cAddress(address)),
        };
        Ok(Self {
            i2c,
            address,
            latch: 0,
            // Power-on default: all inputs
            iodir: 0xFF,
        })
    }

    /// 7-bit bus address in use
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the I2C bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_register(
        &mut self,
        register: u8,
        value: u8,
    ) -> Result<(), InterfaceError<I2C::Error, Infallible>> {
        trace!("MCP23008 {:#04x}: reg {:#04x} <- {:08b}", self.address, register, value);
        self.i2c
            .write(self.address, &[register, value])
            .map_err(InterfaceError::Bus)
    }

    fn write_latch(&mut self, latch: u8) -> Result<(), InterfaceError<I2C::Error, Infallible>> {
        self.latch = latch;
        self.write_register(OLAT, latch)
    }
}

impl<I2C: I2c> Transport for I2cExpanderTransport<I2C> {
    type Error = InterfaceError<I2C::Error, Infallible>;

    fn data_width(&self) -> DataWidth {
        DataWidth::Four
    }

    fn can_read(&self) -> bool {
        false
    }

    fn set_line(&mut self, line: Line, level: bool) -> Result<(), Self::Error> {
        if line == Line::ReadWrite {
            return if level {
                Err(InterfaceError::Unsupported(line))
            } else {
                Ok(())
            };
        }
        if PIN_MAP.bit(line).is_none() {
            return Err(InterfaceError::Unsupported(line));
        }
        self.write_latch(PIN_MAP.apply(self.latch, line, level))
    }

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error> {
        match (PIN_MAP.bit(line), direction) {
            (Some(bit), Direction::Output) => {
                let iodir = self.iodir & !(1 << bit);
                if iodir != self.iodir {
                    self.iodir = iodir;
                    self.write_register(IODIR, iodir)?;
                }
                Ok(())
            }
            (None, Direction::Output) if line == Line::ReadWrite => Ok(()),
            _ => Err(InterfaceError::Unsupported(line)),
        }
    }

    fn read_line(&mut self, line: Line) -> Result<bool, Self::Error> {
        Err(InterfaceError::Unsupported(line))
    }

    fn prepare(&mut self) -> Result<(), Self::Error> {
        self.iodir = 0x00;
        self.write_register(IODIR, 0x00)?;
        self.write_latch(PIN_MAP.apply(0, Line::Backlight, true))
    }

    fn write_data_lines(&mut self, value: u8) -> Result<(), Self::Error> {
        let latch = PIN_MAP.apply_nibble(self.latch, value & 0x0F);
        self.write_latch(latch)
    }
}
