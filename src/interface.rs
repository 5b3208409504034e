//! Hardware transport abstraction
//!
//! This module provides the [`Transport`] trait: the pin-level capability the
//! bus engine drives. Three implementations ship with the crate:
//!
//! - [`ParallelTransport`](crate::ParallelTransport) - raw GPIO, 4 or 8 data
//!   pins, optional R/W pin
//! - [`I2cExpanderTransport`](crate::I2cExpanderTransport) - MCP23008 I2C backpack
//! - [`ShiftRegisterTransport`](crate::ShiftRegisterTransport) - 74HC595 SPI backpack
//!
//! ## Lines
//!
//! An HD44780 is wired with:
//! - **RS**: register select (low = instruction, high = data)
//! - **R/W**: read/write (low = write, high = read), optional
//! - **E**: enable, data is latched on its falling edge
//! - **D0..D7** or **D4..D7**: data bus; [`Line::Data`] indexes the wired
//!   lines from 0, so on a 4-bit bus `Data(0)` is D4
//! - a backlight switch on backpacks
//!
//! The bus engine is transport-agnostic: every physical pin operation is a
//! single call through this trait.

use core::fmt::Debug;

type InterfaceResult<T, E> = core::result::Result<T, E>;

/// A controller line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    /// Register select
    RegisterSelect,
    /// Read/write select
    ReadWrite,
    /// Enable strobe
    Enable,
    /// Data line, indexed from the lowest wired data line
    Data(u8),
    /// Backlight switch
    Backlight,
}

/// Direction of a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Host drives the line
    Output,
    /// Controller drives the line
    Input,
}

/// Number of wired data lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataWidth {
    /// D4..D7, bytes are sent as two nibbles
    Four,
    /// D0..D7, bytes are sent in one frame
    Eight,
}

impl DataWidth {
    /// Number of data lines
    pub fn lines(self) -> u8 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

/// Trait for the physical link to an HD44780 controller
///
/// ## Implementing
///
/// Implement [`set_line`](Transport::set_line),
/// [`set_direction`](Transport::set_direction) and
/// [`read_line`](Transport::read_line); the provided methods build on them.
/// Override [`write_data_lines`](Transport::write_data_lines) when the
/// hardware can update several lines in one transaction.
pub trait Transport {
    /// Error type for transport operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Number of wired data lines
    fn data_width(&self) -> DataWidth;

    /// Whether the controller can be read (an R/W line is wired and the
    /// data lines can be switched to input)
    fn can_read(&self) -> bool;

    /// Drive a line high (`true`) or low (`false`)
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying pin or bus fails.
    fn set_line(&mut self, line: Line, level: bool) -> InterfaceResult<(), Self::Error>;

    /// Switch a line between output and input
    fn set_direction(&mut self, line: Line, direction: Direction)
    -> InterfaceResult<(), Self::Error>;

    /// Sample a line
    fn read_line(&mut self, line: Line) -> InterfaceResult<bool, Self::Error>;

    /// Configure line directions and switch the backlight on
    ///
    /// Called once by [`Lcd::begin`](crate::Lcd::begin).
    fn prepare(&mut self) -> InterfaceResult<(), Self::Error> {
        self.set_direction(Line::RegisterSelect, Direction::Output)?;
        self.set_direction(Line::ReadWrite, Direction::Output)?;
        self.set_direction(Line::Enable, Direction::Output)?;
        self.set_data_direction(Direction::Output)?;
        self.set_direction(Line::Backlight, Direction::Output)?;
        self.set_backlight(true)
    }

    /// Put `value` on the data lines, bit `i` on `Data(i)`
    ///
    /// Only the low [`DataWidth::lines`] bits are used.
    fn write_data_lines(&mut self, value: u8) -> InterfaceResult<(), Self::Error> {
        for i in 0..self.data_width().lines() {
            self.set_line(Line::Data(i), (value >> i) & 0x01 != 0)?;
        }
        Ok(())
    }

    /// Sample the data lines, `Data(i)` into bit `i`
    fn read_data_lines(&mut self) -> InterfaceResult<u8, Self::Error> {
        let mut value = 0u8;
        for i in 0..self.data_width().lines() {
            if self.read_line(Line::Data(i))? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Switch every data line to `direction`
    fn set_data_direction(&mut self, direction: Direction) -> InterfaceResult<(), Self::Error> {
        for i in 0..self.data_width().lines() {
            self.set_direction(Line::Data(i), direction)?;
        }
        Ok(())
    }

    /// Switch the backlight
    ///
    /// A no-op unless the transport wires a backlight line.
    fn set_backlight(&mut self, on: bool) -> InterfaceResult<(), Self::Error> {
        self.set_line(Line::Backlight, on)
    }

    /// Whether a data frame plus its enable pulse must run with interrupts
    /// masked to keep the enable timing
    fn needs_critical_section(&self) -> bool {
        false
    }
}

/// Errors that can occur at the transport level
///
/// Generic over bus (I2C/SPI) and GPIO error types.
#[derive(Debug)]
pub enum InterfaceError<BusErr, PinErr> {
    /// I2C or SPI communication error
    Bus(BusErr),
    /// GPIO pin error
    Pin(PinErr),
    /// The transport does not wire the requested line or cannot read it
    Unsupported(Line),
}

impl<BusErr: Debug, PinErr: Debug> core::fmt::Display for InterfaceError<BusErr, PinErr> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "Bus error: {e:?}"),
            Self::Pin(e) => write!(f, "Pin error: {e:?}"),
            Self::Unsupported(line) => write!(f, "Line not supported: {line:?}"),
        }
    }
}

impl<BusErr: Debug, PinErr: Debug> core::error::Error for InterfaceError<BusErr, PinErr> {}

/// Pin map of an 8-line GPIO expander backpack
///
/// Each field is the expander bit wired to that controller line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinMap {
    /// Bit driving RS
    pub register_select: u8,
    /// Bit driving E
    pub enable: u8,
    /// Bits driving D4, D5, D6, D7
    pub data: [u8; 4],
    /// Bit switching the backlight
    pub backlight: u8,
}

impl PinMap {
    /// Expander bit for `line`, if wired
    pub fn bit(&self, line: Line) -> Option<u8> {
        match line {
            Line::RegisterSelect => Some(self.register_select),
            Line::Enable => Some(self.enable),
            Line::Data(i) => self.data.get(i as usize).copied(),
            Line::Backlight => Some(self.backlight),
            Line::ReadWrite => None,
        }
    }

    /// Set or clear the bit for `line` in `byte`
    ///
    /// Unwired lines leave `byte` unchanged.
    pub fn apply(&self, byte: u8, line: Line, level: bool) -> u8 {
        match self.bit(line) {
            Some(bit) if level => byte | (1 << bit),
            Some(bit) => byte & !(1 << bit),
            None => byte,
        }
    }

    /// Fold a data nibble into `byte`
    pub fn apply_nibble(&self, byte: u8, nibble: u8) -> u8 {
        let mut out = byte;
        for (i, bit) in self.data.iter().enumerate() {
            out &= !(1 << bit);
            out |= ((nibble >> i) & 0x01) << bit;
        }
        out
    }
}
