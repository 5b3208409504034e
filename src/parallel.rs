//! Raw GPIO transport
//!
//! Drives the controller directly from MCU pins: RS, E, an optional R/W and
//! four or eight data pins. Reading the controller needs the R/W pin and
//! data pins that can be switched to input, see [`DataPin`].
//!
//! ## Example
//!
//! ```rust
//! use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
//! use hd44780_shadow::{DataWidth, OpenDrain, ParallelTransport, Transport};
//! # use core::convert::Infallible;
//! # struct MockPin;
//! # impl ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl InputPin for MockPin {
//! #     fn is_high(&mut self) -> Result<bool, Self::Error> { Ok(false) }
//! #     fn is_low(&mut self) -> Result<bool, Self::Error> { Ok(true) }
//! # }
//! let data = [
//!     OpenDrain::new(MockPin),
//!     OpenDrain::new(MockPin),
//!     OpenDrain::new(MockPin),
//!     OpenDrain::new(MockPin),
//! ];
//! let transport = ParallelTransport::new_4bit_rw(MockPin, MockPin, MockPin, data);
//! assert_eq!(transport.data_width(), DataWidth::Four);
//! assert!(transport.can_read());
//! ```

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::interface::{DataWidth, Direction, InterfaceError, Line, Transport};

/// A data pin that may be switched between driving and sampling the bus
pub trait DataPin: OutputPin {
    /// Whether the pin can sample the bus
    const READABLE: bool;

    /// Switch the pin between output and input
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Sample the pin
    fn read(&mut self) -> Result<bool, Self::Error>;
}

/// Open-drain data pin
///
/// Switching to input releases the line high so the controller can pull it
/// low. Use with pins configured as open-drain with pull-ups, which can be
/// driven and read without reconfiguration.
pub struct OpenDrain<P>(P);

impl<P> OpenDrain<P> {
    /// Wrap an open-drain pin
    pub fn new(pin: P) -> Self {
        Self(pin)
    }

    /// Release the wrapped pin
    pub fn release(self) -> P {
        self.0
    }
}

impl<P: ErrorType> ErrorType for OpenDrain<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for OpenDrain<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

impl<P: OutputPin + InputPin> DataPin for OpenDrain<P> {
    const READABLE: bool = true;

    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        match direction {
            Direction::Input => self.0.set_high(),
            Direction::Output => Ok(()),
        }
    }

    fn read(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

/// Push-pull data pin that is never read
///
/// For write-only wiring, where R/W is tied to ground.
pub struct OutputOnly<P>(P);

impl<P> OutputOnly<P> {
    /// Wrap an output pin
    pub fn new(pin: P) -> Self {
        Self(pin)
    }

    /// Release the wrapped pin
    pub fn release(self) -> P {
        self.0
    }
}

impl<P: ErrorType> ErrorType for OutputOnly<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for OutputOnly<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

impl<P: OutputPin> DataPin for OutputOnly<P> {
    const READABLE: bool = false;

    fn set_direction(&mut self, _direction: Direction) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Placeholder for an unwired R/W pin
///
/// Carries the error type of the other pins so every pin of a transport
/// reports the same error.
pub struct NoPin<E>(PhantomData<E>);

impl<E: embedded_hal::digital::Error> ErrorType for NoPin<E> {
    type Error = E;
}

impl<E: embedded_hal::digital::Error> OutputPin for NoPin<E> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Raw GPIO transport
///
/// `N` is the number of data pins, 4 (D4..D7) or 8 (D0..D7), fixed by the
/// constructor used.
pub struct ParallelTransport<RS, RW, EN, D, const N: usize> {
    register_select: RS,
    read_write: Option<RW>,
    enable: EN,
    data: [D; N],
}

impl<RS, EN, D> ParallelTransport<RS, NoPin<RS::Error>, EN, D, 4>
where
    RS: OutputPin,
{
    /// 4-bit bus, R/W tied to ground
    pub fn new_4bit(register_select: RS, enable: EN, data: [D; 4]) -> Self {
        Self {
            register_select,
            read_write: None,
            enable,
            data,
        }
    }
}

impl<RS, EN, D> ParallelTransport<RS, NoPin<RS::Error>, EN, D, 8>
where
    RS: OutputPin,
{
    /// 8-bit bus, R/W tied to ground
    pub fn new_8bit(register_select: RS, enable: EN, data: [D; 8]) -> Self {
        Self {
            register_select,
            read_write: None,
            enable,
            data,
        }
    }
}

impl<RS, RW, EN, D> ParallelTransport<RS, RW, EN, D, 4> {
    /// 4-bit bus with an R/W pin
    pub fn new_4bit_rw(register_select: RS, read_write: RW, enable: EN, data: [D; 4]) -> Self {
        Self {
            register_select,
            read_write: Some(read_write),
            enable,
            data,
        }
    }
}

impl<RS, RW, EN, D> ParallelTransport<RS, RW, EN, D, 8> {
    /// 8-bit bus with an R/W pin
    pub fn new_8bit_rw(register_select: RS, read_write: RW, enable: EN, data: [D; 8]) -> Self {
        Self {
            register_select,
            read_write: Some(read_write),
            enable,
            data,
        }
    }
}

impl<RS, RW, EN, D, const N: usize> ParallelTransport<RS, RW, EN, D, N> {
    /// Release the pins
    pub fn release(self) -> (RS, Option<RW>, EN, [D; N]) {
        (self.register_select, self.read_write, self.enable, self.data)
    }
}

fn drive<P: OutputPin>(pin: &mut P, level: bool) -> Result<(), P::Error> {
    if level { pin.set_high() } else { pin.set_low() }
}

impl<RS, RW, EN, D, const N: usize> Transport for ParallelTransport<RS, RW, EN, D, N>
where
    RS: OutputPin,
    RW: OutputPin<Error = RS::Error>,
    EN: OutputPin<Error = RS::Error>,
    D: DataPin<Error = RS::Error>,
{
    type Error = InterfaceError<Infallible, RS::Error>;

    fn data_width(&self) -> DataWidth {
        if N == 8 {
            DataWidth::Eight
        } else {
            DataWidth::Four
        }
    }

    fn can_read(&self) -> bool {
        self.read_write.is_some() && D::READABLE
    }

    fn set_line(&mut self, line: Line, level: bool) -> Result<(), Self::Error> {
        match line {
            Line::RegisterSelect => drive(&mut self.register_select, level),
            Line::Enable => drive(&mut self.enable, level),
            Line::ReadWrite => match self.read_write.as_mut() {
                Some(pin) => drive(pin, level),
                None if !level => Ok(()),
                None => return Err(InterfaceError::Unsupported(line)),
            },
            Line::Data(i) => match self.data.get_mut(i as usize) {
                Some(pin) => drive(pin, level),
                None => return Err(InterfaceError::Unsupported(line)),
            },
            // No backlight switch on bare pins
            Line::Backlight => Ok(()),
        }
        .map_err(InterfaceError::Pin)
    }

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error> {
        match (line, direction) {
            (Line::Data(i), _) => match self.data.get_mut(i as usize) {
                Some(pin) => pin.set_direction(direction).map_err(InterfaceError::Pin),
                None => Err(InterfaceError::Unsupported(line)),
            },
            (_, Direction::Output) => Ok(()),
            (_, Direction::Input) => Err(InterfaceError::Unsupported(line)),
        }
    }

    fn read_line(&mut self, line: Line) -> Result<bool, Self::Error> {
        match line {
            Line::Data(i) if D::READABLE => match self.data.get_mut(i as usize) {
                Some(pin) => pin.read().map_err(InterfaceError::Pin),
                None => Err(InterfaceError::Unsupported(line)),
            },
            _ => Err(InterfaceError::Unsupported(line)),
        }
    }

    fn needs_critical_section(&self) -> bool {
        true
    }
}
