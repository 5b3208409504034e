//! Self-healing HD44780 Character LCD Driver
//!
//! A driver for HD44780-compatible character LCDs up to 20x4, over raw GPIO,
//! an MCP23008 I2C backpack or a 74HC595 SPI backpack.
//!
//! ## Features
//!
//! - `no_std` compatible
//! - `embedded-hal` v1.0 support
//! - 4-bit and 8-bit parallel buses, with or without an R/W pin
//! - Bounded busy-flag polling when the controller can be read
//! - Shadow copy of DDRAM with write verification, automatic
//!   resynchronization and replay, and an on-demand audit
//! - Custom glyphs, scrolling, text direction, autoscroll, backlight
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core::convert::Infallible;
//! use core::fmt::Write;
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::digital::{InputPin, OutputPin};
//! use hd44780_shadow::{
//!     Builder, Diagnostics, Font, Geometry, Lcd, OpenDrain, ParallelTransport,
//! };
//!
//! # struct MockPin;
//! # impl embedded_hal::digital::ErrorType for MockPin { type Error = Infallible; }
//! # impl OutputPin for MockPin {
//! #     fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl InputPin for MockPin {
//! #     fn is_high(&mut self) -> Result<bool, Self::Error> { Ok(false) }
//! #     fn is_low(&mut self) -> Result<bool, Self::Error> { Ok(true) }
//! # }
//! # struct MockDelay;
//! # impl DelayNs for MockDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let (rs, rw, en) = (MockPin, MockPin, MockPin);
//! # let data = [MockPin, MockPin, MockPin, MockPin];
//! let transport = ParallelTransport::new_4bit_rw(rs, rw, en, data.map(OpenDrain::new));
//! let geometry = match Geometry::new(20, 4, Font::Dots5x8) {
//!     Ok(geometry) => geometry,
//!     Err(_) => return,
//! };
//! let config = match Builder::new().geometry(geometry).build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//!
//! let mut lcd = Lcd::new(transport, MockDelay, config);
//! let _ = lcd.begin();
//! let _ = lcd.set_cursor(0, 1);
//! let _ = write!(lcd, "HELLO WORLD FROM LCD");
//! let _ = lcd.check_display(Diagnostics::Warn);
//! ```

#![no_std]

#[cfg(test)]
extern crate alloc;

/// HD44780 bus protocol engine
pub mod bus;
/// HD44780 instruction set
pub mod command;
/// Display configuration types and builder
pub mod config;
/// Core display operations
pub mod display;
/// Error types for the driver
pub mod error;
/// MCP23008 I2C backpack transport
pub mod expander;
/// Hardware transport abstraction
pub mod interface;
/// Controller mode registers
pub mod mode;
/// Raw GPIO transport
pub mod parallel;
/// Resynchronization, replay and audit
pub mod recovery;
/// DDRAM shadow buffer and cursor tracking
pub mod shadow;
/// 74HC595 SPI backpack transport
pub mod shift_register;

#[cfg(test)]
mod sim;

pub use bus::{Bus, BusyStatus, Readiness, Register};
pub use config::{
    Builder, BusyPolicy, Config, Font, Geometry, MAX_COLUMNS, MAX_ROWS, ROW_BUFFER_OFFSET,
    ROW_DDRAM_BASE, SHADOW_SIZE,
};
pub use display::Lcd;
pub use error::{BuilderError, Error};
pub use expander::I2cExpanderTransport;
pub use interface::{DataWidth, Direction, InterfaceError, Line, PinMap, Transport};
pub use mode::ControllerMode;
pub use parallel::{DataPin, NoPin, OpenDrain, OutputOnly, ParallelTransport};
pub use recovery::{AuditReport, Diagnostics, RecoveryState, Stats};
pub use shadow::{BLANK, CursorState, ShadowBuffer};
pub use shift_register::ShiftRegisterTransport;
