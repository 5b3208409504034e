//! Error types for the driver
//!
//! This module defines error types for configuration building ([`BuilderError`])
//! and driver operations ([`Error`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Invalid geometry or transport addressing, rejected at construction
//! - [`Error`] - Runtime errors during driver operations
//! - [`InterfaceError`](crate::interface::InterfaceError) - Low-level pin/bus errors
//!
//! Corruption of DDRAM is not an error: the write path repairs it internally
//! and [`check_display`](crate::Lcd::check_display) reports it in its
//! [`AuditReport`](crate::AuditReport).
//!
//! ## Example
//!
//! ```
//! use hd44780_shadow::{Builder, BuilderError, Font, Geometry};
//!
//! // Missing geometry
//! let result = Builder::new().build();
//! assert!(matches!(result, Err(BuilderError::MissingGeometry)));
//!
//! // Five rows cannot be addressed
//! let result = Geometry::new(20, 5, Font::Dots5x8);
//! assert!(result.is_err());
//! ```

use crate::config::{MAX_COLUMNS, MAX_ROWS};
use crate::interface::Transport;

/// Errors that can occur when driving the display
///
/// Generic over the transport type to preserve the specific error type.
pub enum Error<T: Transport> {
    /// Transport error (GPIO/I2C/SPI)
    ///
    /// Wraps the underlying hardware error from the [`Transport`] implementation.
    Transport(T::Error),
    /// The controller kept its busy flag set for the whole polling budget
    ///
    /// See [`BusyPolicy`](crate::BusyPolicy). The operation can be retried;
    /// repeated timeouts point at a disconnected or unpowered controller.
    BusyTimeout {
        /// Number of busy-flag reads performed
        attempts: u32,
    },
    /// The operation needs to read the bus but the transport is write-only
    ///
    /// Raw GPIO without an R/W pin and both backpacks cannot read DDRAM.
    ReadUnsupported,
}

// Transports are not required to implement `Debug`
impl<T: Transport> core::fmt::Debug for Error<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => f.debug_tuple("Transport").field(e).finish(),
            Self::BusyTimeout { attempts } => f
                .debug_struct("BusyTimeout")
                .field("attempts", attempts)
                .finish(),
            Self::ReadUnsupported => f.write_str("ReadUnsupported"),
        }
    }
}

impl<T: Transport> core::fmt::Display for Error<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(_) => write!(f, "Transport error"),
            Self::BusyTimeout { attempts } => {
                write!(f, "Controller still busy after {attempts} polls")
            }
            Self::ReadUnsupported => write!(f, "Transport cannot read from the controller"),
        }
    }
}

impl<T: Transport> core::error::Error for Error<T> {}

/// Errors that can occur when building configuration or transports
///
/// These errors occur before the driver is created.
#[derive(Debug, PartialEq)]
pub enum BuilderError {
    /// Geometry was not specified
    ///
    /// [`Builder::geometry()`](crate::config::Builder::geometry) must be called before building.
    MissingGeometry,
    /// Invalid geometry provided
    ///
    /// See [`Geometry::new()`](crate::config::Geometry::new) for constraints.
    InvalidGeometry {
        /// Number of columns requested
        columns: u8,
        /// Number of rows requested
        rows: u8,
    },
    /// I2C address outside the MCP23008 range
    ///
    /// Accepted values are the expander index `0..=7` or the bus address
    /// `0x20..=0x27`.
    InvalidI2cAddress(u8),
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingGeometry => write!(f, "Geometry must be specified"),
            Self::InvalidGeometry { columns, rows } => write!(
                f,
                "Invalid geometry {columns}x{rows} (max {MAX_COLUMNS}x{MAX_ROWS})"
            ),
            Self::InvalidI2cAddress(address) => {
                write!(f, "Invalid MCP23008 address {address:#04x}")
            }
        }
    }
}

impl core::error::Error for BuilderError {}
