//! HD44780 bus protocol
//!
//! Frames instructions and data over a [`Transport`]: register select, one
//! 8-bit frame or two 4-bit frames (high nibble first), each latched by an
//! enable pulse. Reads switch the data lines to input, raise R/W and sample
//! while E is high.
//!
//! ## Timing
//!
//! | Step               | Time   |
//! |--------------------|--------|
//! | E low before pulse | 1 µs   |
//! | E high             | 1 µs   |
//! | Settle after pulse | 100 µs |
//!
//! Most instructions finish within 37 µs, so the settle time alone is
//! enough on write-only transports. Clear and home need ~1.5 ms and get an
//! explicit delay from the caller.

use embedded_hal::delay::DelayNs;
use log::trace;

use crate::command::{ADDRESS_MASK, BUSY_FLAG};
use crate::config::BusyPolicy;
use crate::error::Error;
use crate::interface::{DataWidth, Direction, Line, Transport};

type BusResult<T, R> = core::result::Result<R, Error<T>>;

/// Enable pulse high time in microseconds
pub const ENABLE_PULSE_US: u32 = 1;
/// Settle time after an enable pulse in microseconds
pub const SETTLE_US: u32 = 100;

/// Target register of a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    /// Instruction register (RS low); reads return the status byte
    Instruction,
    /// DDRAM or CGRAM (RS high)
    Data,
}

impl Register {
    fn level(self) -> bool {
        self == Self::Data
    }
}

/// Decoded status byte
///
/// Bit 7 of the status byte is the busy flag and bits 0..6 the address
/// counter. DDRAM addresses never exceed `0x67`, so the address survives
/// masking the flag off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusyStatus {
    /// Controller is still executing the previous instruction
    pub busy: bool,
    /// Address counter
    pub address: u8,
}

impl From<u8> for BusyStatus {
    fn from(status: u8) -> Self {
        Self {
            busy: status & BUSY_FLAG != 0,
            address: status & ADDRESS_MASK,
        }
    }
}

/// Outcome of a bounded ready-wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Controller is idle; carries the address counter
    Ready(u8),
    /// Busy flag stayed set for every poll
    TimedOut {
        /// Number of polls performed
        attempts: u32,
    },
}

/// Protocol engine over a transport and a delay provider
pub struct Bus<T, D> {
    transport: T,
    delay: D,
}

impl<T, D> Bus<T, D>
where
    T: Transport,
    D: DelayNs,
{
    /// Create a bus over `transport`
    pub fn new(transport: T, delay: D) -> Self {
        Self { transport, delay }
    }

    /// Access the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport and delay
    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }

    /// Whether the controller can be read over this transport
    pub fn can_read(&self) -> bool {
        self.transport.can_read()
    }

    /// Block for `us` microseconds
    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Block for `ms` milliseconds
    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn pulse(transport: &mut T, delay: &mut D) -> Result<(), T::Error> {
        transport.set_line(Line::Enable, false)?;
        delay.delay_us(ENABLE_PULSE_US);
        transport.set_line(Line::Enable, true)?;
        delay.delay_us(ENABLE_PULSE_US);
        transport.set_line(Line::Enable, false)?;
        delay.delay_us(SETTLE_US);
        Ok(())
    }

    fn frame(transport: &mut T, delay: &mut D, value: u8) -> Result<(), T::Error> {
        transport.write_data_lines(value)?;
        Self::pulse(transport, delay)
    }

    /// Strobe E: low, high for 1 µs, low, then wait for the settle time
    pub fn pulse_enable(&mut self) -> BusResult<T, ()> {
        Self::pulse(&mut self.transport, &mut self.delay).map_err(Error::Transport)
    }

    /// Put one frame on the data lines and latch it
    ///
    /// On raw GPIO the frame runs with interrupts masked so an interrupt
    /// cannot stretch the enable pulse.
    pub fn write_frame(&mut self, value: u8) -> BusResult<T, ()> {
        trace!("frame: {:08b}", value);
        let Self { transport, delay } = self;
        let result = if transport.needs_critical_section() {
            critical_section::with(|_| Self::frame(transport, delay, value))
        } else {
            Self::frame(transport, delay, value)
        };
        result.map_err(Error::Transport)
    }

    /// Write a single nibble on D4..D7 with RS and R/W low
    ///
    /// Used by the reset handshake, when the controller's interface width is
    /// not known yet.
    pub fn write_nibble(&mut self, nibble: u8) -> BusResult<T, ()> {
        self.select(Register::Instruction, false)?;
        let value = match self.transport.data_width() {
            DataWidth::Four => nibble & 0x0F,
            DataWidth::Eight => (nibble & 0x0F) << 4,
        };
        self.write_frame(value)
    }

    fn select(&mut self, register: Register, read: bool) -> BusResult<T, ()> {
        self.transport
            .set_line(Line::RegisterSelect, register.level())
            .map_err(Error::Transport)?;
        self.transport
            .set_line(Line::ReadWrite, read)
            .map_err(Error::Transport)
    }

    /// Send a byte to `register`
    pub fn transmit(&mut self, value: u8, register: Register) -> BusResult<T, ()> {
        trace!("send {:#04x} ({:?})", value, register);
        self.select(register, false)?;
        match self.transport.data_width() {
            DataWidth::Eight => self.write_frame(value),
            DataWidth::Four => {
                self.write_frame(value >> 4)?;
                self.write_frame(value & 0x0F)
            }
        }
    }

    fn read_frame(&mut self) -> Result<u8, T::Error> {
        self.transport.set_line(Line::Enable, true)?;
        self.delay.delay_us(ENABLE_PULSE_US);
        let value = self.transport.read_data_lines()?;
        self.transport.set_line(Line::Enable, false)?;
        self.delay.delay_us(ENABLE_PULSE_US);
        Ok(value)
    }

    fn read_byte(&mut self) -> Result<u8, T::Error> {
        match self.transport.data_width() {
            DataWidth::Eight => self.read_frame(),
            DataWidth::Four => {
                let high = self.read_frame()?;
                let low = self.read_frame()?;
                Ok((high << 4) | (low & 0x0F))
            }
        }
    }

    /// Read a byte from `register`
    ///
    /// Reading [`Register::Data`] returns the cell at the address counter and
    /// advances the counter like a write does.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadUnsupported` on write-only transports.
    pub fn receive(&mut self, register: Register) -> BusResult<T, u8> {
        if !self.transport.can_read() {
            return Err(Error::ReadUnsupported);
        }
        self.transport
            .set_data_direction(Direction::Input)
            .map_err(Error::Transport)?;
        self.select(register, true)?;
        self.delay.delay_us(ENABLE_PULSE_US);
        let value = self.read_byte();
        // Hand the bus back to the host even when sampling failed
        let restore = self
            .transport
            .set_line(Line::ReadWrite, false)
            .and_then(|()| self.transport.set_data_direction(Direction::Output));
        let value = value.map_err(Error::Transport)?;
        restore.map_err(Error::Transport)?;
        self.delay.delay_us(SETTLE_US);
        trace!("recv {:#04x} ({:?})", value, register);
        Ok(value)
    }

    /// Read and decode the status byte
    pub fn query_busy(&mut self) -> BusResult<T, BusyStatus> {
        self.receive(Register::Instruction).map(BusyStatus::from)
    }

    /// Poll the busy flag until it clears or the policy runs out
    pub fn wait_until_ready(&mut self, policy: BusyPolicy) -> BusResult<T, Readiness> {
        let attempts = policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            let status = self.query_busy()?;
            if !status.busy {
                return Ok(Readiness::Ready(status.address));
            }
            if attempt < attempts {
                self.delay.delay_us(policy.interval_us);
            }
        }
        Ok(Readiness::TimedOut { attempts })
    }
}
