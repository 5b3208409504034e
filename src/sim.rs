//! Line-level HD44780 model for tests
//!
//! [`SimController`] reacts to enable edges the way the controller does:
//! writes latch on the falling edge, reads present data while E is high.
//! It models the 8-bit power-on state, 4-bit nibble pairing, address
//! counter wrapping, CGRAM and the status byte, plus fault injection
//! (corrupted data, lost enable pulses, busy flag).
//!
//! It is reachable through [`SimTransport`], through [`SimPin`]s for the raw
//! GPIO transport, through [`MockExpander`] (MCP23008) and through
//! [`MockShiftRegister`] (74HC595).

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiDevice};

use crate::expander::{GPIO, OLAT};
use crate::interface::{DataWidth, Direction, Line, PinMap, Transport};

/// Controller-side line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimLine {
    RegisterSelect,
    ReadWrite,
    Enable,
    /// D0..D7
    Data(u8),
}

#[derive(Debug)]
struct State {
    rs: bool,
    rw: bool,
    e: bool,
    host_data: u8,
    host_reading: bool,
    direction_tracked: bool,
    backlight: bool,

    eight_bit: bool,
    two_line: bool,
    increment: bool,
    control: u8,
    pending: Option<u8>,
    low_read_phase: bool,
    read_latch: u8,
    presented: u8,
    ac: u8,
    cgram_mode: bool,
    ddram: [u8; 128],
    cgram: [u8; 64],
    instructions: Vec<u8>,

    corrupt_mask: Option<u8>,
    drop_enable: bool,
    busy_polls: u32,
    stuck_busy: bool,
    status_reads: u32,
    contention: u32,
}

impl State {
    fn new() -> Self {
        Self {
            rs: false,
            rw: false,
            e: false,
            host_data: 0,
            host_reading: false,
            direction_tracked: false,
            backlight: false,
            eight_bit: true,
            two_line: false,
            increment: true,
            control: 0,
            pending: None,
            low_read_phase: false,
            read_latch: 0,
            presented: 0,
            ac: 0,
            cgram_mode: false,
            ddram: [0x20; 128],
            cgram: [0; 64],
            instructions: Vec::new(),
            corrupt_mask: None,
            drop_enable: false,
            busy_polls: 0,
            stuck_busy: false,
            status_reads: 0,
            contention: 0,
        }
    }

    fn set_line(&mut self, line: SimLine, level: bool) {
        match line {
            SimLine::RegisterSelect => self.rs = level,
            SimLine::ReadWrite => self.rw = level,
            SimLine::Data(i) => {
                if level {
                    self.host_data |= 1 << i;
                } else {
                    self.host_data &= !(1 << i);
                }
            }
            SimLine::Enable => {
                let was = self.e;
                self.e = level;
                if !was && level {
                    self.rising_edge();
                } else if was && !level {
                    self.falling_edge();
                }
            }
        }
    }

    fn read_line(&self, line: SimLine) -> bool {
        match line {
            SimLine::RegisterSelect => self.rs,
            SimLine::ReadWrite => self.rw,
            SimLine::Enable => self.e,
            SimLine::Data(i) if self.rw && self.e => (self.presented >> i) & 1 != 0,
            SimLine::Data(i) => (self.host_data >> i) & 1 != 0,
        }
    }

    fn status(&mut self) -> u8 {
        self.status_reads += 1;
        let busy = if self.stuck_busy {
            true
        } else if self.busy_polls > 0 {
            self.busy_polls -= 1;
            true
        } else {
            false
        };
        (u8::from(busy) << 7) | (self.ac & 0x7F)
    }

    fn rising_edge(&mut self) {
        if !self.rw {
            return;
        }
        if self.direction_tracked && !self.host_reading {
            self.contention += 1;
        }
        if !self.low_read_phase {
            self.read_latch = if !self.rs {
                self.status()
            } else if self.cgram_mode {
                self.cgram[(self.ac & 0x3F) as usize]
            } else {
                self.ddram[(self.ac & 0x7F) as usize]
            };
        }
        self.presented = if self.eight_bit {
            self.read_latch
        } else if self.low_read_phase {
            self.read_latch << 4
        } else {
            self.read_latch & 0xF0
        };
    }

    fn falling_edge(&mut self) {
        if self.rw {
            self.presented = 0;
            if self.eight_bit || self.low_read_phase {
                self.low_read_phase = false;
                if self.rs {
                    self.advance();
                }
            } else {
                self.low_read_phase = true;
            }
            return;
        }
        if self.drop_enable {
            self.drop_enable = false;
            return;
        }
        if self.eight_bit {
            self.execute(self.host_data);
        } else {
            let nibble = self.host_data >> 4;
            match self.pending.take() {
                None => self.pending = Some(nibble),
                Some(high) => self.execute((high << 4) | nibble),
            }
        }
    }

    fn advance(&mut self) {
        if self.cgram_mode {
            self.ac = if self.increment {
                (self.ac + 1) & 0x3F
            } else {
                self.ac.wrapping_sub(1) & 0x3F
            };
            return;
        }
        self.ac = match (self.two_line, self.increment, self.ac) {
            (true, true, 0x27) => 0x40,
            (true, true, 0x67) => 0x00,
            (true, false, 0x00) => 0x67,
            (true, false, 0x40) => 0x27,
            (false, true, 0x4F) => 0x00,
            (false, false, 0x00) => 0x4F,
            (_, true, ac) => ac + 1,
            (_, false, ac) => ac - 1,
        };
    }

    fn execute(&mut self, byte: u8) {
        if self.rs {
            let value = byte ^ self.corrupt_mask.take().unwrap_or(0);
            if self.cgram_mode {
                self.cgram[(self.ac & 0x3F) as usize] = value;
            } else {
                self.ddram[(self.ac & 0x7F) as usize] = value;
            }
            self.advance();
            return;
        }
        self.instructions.push(byte);
        if byte & 0x80 != 0 {
            self.ac = byte & 0x7F;
            self.cgram_mode = false;
        } else if byte & 0x40 != 0 {
            self.ac = byte & 0x3F;
            self.cgram_mode = true;
        } else if byte & 0x20 != 0 {
            self.eight_bit = byte & 0x10 != 0;
            self.two_line = byte & 0x08 != 0;
        } else if byte & 0x10 != 0 {
            // Cursor move; display shifts leave the address counter alone
            if byte & 0x08 == 0 {
                let increment = self.increment;
                self.increment = byte & 0x04 != 0;
                self.advance();
                self.increment = increment;
            }
        } else if byte & 0x08 != 0 {
            self.control = byte;
        } else if byte & 0x04 != 0 {
            self.increment = byte & 0x02 != 0;
        } else if byte & 0x02 != 0 {
            self.ac = 0;
            self.cgram_mode = false;
        } else if byte & 0x01 != 0 {
            self.ddram = [0x20; 128];
            self.ac = 0;
            self.increment = true;
            self.cgram_mode = false;
        }
    }

    /// Decode an expander output byte, E last so data is stable on its edge
    fn apply_backpack(&mut self, map: PinMap, byte: u8) {
        let bit = |b: u8| (byte >> b) & 1 != 0;
        for (i, &b) in map.data.iter().enumerate() {
            self.set_line(SimLine::Data(4 + i as u8), bit(b));
        }
        self.set_line(SimLine::RegisterSelect, bit(map.register_select));
        self.backlight = bit(map.backlight);
        self.set_line(SimLine::Enable, bit(map.enable));
    }
}

/// Shared handle to a simulated controller
#[derive(Clone, Debug)]
pub struct SimController(Rc<RefCell<State>>);

impl SimController {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(State::new())))
    }

    pub fn pin(&self, line: SimLine) -> SimPin {
        SimPin {
            sim: self.clone(),
            line,
        }
    }

    fn set_line(&self, line: SimLine, level: bool) {
        self.0.borrow_mut().set_line(line, level);
    }

    fn read_line(&self, line: SimLine) -> bool {
        self.0.borrow().read_line(line)
    }

    fn apply_backpack(&self, map: PinMap, byte: u8) {
        self.0.borrow_mut().apply_backpack(map, byte);
    }

    pub fn ddram(&self, address: u8) -> u8 {
        self.0.borrow().ddram[(address & 0x7F) as usize]
    }

    pub fn ddram_range(&self, start: u8, len: usize) -> Vec<u8> {
        let start = start as usize;
        self.0.borrow().ddram[start..start + len].to_vec()
    }

    pub fn poke_ddram(&self, address: u8, value: u8) {
        self.0.borrow_mut().ddram[(address & 0x7F) as usize] = value;
    }

    pub fn cgram_glyph(&self, slot: u8) -> [u8; 8] {
        let start = (slot as usize & 0x07) * 8;
        let mut glyph = [0u8; 8];
        glyph.copy_from_slice(&self.0.borrow().cgram[start..start + 8]);
        glyph
    }

    pub fn address_counter(&self) -> u8 {
        self.0.borrow().ac
    }

    pub fn instructions(&self) -> Vec<u8> {
        self.0.borrow().instructions.clone()
    }

    pub fn eight_bit_interface(&self) -> bool {
        self.0.borrow().eight_bit
    }

    pub fn two_line(&self) -> bool {
        self.0.borrow().two_line
    }

    pub fn increments(&self) -> bool {
        self.0.borrow().increment
    }

    pub fn addressing_cgram(&self) -> bool {
        self.0.borrow().cgram_mode
    }

    pub fn display_control(&self) -> u8 {
        self.0.borrow().control
    }

    pub fn nibble_pending(&self) -> bool {
        self.0.borrow().pending.is_some()
    }

    pub fn status_reads(&self) -> u32 {
        self.0.borrow().status_reads
    }

    /// Reads started while the host still drove the data lines
    pub fn contention(&self) -> u32 {
        self.0.borrow().contention
    }

    pub fn host_reading(&self) -> bool {
        self.0.borrow().host_reading
    }

    /// Data lines as driven by the host, D0..D7
    pub fn host_data(&self) -> u8 {
        self.0.borrow().host_data
    }

    pub fn backlight(&self) -> bool {
        self.0.borrow().backlight
    }

    /// Report busy for the next `polls` status reads
    pub fn set_busy_polls(&self, polls: u32) {
        self.0.borrow_mut().busy_polls = polls;
    }

    pub fn set_stuck_busy(&self, stuck: bool) {
        self.0.borrow_mut().stuck_busy = stuck;
    }

    /// XOR the next data byte written with `mask`
    pub fn corrupt_next_data(&self, mask: u8) {
        self.0.borrow_mut().corrupt_mask = Some(mask);
    }

    /// Ignore the next write strobe
    pub fn drop_next_enable(&self) {
        self.0.borrow_mut().drop_enable = true;
    }
}

/// A GPIO pin wired to one controller line
pub struct SimPin {
    sim: SimController,
    line: SimLine,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.sim.set_line(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.sim.set_line(self.line, true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.sim.read_line(self.line))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.sim.read_line(self.line))
    }
}

/// Transport wired straight to the model
pub struct SimTransport {
    sim: SimController,
    width: DataWidth,
    readable: bool,
}

impl SimTransport {
    pub fn new(sim: &SimController, width: DataWidth, readable: bool) -> Self {
        sim.0.borrow_mut().direction_tracked = true;
        Self {
            sim: sim.clone(),
            width,
            readable,
        }
    }

    fn data_line(&self, i: u8) -> SimLine {
        match self.width {
            DataWidth::Four => SimLine::Data(4 + i),
            DataWidth::Eight => SimLine::Data(i),
        }
    }
}

impl Transport for SimTransport {
    type Error = Infallible;

    fn data_width(&self) -> DataWidth {
        self.width
    }

    fn can_read(&self) -> bool {
        self.readable
    }

    fn set_line(&mut self, line: Line, level: bool) -> Result<(), Self::Error> {
        match line {
            Line::RegisterSelect => self.sim.set_line(SimLine::RegisterSelect, level),
            Line::ReadWrite => self.sim.set_line(SimLine::ReadWrite, level),
            Line::Enable => self.sim.set_line(SimLine::Enable, level),
            Line::Data(i) => self.sim.set_line(self.data_line(i), level),
            Line::Backlight => self.sim.0.borrow_mut().backlight = level,
        }
        Ok(())
    }

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error> {
        if let Line::Data(_) = line {
            self.sim.0.borrow_mut().host_reading = direction == Direction::Input;
        }
        Ok(())
    }

    fn read_line(&mut self, line: Line) -> Result<bool, Self::Error> {
        Ok(match line {
            Line::Data(i) => self.sim.read_line(self.data_line(i)),
            Line::RegisterSelect => self.sim.read_line(SimLine::RegisterSelect),
            Line::ReadWrite => self.sim.read_line(SimLine::ReadWrite),
            Line::Enable => self.sim.read_line(SimLine::Enable),
            Line::Backlight => self.sim.backlight(),
        })
    }
}

/// Error raised by [`GlitchTransport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glitch;

/// [`SimTransport`] that refuses one enable strobe when armed
///
/// The refused strobe never reaches the model, so E stays low.
pub struct GlitchTransport {
    inner: SimTransport,
    skip: Option<u32>,
}

impl GlitchTransport {
    pub fn new(sim: &SimController, width: DataWidth) -> Self {
        Self {
            inner: SimTransport::new(sim, width, true),
            skip: None,
        }
    }

    /// Let `skip` more strobes through, then fail the next one
    pub fn fail_strobe_after(&mut self, skip: u32) {
        self.skip = Some(skip);
    }
}

impl Transport for GlitchTransport {
    type Error = Glitch;

    fn data_width(&self) -> DataWidth {
        self.inner.data_width()
    }

    fn can_read(&self) -> bool {
        self.inner.can_read()
    }

    fn set_line(&mut self, line: Line, level: bool) -> Result<(), Self::Error> {
        if line == Line::Enable && level {
            match self.skip {
                Some(0) => {
                    self.skip = None;
                    return Err(Glitch);
                }
                Some(n) => self.skip = Some(n - 1),
                None => {}
            }
        }
        self.inner.set_line(line, level).map_err(|e| match e {})
    }

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error> {
        self.inner.set_direction(line, direction).map_err(|e| match e {})
    }

    fn read_line(&mut self, line: Line) -> Result<bool, Self::Error> {
        self.inner.read_line(line).map_err(|e| match e {})
    }
}

/// MCP23008 on an I2C bus, its port wired per the backpack pin map
pub struct MockExpander {
    sim: SimController,
    latch: u8,
    /// `(address, register, value)` for every register write
    pub writes: Vec<(u8, u8, u8)>,
}

impl MockExpander {
    pub fn new(sim: &SimController) -> Self {
        Self {
            sim: sim.clone(),
            latch: 0,
            writes: Vec::new(),
        }
    }
}

impl i2c::ErrorType for MockExpander {
    type Error = Infallible;
}

impl I2c for MockExpander {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut register = None;
        for operation in operations {
            match operation {
                i2c::Operation::Write(bytes) => {
                    register = bytes.first().copied();
                    if let [reg, value] = bytes[..] {
                        self.writes.push((address, reg, value));
                        if reg == OLAT || reg == GPIO {
                            self.latch = value;
                            self.sim.apply_backpack(crate::expander::PIN_MAP, value);
                        }
                    }
                }
                i2c::Operation::Read(buf) => {
                    let value = match register {
                        Some(GPIO | OLAT) => self.latch,
                        _ => 0,
                    };
                    buf.fill(value);
                }
            }
        }
        Ok(())
    }
}

/// 74HC595 on an SPI device, outputs wired per the backpack pin map
pub struct MockShiftRegister {
    sim: SimController,
    /// Every byte shifted in
    pub bytes: Vec<u8>,
}

impl MockShiftRegister {
    pub fn new(sim: &SimController) -> Self {
        Self {
            sim: sim.clone(),
            bytes: Vec::new(),
        }
    }
}

impl spi::ErrorType for MockShiftRegister {
    type Error = Infallible;
}

impl SpiDevice for MockShiftRegister {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        for operation in operations {
            if let spi::Operation::Write(bytes) = operation {
                for &byte in bytes.iter() {
                    self.bytes.push(byte);
                    // Latched when CS rises at the end of the transaction
                    self.sim
                        .apply_backpack(crate::shift_register::PIN_MAP, byte);
                }
            }
        }
        Ok(())
    }
}

/// Delay that only accounts for the time requested
#[derive(Debug, Default)]
pub struct SimDelay {
    ns: u64,
}

impl SimDelay {
    pub fn elapsed_us(&self) -> u64 {
        self.ns / 1_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns += u64::from(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.ns += u64::from(us) * 1_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ns += u64::from(ms) * 1_000_000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strobe(sim: &SimController, rs: bool, byte: u8) {
        sim.set_line(SimLine::RegisterSelect, rs);
        for i in 0..8 {
            sim.set_line(SimLine::Data(i), (byte >> i) & 1 != 0);
        }
        sim.set_line(SimLine::Enable, true);
        sim.set_line(SimLine::Enable, false);
    }

    #[test]
    fn test_starts_in_eight_bit_mode() {
        let sim = SimController::new();
        strobe(&sim, false, 0x80 | 0x10);
        strobe(&sim, true, b'k');
        assert_eq!(sim.ddram(0x10), b'k');
        assert_eq!(sim.address_counter(), 0x11);
    }

    #[test]
    fn test_two_line_wrap() {
        let sim = SimController::new();
        strobe(&sim, false, 0x38);
        strobe(&sim, false, 0x80 | 0x27);
        strobe(&sim, true, b'a');
        assert_eq!(sim.address_counter(), 0x40);
        strobe(&sim, false, 0x80 | 0x67);
        strobe(&sim, true, b'b');
        assert_eq!(sim.address_counter(), 0x00);
    }

    #[test]
    fn test_clear_resets_entry_direction() {
        let sim = SimController::new();
        strobe(&sim, false, 0x04);
        assert!(!sim.increments());
        strobe(&sim, true, b'x');
        strobe(&sim, false, 0x01);
        assert!(sim.increments());
        assert_eq!(sim.ddram(0x00), 0x20);
    }

    #[test]
    fn test_dropped_strobe_desyncs_nibbles() {
        let sim = SimController::new();
        // Switch to 4-bit
        strobe(&sim, false, 0x20);
        assert!(!sim.eight_bit_interface());
        sim.drop_next_enable();
        strobe(&sim, false, 0x80);
        assert!(!sim.nibble_pending());
        strobe(&sim, false, 0x00);
        assert!(sim.nibble_pending());
    }
}
