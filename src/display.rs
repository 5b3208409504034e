//! Core display operations

use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};

use crate::bus::{Bus, Readiness, Register};
use crate::command::{
    ADDRESS_MASK, CLEAR_DISPLAY, CURSOR_SHIFT, DISPLAY_MOVE, INIT_EIGHT_BIT_NIBBLE,
    INIT_FOUR_BIT_NIBBLE, MOVE_LEFT, MOVE_RIGHT, RETURN_HOME, SET_CGRAM_ADDRESS,
    SET_DDRAM_ADDRESS,
};
use crate::config::Config;
use crate::error::Error;
use crate::interface::{DataWidth, Transport};
use crate::mode::ControllerMode;
use crate::recovery::{RecoveryState, Stats};
use crate::shadow::{CursorState, ShadowBuffer};

type LcdResult<T> = core::result::Result<(), Error<T>>;

/// Execution time of clear and home in microseconds
pub const CLEAR_DELAY_US: u32 = 2_000;

/// Number of custom glyph slots in CGRAM
pub const GLYPH_SLOTS: u8 = 8;

// Reset handshake waits (datasheet figure 24)
const HANDSHAKE_FIRST_US: u32 = 4_500;
const HANDSHAKE_SECOND_US: u32 = 4_500;
const HANDSHAKE_THIRD_US: u32 = 150;

/// HD44780 character LCD driver
///
/// Owns the transport and the delay provider. Every character written is
/// mirrored in a shadow buffer; on transports that can read the controller,
/// each write is read back and a mismatch triggers
/// [`rewrite_all`](Lcd::rewrite_all).
pub struct Lcd<T, D>
where
    T: Transport,
    D: DelayNs,
{
    /// Protocol engine
    pub(crate) bus: Bus<T, D>,
    /// Driver configuration
    pub(crate) config: Config,
    /// Mode registers as last programmed
    pub(crate) mode: ControllerMode,
    /// Expected DDRAM contents
    pub(crate) shadow: ShadowBuffer,
    /// Position of the next character
    pub(crate) cursor: CursorState,
    /// Counters
    pub(crate) stats: Stats,
}

impl<T, D> Lcd<T, D>
where
    T: Transport,
    D: DelayNs,
{
    /// Create a new driver
    ///
    /// Nothing is sent until [`begin`](Lcd::begin).
    pub fn new(transport: T, delay: D, config: Config) -> Self {
        let mode = ControllerMode::initial(&config.geometry, transport.data_width());
        Self {
            bus: Bus::new(transport, delay),
            config,
            mode,
            shadow: ShadowBuffer::new(),
            cursor: CursorState::origin(),
            stats: Stats::default(),
        }
    }

    /// Prepare the transport and run the power-on initialization
    ///
    /// Leaves the display on, cursor and blink off, text flowing left to
    /// right, the screen and the shadow buffer blank.
    pub fn begin(&mut self) -> LcdResult<T> {
        let geometry = self.config.geometry;
        debug!(
            "begin: {}x{}, {:?} data lines",
            geometry.columns,
            geometry.rows,
            self.bus.transport().data_width()
        );
        self.bus.transport_mut().prepare().map_err(Error::Transport)?;
        self.mode = ControllerMode::initial(&geometry, self.bus.transport().data_width());
        self.initialize(RecoveryState::Normal)
    }

    /// Reset handshake followed by the current mode registers and a clear
    ///
    /// Only the first power-on waits for Vcc to settle. Resynchronization
    /// reissues the caller's mode, not the power-on defaults.
    pub(crate) fn initialize(&mut self, state: RecoveryState) -> LcdResult<T> {
        if state == RecoveryState::Normal {
            self.bus.delay_ms(self.config.power_on_delay_ms);
        }
        self.handshake()?;
        self.command(self.mode.function_command())?;
        self.command(self.mode.control_command())?;
        self.clear_with(state)
    }

    /// Bring the interface into a known width whatever state it was left in
    fn handshake(&mut self) -> LcdResult<T> {
        match self.bus.transport().data_width() {
            DataWidth::Four => {
                self.bus.write_nibble(INIT_EIGHT_BIT_NIBBLE)?;
                self.bus.delay_us(HANDSHAKE_FIRST_US);
                self.bus.write_nibble(INIT_EIGHT_BIT_NIBBLE)?;
                self.bus.delay_us(HANDSHAKE_SECOND_US);
                self.bus.write_nibble(INIT_EIGHT_BIT_NIBBLE)?;
                self.bus.delay_us(HANDSHAKE_THIRD_US);
                self.bus.write_nibble(INIT_FOUR_BIT_NIBBLE)
            }
            DataWidth::Eight => {
                let function = self.mode.function_command();
                self.bus.transmit(function, Register::Instruction)?;
                self.bus.delay_us(HANDSHAKE_FIRST_US);
                self.bus.transmit(function, Register::Instruction)?;
                self.bus.delay_us(HANDSHAKE_THIRD_US);
                self.bus.transmit(function, Register::Instruction)
            }
        }
    }

    /// Wait for the controller to go idle
    ///
    /// Returns the address counter, or `None` on write-only transports where
    /// the enable settle time stands in for the busy flag.
    pub(crate) fn wait_ready(&mut self) -> Result<Option<u8>, Error<T>> {
        if !self.bus.can_read() {
            return Ok(None);
        }
        match self.bus.wait_until_ready(self.config.busy_policy)? {
            Readiness::Ready(address) => Ok(Some(address)),
            Readiness::TimedOut { attempts } => {
                warn!("controller busy after {} polls", attempts);
                Err(Error::BusyTimeout { attempts })
            }
        }
    }

    /// Send an instruction
    pub(crate) fn command(&mut self, value: u8) -> LcdResult<T> {
        self.wait_ready()?;
        self.bus.transmit(value, Register::Instruction)
    }

    /// Point the address counter at a DDRAM address
    pub(crate) fn seek(&mut self, address: u8) -> LcdResult<T> {
        self.command(SET_DDRAM_ADDRESS | (address & ADDRESS_MASK))
    }

    /// Run `f` with the controller in `entry` mode, then reprogram the
    /// current entry mode even if `f` failed
    ///
    /// The first error wins.
    pub(crate) fn with_entry_mode<R>(
        &mut self,
        entry: ControllerMode,
        f: impl FnOnce(&mut Self) -> Result<R, Error<T>>,
    ) -> Result<R, Error<T>> {
        if entry.entry_command() == self.mode.entry_command() {
            return f(self);
        }
        self.command(entry.entry_command())?;
        let result = f(self);
        let restored = self.command(self.mode.entry_command());
        let value = result?;
        restored?;
        Ok(value)
    }

    /// Send a data byte
    ///
    /// In the `Normal` state the byte is recorded in the shadow buffer and
    /// the cursor advanced before the transfer.
    pub(crate) fn put(&mut self, value: u8, state: RecoveryState) -> LcdResult<T> {
        if state == RecoveryState::Normal {
            self.shadow.record(self.cursor.buffer_index(), value);
            self.cursor = self
                .cursor
                .advance(self.mode.is_left_to_right(), self.mode.is_two_line());
        }
        self.bus.transmit(value, Register::Data)
    }

    /// Clear the display and the shadow buffer, cursor to the origin
    pub fn clear(&mut self) -> LcdResult<T> {
        self.clear_with(RecoveryState::Normal)
    }

    /// Clear the controller; the shadow is only blanked in the `Normal` state
    pub(crate) fn clear_with(&mut self, state: RecoveryState) -> LcdResult<T> {
        if state == RecoveryState::Normal {
            self.shadow.blank();
        }
        self.cursor = CursorState::origin();
        self.seek(0)?;
        self.command(CLEAR_DISPLAY)?;
        self.bus.delay_us(CLEAR_DELAY_US);
        // Clear forces increment mode
        self.command(self.mode.entry_command())
    }

    /// Return the cursor to the origin and undo any display shift
    pub fn home(&mut self) -> LcdResult<T> {
        self.command(RETURN_HOME)?;
        self.bus.delay_us(CLEAR_DELAY_US);
        self.cursor = CursorState::origin();
        Ok(())
    }

    /// Move the cursor
    ///
    /// `row` is clamped to the last row, `column` to the widest supported
    /// row (19), so a column past the panel width still lands in DDRAM.
    pub fn set_cursor(&mut self, column: u8, row: u8) -> LcdResult<T> {
        self.cursor = CursorState::at(column, row, &self.config.geometry);
        trace!(
            "cursor: index {} address {:#04x}",
            self.cursor.buffer_index(),
            self.cursor.ddram_address()
        );
        self.seek(self.cursor.ddram_address())
    }

    fn set_control(&mut self, mode: ControllerMode) -> LcdResult<T> {
        self.mode = mode;
        self.command(mode.control_command())
    }

    fn set_entry(&mut self, mode: ControllerMode) -> LcdResult<T> {
        self.mode = mode;
        self.command(mode.entry_command())
    }

    /// Turn the display on
    pub fn display(&mut self) -> LcdResult<T> {
        self.set_control(self.mode.with_display(true))
    }

    /// Turn the display off, DDRAM is kept
    pub fn no_display(&mut self) -> LcdResult<T> {
        self.set_control(self.mode.with_display(false))
    }

    /// Show the underline cursor
    pub fn cursor(&mut self) -> LcdResult<T> {
        self.set_control(self.mode.with_cursor(true))
    }

    /// Hide the underline cursor
    pub fn no_cursor(&mut self) -> LcdResult<T> {
        self.set_control(self.mode.with_cursor(false))
    }

    /// Blink the block cursor
    pub fn blink(&mut self) -> LcdResult<T> {
        self.set_control(self.mode.with_blink(true))
    }

    /// Stop blinking
    pub fn no_blink(&mut self) -> LcdResult<T> {
        self.set_control(self.mode.with_blink(false))
    }

    /// Shift the whole display one cell left without touching DDRAM
    pub fn scroll_display_left(&mut self) -> LcdResult<T> {
        self.command(CURSOR_SHIFT | DISPLAY_MOVE | MOVE_LEFT)
    }

    /// Shift the whole display one cell right without touching DDRAM
    pub fn scroll_display_right(&mut self) -> LcdResult<T> {
        self.command(CURSOR_SHIFT | DISPLAY_MOVE | MOVE_RIGHT)
    }

    /// Text flows left to right
    pub fn left_to_right(&mut self) -> LcdResult<T> {
        self.set_entry(self.mode.with_left_to_right(true))
    }

    /// Text flows right to left
    pub fn right_to_left(&mut self) -> LcdResult<T> {
        self.set_entry(self.mode.with_left_to_right(false))
    }

    /// Shift the display with every character ("right justify" from the cursor)
    pub fn autoscroll(&mut self) -> LcdResult<T> {
        self.set_entry(self.mode.with_autoscroll(true))
    }

    /// Stop shifting the display
    pub fn no_autoscroll(&mut self) -> LcdResult<T> {
        self.set_entry(self.mode.with_autoscroll(false))
    }

    /// Define a custom glyph
    ///
    /// `slot` is masked to `0..8`; the glyph is then written as character
    /// code `slot`. Each byte is one pixel row, low 5 bits used. CGRAM is not
    /// mirrored. The cursor is left where it was.
    pub fn create_char(&mut self, slot: u8, glyph: &[u8; 8]) -> LcdResult<T> {
        let slot = slot & (GLYPH_SLOTS - 1);
        debug!("glyph {} <- {:02x?}", slot, glyph);
        let written = self.with_entry_mode(self.mode.sequential(), |lcd| {
            lcd.command(SET_CGRAM_ADDRESS | (slot << 3))?;
            for &row in glyph {
                lcd.wait_ready()?;
                lcd.bus.transmit(row, Register::Data)?;
            }
            Ok(())
        });
        // Back to DDRAM even after a failed glyph write
        let returned = self.seek(self.cursor.ddram_address());
        written.and(returned)
    }

    /// Switch the backlight
    ///
    /// A no-op on raw GPIO.
    pub fn set_backlight(&mut self, on: bool) -> LcdResult<T> {
        self.bus
            .transport_mut()
            .set_backlight(on)
            .map_err(Error::Transport)
    }

    /// Write one character at the cursor
    ///
    /// The character is recorded in the shadow buffer first. On readable
    /// transports with write verification enabled, the cell is read back and
    /// the address counter compared with the cursor; any disagreement
    /// rebuilds the display through [`rewrite_all`](Lcd::rewrite_all). The
    /// cursor ends up after the written cell either way.
    ///
    /// Returns the number of bytes written (always 1).
    pub fn write(&mut self, value: u8) -> Result<usize, Error<T>> {
        self.stats.writes = self.stats.writes.saturating_add(1);
        if !(self.config.verify_writes && self.bus.can_read()) {
            self.wait_ready()?;
            self.put(value, RecoveryState::Normal)?;
            return Ok(1);
        }

        let before = self
            .wait_ready()?
            .unwrap_or(self.cursor.ddram_address());
        self.put(value, RecoveryState::Normal)?;
        let after = self
            .wait_ready()?
            .unwrap_or(self.cursor.ddram_address());

        self.seek(before)?;
        self.wait_ready()?;
        let stored = self.bus.receive(Register::Data)?;
        self.seek(self.cursor.ddram_address())?;

        if stored == value && after == self.cursor.ddram_address() {
            return Ok(1);
        }
        warn!(
            "write verify failed at {:#04x}: wrote {:#04x}, read {:#04x}, counter {:#04x} expected {:#04x}",
            before,
            value,
            stored,
            after,
            self.cursor.ddram_address()
        );
        self.stats.verify_failures = self.stats.verify_failures.saturating_add(1);
        self.rewrite_all()?;
        Ok(1)
    }

    /// Write a run of characters
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize, Error<T>> {
        let mut written = 0;
        for &byte in bytes {
            written += self.write(byte)?;
        }
        Ok(written)
    }

    /// Expected DDRAM contents
    pub fn shadow(&self) -> &ShadowBuffer {
        &self.shadow
    }

    /// Position of the next character
    pub fn cursor_state(&self) -> CursorState {
        self.cursor
    }

    /// Mode registers as last programmed
    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    /// Write, verification and recovery counters
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Driver configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Release the transport and delay
    pub fn release(self) -> (T, D) {
        self.bus.release()
    }
}

impl<T, D> core::fmt::Write for Lcd<T, D>
where
    T: Transport,
    D: DelayNs,
{
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_bytes(s.as_bytes())
            .map(|_| ())
            .map_err(|_| core::fmt::Error)
    }
}
