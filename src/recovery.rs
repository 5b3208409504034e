//! Self-healing: resynchronization, replay and audit
//!
//! A dropped or spurious enable pulse on a 4-bit bus leaves the controller
//! one nibble out of step; noise can flip DDRAM bits. Neither is visible to
//! the host unless DDRAM is read back. The driver handles both the same way:
//!
//! 1. **Resync** - rerun the reset handshake, which brings the interface back
//!    to a known width from any nibble phase, then reissue the current mode
//!    registers and clear the controller without touching the shadow.
//! 2. **Replay** - write all 80 shadow cells back in address-counter order.
//!
//! [`Lcd::check_display`] reads DDRAM and compares it with the shadow
//! without repairing anything.

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::bus::Register;
use crate::config::{MAX_COLUMNS, ROW_BUFFER_OFFSET, SHADOW_SIZE};
use crate::display::Lcd;
use crate::error::Error;
use crate::interface::Transport;
use crate::shadow::ShadowBuffer;

/// Phase of the recovery state machine
///
/// `Normal -> Resyncing -> Replaying -> Normal`. Passed into initialization
/// and clear so they know whether the shadow is authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoveryState {
    /// Regular operation; clear blanks the shadow and data writes are recorded
    #[default]
    Normal,
    /// Reinitializing the controller; the shadow is kept
    Resyncing,
    /// Writing the shadow back; data writes are not recorded again
    Replaying,
}

/// Driver counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Characters written through [`Lcd::write`]
    pub writes: u32,
    /// Writes whose read-back disagreed with the shadow
    pub verify_failures: u32,
    /// Resync + replay cycles
    pub resyncs: u32,
    /// Audits performed
    pub audits: u32,
    /// Mismatched cells found by audits, summed
    pub audit_mismatches: u32,
}

/// How loudly an audit reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Diagnostics {
    /// No logging
    #[default]
    Silent,
    /// Warn when DDRAM disagrees with the shadow
    Warn,
    /// Warn on mismatch and dump both buffers
    Dump,
}

impl From<u8> for Diagnostics {
    fn from(level: u8) -> Self {
        match level {
            0 => Self::Silent,
            1 => Self::Warn,
            _ => Self::Dump,
        }
    }
}

/// Result of [`Lcd::check_display`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    ddram: [u8; SHADOW_SIZE],
    expected: [u8; SHADOW_SIZE],
}

impl AuditReport {
    /// Build a report from DDRAM as read and the shadow
    pub fn new(ddram: [u8; SHADOW_SIZE], expected: &ShadowBuffer) -> Self {
        Self {
            ddram,
            expected: *expected.cells(),
        }
    }

    /// DDRAM contents in buffer order
    pub fn ddram(&self) -> &[u8; SHADOW_SIZE] {
        &self.ddram
    }

    /// Shadow contents at the time of the audit
    pub fn expected(&self) -> &[u8; SHADOW_SIZE] {
        &self.expected
    }

    /// Number of cells that differ
    pub fn mismatches(&self) -> usize {
        self.mismatched_indices().count()
    }

    /// Whether DDRAM matches the shadow
    pub fn is_consistent(&self) -> bool {
        self.ddram == self.expected
    }

    /// Buffer indices of the cells that differ
    pub fn mismatched_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.ddram
            .iter()
            .zip(self.expected.iter())
            .enumerate()
            .filter(|(_, (read, expected))| read != expected)
            .map(|(index, _)| index)
    }

    fn log(&self, diagnostics: Diagnostics) {
        if diagnostics == Diagnostics::Silent {
            return;
        }
        if !self.is_consistent() {
            warn!("display mismatch: {} cells differ", self.mismatches());
        }
        if diagnostics == Diagnostics::Dump {
            for (row, &offset) in ROW_BUFFER_OFFSET.iter().enumerate() {
                let range = offset as usize..offset as usize + MAX_COLUMNS as usize;
                let ddram = &self.ddram[range.clone()];
                let expected = &self.expected[range];
                info!("row {} ddram:    {} |{}|", row, HexRow(ddram), AsciiRow(ddram));
                info!("row {} expected: {} |{}|", row, HexRow(expected), AsciiRow(expected));
            }
        }
    }
}

/// Bytes as space-separated hex
struct HexRow<'a>(&'a [u8]);

impl fmt::Display for HexRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Bytes as printable ASCII, `.` for anything else
struct AsciiRow<'a>(&'a [u8]);

impl fmt::Display for AsciiRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.0 {
            let c = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl<T, D> Lcd<T, D>
where
    T: Transport,
    D: DelayNs,
{
    /// Reinitialize the controller and write the shadow buffer back
    ///
    /// Mode registers and cursor are restored to what they were before the
    /// call, the cursor even when the rebuild fails part way. Runs
    /// automatically when write verification fails.
    pub fn rewrite_all(&mut self) -> Result<(), Error<T>> {
        let cursor = self.cursor;
        self.stats.resyncs = self.stats.resyncs.saturating_add(1);
        debug!("resync #{}: reinitializing controller", self.stats.resyncs);
        let rebuilt = self.resync_and_replay();
        // The cursor follows the shadow, wherever the rebuild stopped
        self.cursor = cursor;
        rebuilt?;
        self.seek(cursor.ddram_address())
    }

    fn resync_and_replay(&mut self) -> Result<(), Error<T>> {
        self.initialize(RecoveryState::Resyncing)?;
        self.bus.delay_ms(self.config.resync_settle_ms);
        self.replay()
    }

    fn replay(&mut self) -> Result<(), Error<T>> {
        debug!("replaying {} cells", SHADOW_SIZE);
        let cells = *self.shadow.cells();
        self.with_entry_mode(self.mode.sequential(), |lcd| {
            lcd.seek(0)?;
            for value in cells {
                lcd.wait_ready()?;
                lcd.put(value, RecoveryState::Replaying)?;
            }
            Ok(())
        })
    }

    /// Compare DDRAM with the shadow buffer
    ///
    /// Reads all 80 cells in address-counter order, then restores the entry
    /// mode and cursor. Logs according to `diagnostics`. Never repairs; call
    /// [`rewrite_all`](Lcd::rewrite_all) to fix a reported mismatch.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadUnsupported` on write-only transports.
    pub fn check_display(&mut self, diagnostics: Diagnostics) -> Result<AuditReport, Error<T>> {
        if !self.bus.can_read() {
            return Err(Error::ReadUnsupported);
        }
        let read = self.with_entry_mode(self.mode.sequential(), |lcd| {
            lcd.seek(0)?;
            lcd.wait_ready()?;
            let mut ddram = [0u8; SHADOW_SIZE];
            for cell in &mut ddram {
                *cell = lcd.bus.receive(Register::Data)?;
            }
            Ok(ddram)
        });
        let returned = self.seek(self.cursor.ddram_address());
        let ddram = read?;
        returned?;

        let report = AuditReport::new(ddram, &self.shadow);
        self.stats.audits = self.stats.audits.saturating_add(1);
        self.stats.audit_mismatches = self
            .stats
            .audit_mismatches
            .saturating_add(report.mismatches() as u32);
        report.log(diagnostics);
        Ok(report)
    }
}
