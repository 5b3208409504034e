//! Controller mode registers
//!
//! The HD44780 cannot report its function-set, display-control or
//! entry-mode settings, so the driver keeps them as a [`ControllerMode`]
//! value. Every toggle produces a new snapshot and the caller re-issues the
//! full instruction byte for the changed group.

use crate::command::{
    BLINK_ON, CURSOR_ON, DISPLAY_CONTROL, DISPLAY_ON, EIGHT_BIT_MODE, ENTRY_LEFT, ENTRY_MODE_SET,
    ENTRY_SHIFT_INCREMENT, FONT_5X10, FONT_5X8, FOUR_BIT_MODE, FUNCTION_SET, ONE_LINE, TWO_LINE,
};
use crate::config::Geometry;
use crate::interface::DataWidth;

/// Snapshot of the three mode registers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerMode {
    function: u8,
    control: u8,
    entry: u8,
}

fn with_flag(field: u8, flag: u8, on: bool) -> u8 {
    if on { field | flag } else { field & !flag }
}

impl ControllerMode {
    /// Mode programmed by [`Lcd::begin`](crate::Lcd::begin)
    ///
    /// Interface width from the transport, line count and font from the
    /// geometry, display on, cursor and blink off, left-to-right entry
    /// without shift.
    pub fn initial(geometry: &Geometry, width: DataWidth) -> Self {
        let mut function = match width {
            DataWidth::Eight => EIGHT_BIT_MODE,
            DataWidth::Four => FOUR_BIT_MODE,
        };
        function |= if geometry.is_multiline() { TWO_LINE } else { ONE_LINE };
        function |= if geometry.uses_tall_font() { FONT_5X10 } else { FONT_5X8 };
        Self {
            function,
            control: DISPLAY_ON,
            entry: ENTRY_LEFT,
        }
    }

    /// Function-set instruction byte
    pub fn function_command(&self) -> u8 {
        FUNCTION_SET | self.function
    }

    /// Display-control instruction byte
    pub fn control_command(&self) -> u8 {
        DISPLAY_CONTROL | self.control
    }

    /// Entry-mode instruction byte
    pub fn entry_command(&self) -> u8 {
        ENTRY_MODE_SET | self.entry
    }

    /// Display enabled
    #[must_use]
    pub fn with_display(self, on: bool) -> Self {
        Self {
            control: with_flag(self.control, DISPLAY_ON, on),
            ..self
        }
    }

    /// Underline cursor shown
    #[must_use]
    pub fn with_cursor(self, on: bool) -> Self {
        Self {
            control: with_flag(self.control, CURSOR_ON, on),
            ..self
        }
    }

    /// Block cursor blinking
    #[must_use]
    pub fn with_blink(self, on: bool) -> Self {
        Self {
            control: with_flag(self.control, BLINK_ON, on),
            ..self
        }
    }

    /// Address counter increments after each write
    #[must_use]
    pub fn with_left_to_right(self, on: bool) -> Self {
        Self {
            entry: with_flag(self.entry, ENTRY_LEFT, on),
            ..self
        }
    }

    /// Display shifts after each write
    #[must_use]
    pub fn with_autoscroll(self, on: bool) -> Self {
        Self {
            entry: with_flag(self.entry, ENTRY_SHIFT_INCREMENT, on),
            ..self
        }
    }

    /// Entry mode used while replaying or auditing DDRAM: increment, no shift
    #[must_use]
    pub fn sequential(self) -> Self {
        self.with_left_to_right(true).with_autoscroll(false)
    }

    /// Whether the display is on
    pub fn is_display_on(&self) -> bool {
        self.control & DISPLAY_ON != 0
    }

    /// Whether the underline cursor is shown
    pub fn is_cursor_on(&self) -> bool {
        self.control & CURSOR_ON != 0
    }

    /// Whether the cursor blinks
    pub fn is_blinking(&self) -> bool {
        self.control & BLINK_ON != 0
    }

    /// Whether text flows left to right
    pub fn is_left_to_right(&self) -> bool {
        self.entry & ENTRY_LEFT != 0
    }

    /// Whether the display shifts on each write
    pub fn is_autoscroll(&self) -> bool {
        self.entry & ENTRY_SHIFT_INCREMENT != 0
    }

    /// Whether the controller runs in two-line mode
    pub fn is_two_line(&self) -> bool {
        self.function & TWO_LINE != 0
    }

    /// Whether the interface is 8 bits wide
    pub fn is_eight_bit(&self) -> bool {
        self.function & EIGHT_BIT_MODE != 0
    }
}
