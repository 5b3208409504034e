//! HD44780 instruction set
//!
//! This module defines the instruction bytes and flag bits of the HD44780
//! controller. An instruction is the base byte of its group OR-ed with the
//! flags of that group. Instructions are sent with RS low, DDRAM/CGRAM data
//! with RS high.
//!
//! ## Instruction Groups
//!
//! | Base   | Instruction            | Flags                      |
//! |--------|------------------------|----------------------------|
//! | `0x01` | Clear display          | -                          |
//! | `0x02` | Return home            | -                          |
//! | `0x04` | Entry mode set         | I/D, S                     |
//! | `0x08` | Display on/off control | D, C, B                    |
//! | `0x10` | Cursor or display shift| S/C, R/L                   |
//! | `0x20` | Function set           | DL, N, F                   |
//! | `0x40` | Set CGRAM address      | 6-bit address              |
//! | `0x80` | Set DDRAM address      | 7-bit address              |
//!
//! ## Example
//!
//! ```
//! use hd44780_shadow::command;
//!
//! let function_set = command::FUNCTION_SET | command::FOUR_BIT_MODE | command::TWO_LINE;
//! assert_eq!(function_set, 0x28);
//!
//! let goto_row_1 = command::SET_DDRAM_ADDRESS | 0x40;
//! assert_eq!(goto_row_1, 0xC0);
//! ```

// Instructions

/// Clear display instruction (0x01)
///
/// Writes the blank character (0x20) into every DDRAM cell, sets the
/// address counter to 0 and the entry mode to increment. Takes ~1.5ms.
pub const CLEAR_DISPLAY: u8 = 0x01;

/// Return home instruction (0x02)
///
/// Sets the address counter to 0 and undoes any display shift. Takes ~1.5ms.
pub const RETURN_HOME: u8 = 0x02;

/// Entry mode set instruction (0x04)
///
/// Sets the address counter direction and display shift applied after each
/// data write.
pub const ENTRY_MODE_SET: u8 = 0x04;

/// Display on/off control instruction (0x08)
pub const DISPLAY_CONTROL: u8 = 0x08;

/// Cursor or display shift instruction (0x10)
///
/// Moves the cursor or shifts the whole display without touching DDRAM.
pub const CURSOR_SHIFT: u8 = 0x10;

/// Function set instruction (0x20)
///
/// Selects the interface width, the number of display lines and the font.
pub const FUNCTION_SET: u8 = 0x20;

/// Set CGRAM address instruction (0x40)
///
/// Subsequent data writes go to the character generator RAM.
pub const SET_CGRAM_ADDRESS: u8 = 0x40;

/// Set DDRAM address instruction (0x80)
///
/// Subsequent data writes go to the display data RAM.
pub const SET_DDRAM_ADDRESS: u8 = 0x80;

// Entry mode flags

/// Entry mode: address counter increments (text flows left to right)
pub const ENTRY_LEFT: u8 = 0x02;
/// Entry mode: address counter decrements (text flows right to left)
pub const ENTRY_RIGHT: u8 = 0x00;
/// Entry mode: shift the display on each write (autoscroll)
pub const ENTRY_SHIFT_INCREMENT: u8 = 0x01;
/// Entry mode: display does not shift
pub const ENTRY_SHIFT_DECREMENT: u8 = 0x00;

// Display control flags

/// Display control: display on
pub const DISPLAY_ON: u8 = 0x04;
/// Display control: display off
pub const DISPLAY_OFF: u8 = 0x00;
/// Display control: underline cursor on
pub const CURSOR_ON: u8 = 0x02;
/// Display control: underline cursor off
pub const CURSOR_OFF: u8 = 0x00;
/// Display control: blinking block cursor on
pub const BLINK_ON: u8 = 0x01;
/// Display control: blinking block cursor off
pub const BLINK_OFF: u8 = 0x00;

// Shift flags

/// Shift the display instead of moving the cursor
pub const DISPLAY_MOVE: u8 = 0x08;
/// Move the cursor instead of shifting the display
pub const CURSOR_MOVE: u8 = 0x00;
/// Shift to the right
pub const MOVE_RIGHT: u8 = 0x04;
/// Shift to the left
pub const MOVE_LEFT: u8 = 0x00;

// Function set flags

/// Function set: 8-bit interface
pub const EIGHT_BIT_MODE: u8 = 0x10;
/// Function set: 4-bit interface
pub const FOUR_BIT_MODE: u8 = 0x00;
/// Function set: two display lines (also used for 4-row panels)
pub const TWO_LINE: u8 = 0x08;
/// Function set: one display line
pub const ONE_LINE: u8 = 0x00;
/// Function set: 5x10 dot font (one-line displays only)
pub const FONT_5X10: u8 = 0x04;
/// Function set: 5x8 dot font
pub const FONT_5X8: u8 = 0x00;

// Status register

/// Busy flag bit of the status byte read with RS low
pub const BUSY_FLAG: u8 = 0x80;
/// Address counter bits of the status byte read with RS low
pub const ADDRESS_MASK: u8 = 0x7F;

// Initialization nibbles (HD44780 datasheet figures 23 and 24)

/// High nibble of "function set, 8-bit" sent during the reset handshake
pub const INIT_EIGHT_BIT_NIBBLE: u8 = 0x03;
/// High nibble of "function set, 4-bit" that switches the interface width
pub const INIT_FOUR_BIT_NIBBLE: u8 = 0x02;
