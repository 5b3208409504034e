//! 74HC595 SPI backpack transport
//!
//! The shift register's outputs drive the LCD; the SPI device's chip select
//! is the storage-register latch, so each one-byte transaction updates all
//! outputs at once. Pin map: RS = 1, E = 2, D4 = 6, D5 = 5, D6 = 4, D7 = 3,
//! backlight = 7. Write-only.

use core::convert::Infallible;

use embedded_hal::spi::SpiDevice;
use log::trace;

use crate::interface::{DataWidth, Direction, InterfaceError, Line, PinMap, Transport};

/// Backpack pin map
pub const PIN_MAP: PinMap = PinMap {
    register_select: 1,
    enable: 2,
    data: [6, 5, 4, 3],
    backlight: 7,
};

/// SPI shift-register transport
pub struct ShiftRegisterTransport<SPI> {
    spi: SPI,
    /// Current output byte
    outputs: u8,
}

impl<SPI: SpiDevice> ShiftRegisterTransport<SPI> {
    /// Create a transport over an SPI device whose CS drives the latch
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            // Backlight on
            outputs: 0x80,
        }
    }

    /// Release the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }

    fn shift_out(&mut self, outputs: u8) -> Result<(), InterfaceError<SPI::Error, Infallible>> {
        trace!("74HC595 <- {:08b}", outputs);
        self.outputs = outputs;
        self.spi.write(&[outputs]).map_err(InterfaceError::Bus)
    }
}

impl<SPI: SpiDevice> Transport for ShiftRegisterTransport<SPI> {
    type Error = InterfaceError<SPI::Error, Infallible>;

    fn data_width(&self) -> DataWidth {
        DataWidth::Four
    }

    fn can_read(&self) -> bool {
        false
    }

    fn set_line(&mut self, line: Line, level: bool) -> Result<(), Self::Error> {
        match line {
            Line::ReadWrite if !level => Ok(()),
            _ if PIN_MAP.bit(line).is_some() => {
                self.shift_out(PIN_MAP.apply(self.outputs, line, level))
            }
            _ => Err(InterfaceError::Unsupported(line)),
        }
    }

    fn set_direction(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error> {
        match direction {
            Direction::Output => Ok(()),
            Direction::Input => Err(InterfaceError::Unsupported(line)),
        }
    }

    fn read_line(&mut self, line: Line) -> Result<bool, Self::Error> {
        Err(InterfaceError::Unsupported(line))
    }

    fn prepare(&mut self) -> Result<(), Self::Error> {
        self.shift_out(self.outputs)
    }

    fn write_data_lines(&mut self, value: u8) -> Result<(), Self::Error> {
        self.shift_out(PIN_MAP.apply_nibble(self.outputs, value & 0x0F))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MockShiftRegister, SimController};

    #[test]
    fn test_prepare_shifts_initial_byte() {
        let sim = SimController::new();
        let mut t = ShiftRegisterTransport::new(MockShiftRegister::new(&sim));
        t.prepare().unwrap();
        assert!(sim.backlight());
        assert_eq!(t.release().bytes, [0x80]);
    }

    #[test]
    fn test_data_nibble_reversed_wiring() {
        let sim = SimController::new();
        let mut t = ShiftRegisterTransport::new(MockShiftRegister::new(&sim));
        t.write_data_lines(0b0001).unwrap();
        t.write_data_lines(0b1000).unwrap();
        assert_eq!(t.release().bytes, [0b1100_0000, 0b1000_1000]);
        // D4 and D7 reach the controller on their own lines
        assert_eq!(sim.host_data(), 0b1000_0000);
    }

    #[test]
    fn test_backlight_off() {
        let sim = SimController::new();
        let mut t = ShiftRegisterTransport::new(MockShiftRegister::new(&sim));
        t.set_backlight(false).unwrap();
        assert!(!sim.backlight());
        assert_eq!(t.release().bytes, [0x00]);
    }

    #[test]
    fn test_write_only() {
        let sim = SimController::new();
        let mut t = ShiftRegisterTransport::new(MockShiftRegister::new(&sim));
        assert!(!t.can_read());
        assert!(t.set_line(Line::ReadWrite, false).is_ok());
        assert!(t.set_line(Line::ReadWrite, true).is_err());
        assert!(t.read_line(Line::Data(2)).is_err());
    }
}
