//! Adapter pin assignments
//!
//! FT2232H channel A is wired to the FPGA's configuration interface:
//!
//! ```text
//! ADBUS0  CCK       SPI clock
//! ADBUS1  CDI0      SPI data out (to flash)
//! ADBUS2  CDI1      SPI data in (from flash)
//! ADBUS3  SS_N      flash chip select, active low
//! ADBUS4  CRESET_N  FPGA reset, active low
//! ADBUS5  CDONE     FPGA configuration done (input)
//! ```

use bitflags::bitflags;

bitflags! {
    /// Low-byte GPIO signals
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Pins: u8 {
        /// SPI clock
        const CCK      = 0x01;
        /// SPI data out
        const CDI0     = 0x02;
        /// SPI data in
        const CDI1     = 0x04;
        /// Flash chip select (active low)
        const SS_N     = 0x08;
        /// FPGA reset (active low)
        const CRESET_N = 0x10;
        /// FPGA configuration done
        const CDONE    = 0x20;

        /// Pins driven while talking to the flash
        const DRIVEN = Self::SS_N.bits()
            | Self::CRESET_N.bits()
            | Self::CDI0.bits()
            | Self::CCK.bits();
    }
}

/// Output levels plus output-enable directions for the low GPIO byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinState {
    /// Output levels
    pub levels: Pins,
    /// Set bits are outputs
    pub directions: Pins,
}

impl PinState {
    /// Every pin an input, with select and reset pulled to their inactive
    /// levels should the directions ever be flipped
    pub const IDLE: PinState = PinState {
        levels: Pins::SS_N.union(Pins::CRESET_N),
        directions: Pins::empty(),
    };

    /// Driven state with the given levels
    pub const fn driven(levels: Pins) -> Self {
        PinState {
            levels,
            directions: Pins::DRIVEN,
        }
    }

    /// Same state with the flash selected (SS_N low)
    pub fn selected(self) -> Self {
        PinState {
            levels: self.levels.difference(Pins::SS_N),
            ..self
        }
    }

    /// Same state with the flash deselected (SS_N high)
    pub fn deselected(self) -> Self {
        PinState {
            levels: self.levels.union(Pins::SS_N),
            ..self
        }
    }
}

impl Default for PinState {
    /// Flash deselected, FPGA out of reset, nothing driven yet
    fn default() -> Self {
        PinState::IDLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_keeps_reset_level() {
        let state = PinState::driven(Pins::SS_N);
        let selected = state.selected();
        assert!(!selected.levels.contains(Pins::SS_N));
        assert!(!selected.levels.contains(Pins::CRESET_N));
        assert_eq!(selected.deselected(), state);
    }

    #[test]
    fn test_driven_mask() {
        assert_eq!(Pins::DRIVEN.bits(), 0x1B);
        assert_eq!(PinState::IDLE.levels.bits(), 0x18);
        assert!(PinState::IDLE.directions.is_empty());
    }
}
