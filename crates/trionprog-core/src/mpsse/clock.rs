//! SPI clock divisor selection
//!
//! The adapter derives the SPI clock from a 60 MHz base:
//!
//! ```text
//! SPI_clock = 60 MHz / (divisor + 1)
//! ```
//!
//! | Divisor | SPI Clock |
//! |---------|-----------|
//! | 0       | 60 MHz    |
//! | 1       | 30 MHz    |
//! | 2       | 20 MHz    |
//! | 3       | 15 MHz    |
//! | 5       | 10 MHz    |
//! | 9       | 6 MHz     |

/// Base clock of the high-speed MPSSE parts, in MHz
pub const BASE_CLOCK_MHZ: f64 = 60.0;

/// Slowest frequency accepted on the command line
pub const MIN_SPI_MHZ: f64 = 6.0;

/// Fastest frequency the engine can produce
pub const MAX_SPI_MHZ: f64 = 60.0;

/// SPI clock setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiClock {
    divisor: u16,
}

impl SpiClock {
    /// 20 MHz, the default used for configuration memories
    pub const DEFAULT: SpiClock = SpiClock { divisor: 2 };

    /// Use a raw divisor
    pub const fn from_divisor(divisor: u16) -> Self {
        SpiClock { divisor }
    }

    /// Closest clock at or below `mhz`, clamped to 6..=60 MHz
    pub fn from_mhz(mhz: f64) -> Self {
        let mhz = if mhz.is_nan() {
            MIN_SPI_MHZ
        } else {
            mhz.clamp(MIN_SPI_MHZ, MAX_SPI_MHZ)
        };
        let divisor = (BASE_CLOCK_MHZ / mhz).ceil() as u16 - 1;
        SpiClock { divisor }
    }

    /// Divisor value sent with `TCK_DIVISOR`
    pub fn divisor(&self) -> u16 {
        self.divisor
    }

    /// Resulting SPI clock in MHz
    pub fn mhz(&self) -> f64 {
        BASE_CLOCK_MHZ / (self.divisor as f64 + 1.0)
    }
}

impl Default for SpiClock {
    fn default() -> Self {
        SpiClock::DEFAULT
    }
}
