//! Status poll policy

/// Bounded retry policy for waiting on the busy bit
///
/// The poll budget is a count, not a wall-clock deadline. The delay between
/// polls is not optional: back-to-back status reads overrun the adapter's
/// request queue and corrupt the transactions that follow.
///
/// `max_attempts` is the budget for a page program. Erases get that budget
/// multiplied by [`BusyOp::scale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PollPolicy {
    /// Status reads before giving up on a page program
    pub max_attempts: u32,
    /// Delay before each status read, in microseconds
    pub interval_us: u32,
}

impl PollPolicy {
    /// 20 polls, 1 ms apart
    pub const DEFAULT: PollPolicy = PollPolicy {
        max_attempts: 20,
        interval_us: 1000,
    };

    /// Status reads allowed while waiting for `op`
    pub fn attempts_for(&self, op: BusyOp) -> u32 {
        self.max_attempts.saturating_mul(op.scale())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::DEFAULT
    }
}

/// Operation the flash goes busy for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyOp {
    /// Page program, a few milliseconds at most
    PageProgram,
    /// 4 KB sector erase
    SectorErase,
    /// 32 KB block erase
    Block32Erase,
    /// 64 KB block erase
    Block64Erase,
    /// Whole chip erase
    ChipErase,
}

impl BusyOp {
    /// Budget multiplier over the page program budget
    ///
    /// Sized from GD25Q datasheet maximum times with the default 20 ms page
    /// budget: 400 ms sector, 1.2 s and 2 s blocks, 30 s chip.
    pub const fn scale(self) -> u32 {
        match self {
            BusyOp::PageProgram => 1,
            BusyOp::SectorErase => 20,
            BusyOp::Block32Erase => 60,
            BusyOp::Block64Erase => 100,
            BusyOp::ChipErase => 1500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budgets_scale_with_erase_size() {
        let policy = PollPolicy::DEFAULT;
        assert_eq!(policy.attempts_for(BusyOp::PageProgram), 20);
        assert_eq!(policy.attempts_for(BusyOp::SectorErase), 400);
        assert_eq!(policy.attempts_for(BusyOp::Block64Erase), 2000);
        assert_eq!(policy.attempts_for(BusyOp::ChipErase), 30_000);
    }

    #[test]
    fn test_budget_saturates() {
        let policy = PollPolicy {
            max_attempts: u32::MAX / 2,
            interval_us: 1,
        };
        assert_eq!(policy.attempts_for(BusyOp::ChipErase), u32::MAX);
    }
}
