//! Build-time constants and the runtime knobs of the discovery algorithms.

/// Capacity of a register buffer. The boundary scan register is usually the
/// longest one on a device and may need more than this.
pub const MAX_DR_LEN: usize = 512;

/// Half clock cycle in microseconds.
pub const DELAY_US: u32 = 100;

/// TCK frequency matching `DELAY_US`, for `Gpio::new`.
pub const DEFAULT_TCK_KHZ: u32 = 1_000 / (2 * DELAY_US);

/// Length of the all-ones pattern used for chain detection.
pub const MANY_ONES: usize = 100;

/// Trailing ones needed before the chain detection pattern counts as settled.
pub const STABLE_THRESHOLD: usize = 16;

/// Run-Test/Idle clocks given to a freshly loaded instruction.
pub const PROCESS_TICKS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Longest register the shifter accepts. Never larger than `MAX_DR_LEN`.
    pub max_dr_len: usize,
    /// Pattern length for `detect_chain` and `check_connection`.
    pub many_ones: usize,
    /// See `STABLE_THRESHOLD`.
    pub stable_threshold: usize,
    /// Default for `detect_dr_len` when run from the session.
    pub process_ticks: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_dr_len: MAX_DR_LEN,
            many_ones: MANY_ONES,
            stable_threshold: STABLE_THRESHOLD,
            process_ticks: PROCESS_TICKS,
        }
    }
}

impl Config {
    pub fn max_dr_len(mut self, len: usize) -> Self {
        self.max_dr_len = len.min(MAX_DR_LEN);
        self
    }

    /// Shortening the pattern pulls the stability threshold down with it.
    pub fn many_ones(mut self, bits: usize) -> Self {
        self.many_ones = bits;
        self.stable_threshold = self.stable_threshold.min(bits).max(1);
        self
    }

    /// The threshold is clamped to the pattern length, otherwise no detection could
    /// ever settle.
    pub fn stable_threshold(mut self, bits: usize) -> Self {
        self.stable_threshold = bits.min(self.many_ones).max(1);
        self
    }

    pub fn process_ticks(mut self, ticks: u32) -> Self {
        self.process_ticks = ticks;
        self
    }
}
