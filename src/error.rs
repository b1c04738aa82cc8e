//! Error type shared by every layer of the crate.

/// Everything that can go wrong while parsing input or driving the TAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A character is not a legal digit for the radix being parsed.
    #[error("illegal character in number")]
    BadConversion,

    /// A length exceeds the buffer capacity or the 32 bit integer range.
    #[error("value out of bounds")]
    OutOfBounds,

    /// The captured IDCODE is not a valid IEEE 1149.1 identification code.
    #[error("bad IDCODE")]
    BadIdCode,

    /// A `0x` / `0b` prefix without any digits after it.
    #[error("malformed number prefix or suffix")]
    BadPrefixOrSuffix,

    /// The requested transition or end state is not permitted from the current state.
    #[error("bad TAP state")]
    BadTapState,

    /// Shift length is zero or larger than the configured register length.
    #[error("invalid IR or DR length")]
    InvalidIrOrDrLen,

    /// TDO never left logic 0 while the test pattern expected it to toggle.
    #[error("TDO stuck at 0 (check wiring and target power)")]
    TdoStuckAt0,

    /// TDO never left logic 1 while the test pattern expected it to toggle.
    #[error("TDO stuck at 1 (check wiring and target power)")]
    TdoStuckAt1,

    /// A GPIO operation failed.
    #[error("pin error: {0:?}")]
    Pin(embedded_hal::digital::ErrorKind),

    /// The console transport failed.
    #[error("console error: {0:?}")]
    Io(embedded_io::ErrorKind),
}

impl Error {
    /// Errors caused by bad user input. They are detected before any pin is
    /// touched, so the TAP is still in its tracked state.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::BadConversion
                | Error::OutOfBounds
                | Error::BadPrefixOrSuffix
                | Error::InvalidIrOrDrLen
        )
    }

    /// Hardware faults that end the session. No further clocking is allowed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::TdoStuckAt0 | Error::TdoStuckAt1)
    }
}

/// A specialized `Result` type for JTAG operations.
pub type Result<T> = core::result::Result<T, Error>;
