/// Errors encounterable while parsing an option from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum OptParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Option Delta was set to 15, which is invalid.
  OptionDeltaReservedValue(u8),

  /// Value Length was set to 15, which is invalid.
  ValueLengthReservedValue(u8),

  /// Not a true failure case; only means we tried to read the payload marker byte (0xFF)
  /// as an option header, or ran out of bytes between two options.
  OptionsExhausted,
}

impl OptParseError {
  /// Shorthand for [`OptParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl core::fmt::Display for OptParseError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::UnexpectedEndOfStream => write!(f, "option ended unexpectedly"),
      | Self::OptionDeltaReservedValue(n) => write!(f, "reserved option delta nibble {}", n),
      | Self::ValueLengthReservedValue(n) => write!(f, "reserved option length nibble {}", n),
      | Self::OptionsExhausted => write!(f, "no more options"),
    }
  }
}

/// Errors encounterable while appending an option to an [`OptBlock`](super::OptBlock)
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum OptPushError {
  /// Options must be appended in non-decreasing number order
  /// because each option only stores the delta from the previous one.
  OutOfOrder {
    /// Number of the last option in the block
    last: super::OptNumber,
    /// Number of the option that was rejected
    number: super::OptNumber,
  },
  /// The gap between this option number and the last one
  /// is too large to express as an option delta
  NumberTooLarge(super::OptNumber),
  /// The value is longer than an option length can express
  ValueTooLong {
    /// Length of the rejected value
    len: usize,
    /// Maximum option value length
    max: usize,
  },
}

impl core::fmt::Display for OptPushError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::OutOfOrder { last, number } => {
        write!(f, "option {} added after option {}", number.0, last.0)
      },
      | Self::NumberTooLarge(n) => write!(f, "option number {} cannot be encoded", n.0),
      | Self::ValueTooLong { len, max } => {
        write!(f, "option value of {} bytes exceeds {} bytes", len, max)
      },
    }
  }
}

#[cfg(feature = "std")]
#[cfg(feature = "std")]
impl std::error::Error for OptParseError {}

#[cfg(feature = "std")]
#[cfg(feature = "std")]
impl std::error::Error for OptPushError {}
