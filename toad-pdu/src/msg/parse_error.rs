use super::opt::parse_error::OptParseError;

/// Errors encounterable while parsing a message from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum MessageParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// Error parsing option
  OptParseError(OptParseError),

  /// The message type is invalid (see [`Type`](crate::Type) for information & valid values)
  InvalidType(u8),

  /// The version bits were not `1`
  UnsupportedVersion(u8),

  /// A payload marker (`0xFF`) was not followed by any payload bytes
  EmptyPayloadAfterMarker,
}

impl MessageParseError {
  /// Shorthand for [`MessageParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl core::fmt::Display for MessageParseError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::UnexpectedEndOfStream => write!(f, "message ended unexpectedly"),
      | Self::InvalidTokenLength(n) => write!(f, "token length {} is greater than 8", n),
      | Self::OptParseError(e) => write!(f, "invalid option: {}", e),
      | Self::InvalidType(n) => write!(f, "invalid message type {}", n),
      | Self::UnsupportedVersion(n) => write!(f, "unsupported CoAP version {}", n),
      | Self::EmptyPayloadAfterMarker => write!(f, "payload marker with empty payload"),
    }
  }
}

#[cfg(feature = "std")]
#[cfg(feature = "std")]
impl std::error::Error for MessageParseError {}
