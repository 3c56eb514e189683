use toad_pdu::OptNumber;

use crate::engine;

/// Errors yielded by [`Pdu`](crate::Pdu)s, [`Connection`](crate::Connection)s
/// and the [`Context`](crate::Context)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// The PDU belonged to a handler invocation that has finished,
  /// and may no longer be used.
  ObjectLocked,
  /// Attempted to modify a read-only PDU (e.g. a received request)
  ReadOnlyViolation,
  /// Options must be added in ascending option-number order
  OptionOrderViolation {
    /// Number of the last option in the PDU
    last: OptNumber,
    /// Number of the rejected option
    number: OptNumber,
  },
  /// Tokens may be at most 8 bytes
  TokenTooLong(usize),
  /// The token must be set before any option or payload
  TokenAfterOptions,
  /// An option value is longer than its option allows
  ValueTooLarge {
    /// Option the value was meant for
    number: OptNumber,
    /// Length of the rejected value
    size: usize,
    /// Longest value the option allows
    max: usize,
  },
  /// An argument was outside its domain (bad port, unknown handler name, wrong value shape, ...)
  InvalidArgument(String),
  /// The change would grow the message past its maximum size
  PduTooLarge {
    /// Size the message would have had
    size: usize,
    /// Maximum message size
    max: usize,
  },
  /// The operation does not exist for this kind of PDU
  Unavailable(&'static str),
  /// A host name could not be resolved
  AddressResolution(String),
  /// The session behind a connection no longer exists
  SessionClosed,
  /// The CoAP engine failed
  Engine(engine::Error),
  /// A handler callback failed
  Callback(String),
}

impl Error {
  /// Shorthand for [`Error::InvalidArgument`]
  pub fn invalid_argument(msg: impl ToString) -> Self {
    Self::InvalidArgument(msg.to_string())
  }

  /// Shorthand for [`Error::Callback`]
  pub fn callback(msg: impl ToString) -> Self {
    Self::Callback(msg.to_string())
  }
}

impl core::fmt::Display for Error {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::ObjectLocked => write!(f, "object is locked"),
      | Self::ReadOnlyViolation => write!(f, "object is read-only"),
      | Self::OptionOrderViolation { last, number } => {
        write!(f, "option {} may not follow option {}", number, last)
      },
      | Self::TokenTooLong(n) => write!(f, "token of {} bytes is longer than 8 bytes", n),
      | Self::TokenAfterOptions => write!(f, "token must be set before options or payload"),
      | Self::ValueTooLarge { number, size, max } => {
        write!(f, "value of {} bytes for option {} exceeds {} bytes", size, number, max)
      },
      | Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
      | Self::PduTooLarge { size, max } => {
        write!(f, "message of {} bytes exceeds maximum of {} bytes", size, max)
      },
      | Self::Unavailable(op) => write!(f, "{} is not available on this object", op),
      | Self::AddressResolution(host) => write!(f, "could not resolve {}", host),
      | Self::SessionClosed => write!(f, "session is closed"),
      | Self::Engine(e) => write!(f, "engine error: {}", e),
      | Self::Callback(msg) => write!(f, "handler failed: {}", msg),
    }
  }
}

impl std::error::Error for Error {}

impl From<engine::Error> for Error {
  fn from(e: engine::Error) -> Self {
    match e {
      | engine::Error::Resolve(host) => Error::AddressResolution(host),
      | engine::Error::UnknownSession => Error::SessionClosed,
      | e => Error::Engine(e),
    }
  }
}
