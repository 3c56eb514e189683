//! Conversion between raw option bytes and typed option values.
//!
//! Every registered option carries one kind of value: an unsigned
//! integer, a UTF-8 string or opaque bytes ([`Category`]).
//! [`decode`] and [`encode`] use that classification to move between
//! wire bytes and a [`Value`].

use std_alloc::string::String;
use std_alloc::vec::Vec;

use super::known::no;
use super::OptNumber;
use crate::wire::MAX_OPT_LEN_OR_DELTA;

/// Longest value accepted for an opaque (or unregistered) option
pub const MAX_OPAQUE_LEN: usize = 255;

/// Longest value accepted for a string option
pub const MAX_STRING_LEN: usize = MAX_OPT_LEN_OR_DELTA;

/// The kind of value an option carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
  /// Unsigned integer, big-endian with leading zero bytes omitted
  Uint,
  /// UTF-8 string
  String,
  /// Opaque bytes
  Opaque,
  /// The option number is not registered
  Unknown,
}

/// Typed option value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
  /// Zero-length value
  Empty,
  /// Unsigned integer
  Uint(u32),
  /// String
  Str(String),
  /// Opaque bytes
  Opaque(Vec<u8>),
}

impl Value {
  fn shape(&self) -> Category {
    match self {
      | Value::Empty => Category::Unknown,
      | Value::Uint(_) => Category::Uint,
      | Value::Str(_) => Category::String,
      | Value::Opaque(_) => Category::Opaque,
    }
  }
}

impl From<()> for Value {
  fn from(_: ()) -> Self {
    Value::Empty
  }
}

impl From<u8> for Value {
  fn from(n: u8) -> Self {
    Value::Uint(n.into())
  }
}

impl From<u16> for Value {
  fn from(n: u16) -> Self {
    Value::Uint(n.into())
  }
}

impl From<u32> for Value {
  fn from(n: u32) -> Self {
    Value::Uint(n)
  }
}

impl<'a> From<&'a str> for Value {
  fn from(s: &'a str) -> Self {
    Value::Str(s.into())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::Str(s)
  }
}

impl<'a> From<&'a [u8]> for Value {
  fn from(b: &'a [u8]) -> Self {
    Value::Opaque(b.to_vec())
  }
}

impl From<Vec<u8>> for Value {
  fn from(b: Vec<u8>) -> Self {
    Value::Opaque(b)
  }
}

/// Errors encounterable while encoding a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EncodeError {
  /// The value's shape does not match the option's category
  InvalidArgument {
    /// The option's category
    expected: Category,
  },
  /// The encoded value would be longer than the category allows
  ValueTooLarge {
    /// Length of the rejected value
    size: usize,
    /// Maximum length for the category
    max: usize,
  },
}

impl core::fmt::Display for EncodeError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::InvalidArgument { expected } => {
        write!(f, "value does not fit option category {:?}", expected)
      },
      | Self::ValueTooLarge { size, max } => {
        write!(f, "option value of {} bytes exceeds {} bytes", size, max)
      },
    }
  }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Look up the [`Category`] of a registered option
///
/// ```
/// use toad_pdu::opt::known::no;
/// use toad_pdu::opt::value::{category_of, Category};
/// use toad_pdu::OptNumber;
///
/// assert_eq!(category_of(no::CONTENT_FORMAT), Category::Uint);
/// assert_eq!(category_of(no::URI_PATH), Category::String);
/// assert_eq!(category_of(no::ETAG), Category::Opaque);
/// assert_eq!(category_of(OptNumber(2048)), Category::Unknown);
/// ```
pub fn category_of(n: OptNumber) -> Category {
  match n {
    | no::IF_NONE_MATCH
    | no::OBSERVE
    | no::URI_PORT
    | no::CONTENT_FORMAT
    | no::MAX_AGE
    | no::ACCEPT
    | no::BLOCK2
    | no::BLOCK1
    | no::SIZE2
    | no::SIZE1
    | no::NO_RESPONSE => Category::Uint,
    | no::URI_HOST
    | no::LOCATION_PATH
    | no::URI_PATH
    | no::URI_QUERY
    | no::LOCATION_QUERY
    | no::PROXY_URI
    | no::PROXY_SCHEME => Category::String,
    | no::IF_MATCH | no::ETAG => Category::Opaque,
    | _ => Category::Unknown,
  }
}

/// Interpret the raw bytes of option `n`
///
/// Integers longer than 4 bytes keep their low 32 bits.
/// Strings that are not valid UTF-8 are decoded lossily.
pub fn decode(n: OptNumber, bytes: &[u8]) -> Value {
  if bytes.is_empty() {
    return Value::Empty;
  }

  match category_of(n) {
    | Category::Uint => {
      Value::Uint(bytes.iter()
                       .fold(0u32, |acc, b| acc.wrapping_shl(8) | u32::from(*b)))
    },
    | Category::String => Value::Str(String::from_utf8_lossy(bytes).into_owned()),
    | Category::Opaque | Category::Unknown => Value::Opaque(bytes.to_vec()),
  }
}

/// Encode `value` as the raw bytes of option `n`
///
/// ```
/// use toad_pdu::opt::known::no;
/// use toad_pdu::opt::value::{encode, EncodeError, Category, Value};
///
/// assert_eq!(encode(no::MAX_AGE, &Value::Uint(0)), Ok(vec![0]));
/// assert_eq!(encode(no::MAX_AGE, &Value::Uint(256)), Ok(vec![1, 0]));
/// assert_eq!(encode(no::URI_PATH, &Value::Str("a".into())), Ok(b"a".to_vec()));
/// assert_eq!(encode(no::URI_PATH, &Value::Uint(1)),
///            Err(EncodeError::InvalidArgument { expected: Category::String }));
/// ```
pub fn encode(n: OptNumber, value: &Value) -> Result<Vec<u8>, EncodeError> {
  let category = match (category_of(n), value) {
    | (_, Value::Empty) => return Ok(Vec::new()),
    | (Category::Unknown, v) => v.shape(),
    | (c, v) if c == v.shape() => c,
    | (expected, _) => return Err(EncodeError::InvalidArgument { expected }),
  };

  let check_len = |size: usize, max: usize| {
    if size > max {
      Err(EncodeError::ValueTooLarge { size, max })
    } else {
      Ok(())
    }
  };

  match (category, value) {
    | (Category::Uint, Value::Uint(u)) => {
      let bytes = u.to_be_bytes();
      let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
      Ok(bytes[first..].to_vec())
    },
    | (Category::String, Value::Str(s)) => {
      check_len(s.len(), MAX_STRING_LEN)?;
      Ok(s.as_bytes().to_vec())
    },
    | (Category::Opaque, Value::Opaque(b)) => {
      check_len(b.len(), MAX_OPAQUE_LEN)?;
      Ok(b.clone())
    },
    | (expected, _) => Err(EncodeError::InvalidArgument { expected }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uint_minimal_bytes() {
    [(0u32, vec![0u8]),
     (1, vec![1]),
     (255, vec![255]),
     (256, vec![1, 0]),
     (65536, vec![1, 0, 0]),
     (u32::MAX, vec![255, 255, 255, 255])].into_iter()
                                          .for_each(|(n, bytes)| {
                                            assert_eq!(encode(no::SIZE1, &Value::Uint(n)),
                                                       Ok(bytes.clone()));
                                            assert_eq!(decode(no::SIZE1, &bytes), Value::Uint(n));
                                          });
  }

  #[test]
  fn uint_overflow_keeps_low_bits() {
    assert_eq!(decode(no::MAX_AGE, &[9, 0, 0, 0, 1]), Value::Uint(1));
  }

  #[test]
  fn empty_is_empty() {
    assert_eq!(decode(no::MAX_AGE, &[]), Value::Empty);
    assert_eq!(decode(no::URI_PATH, &[]), Value::Empty);
    assert_eq!(encode(no::IF_NONE_MATCH, &Value::Empty), Ok(vec![]));
  }

  #[test]
  fn category_mismatch() {
    assert_eq!(encode(no::ETAG, &Value::Str("x".into())),
               Err(EncodeError::InvalidArgument { expected: Category::Opaque }));
    assert_eq!(encode(no::CONTENT_FORMAT, &Value::Opaque(vec![1])),
               Err(EncodeError::InvalidArgument { expected: Category::Uint }));
  }

  #[test]
  fn unknown_infers_category() {
    let n = OptNumber(2048);
    assert_eq!(encode(n, &Value::Uint(258)), Ok(vec![1, 2]));
    assert_eq!(encode(n, &"hi".into()), Ok(b"hi".to_vec()));
    assert_eq!(encode(n, &Value::Opaque(vec![0; 256])),
               Err(EncodeError::ValueTooLarge { size: 256, max: MAX_OPAQUE_LEN }));
    assert_eq!(decode(n, b"hi"), Value::Opaque(b"hi".to_vec()));
  }

  #[test]
  fn limits() {
    assert_eq!(encode(no::ETAG, &Value::Opaque(vec![0; 255])).map(|b| b.len()),
               Ok(255));
    assert_eq!(encode(no::ETAG, &Value::Opaque(vec![0; 256])),
               Err(EncodeError::ValueTooLarge { size: 256, max: 255 }));

    let long = "a".repeat(MAX_STRING_LEN + 1);
    assert_eq!(encode(no::PROXY_URI, &Value::Str(long)),
               Err(EncodeError::ValueTooLarge { size: MAX_STRING_LEN + 1,
                                                max: MAX_STRING_LEN }));
  }

  #[test]
  fn lossy_strings() {
    assert_eq!(decode(no::URI_PATH, &[b'a', 0xFF]),
               Value::Str("a\u{FFFD}".into()));
  }
}
