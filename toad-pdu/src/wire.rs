use tinyvec::ArrayVec;

use crate::msg::Byte1;
use crate::{Code, Cursor, Id, OptParseError, Type};

/// Trait for converting a sequence of bytes into some data structure
pub trait TryFromBytes<A: AsRef<[u8]>>: Sized {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to convert from some sequence of bytes `A`
  /// into `Self`
  fn try_from_bytes(bytes: A) -> Result<Self, Self::Error>;
}

/// Trait adding the ability for a _piece_ of a data structure to parse itself by mutating a cursor over a byte buffer.
pub(crate) trait TryConsumeBytes<A: AsRef<[u8]>>: Sized {
  type Error;

  fn try_consume_bytes(bytes: &mut Cursor<A>) -> Result<Self, Self::Error>;
}

/// Largest option delta or value length expressible with the
/// 2-byte extended form (`14` nibble).
pub const MAX_OPT_LEN_OR_DELTA: usize = 65535 + 269;

/// Encode an option delta or value length as its header nibble
/// and the extended bytes that follow the option header.
pub(crate) fn opt_len_or_delta(val: u32) -> (u8, Option<ArrayVec<[u8; 2]>>) {
  match val {
    | n if n >= 269 => {
      let mut bytes = ArrayVec::new();
      bytes.extend(((n - 269) as u16).to_be_bytes());
      (14, Some(bytes))
    },
    | n if n >= 13 => {
      let mut bytes = ArrayVec::new();
      bytes.push((n - 13) as u8);
      (13, Some(bytes))
    },
    | n => (n as u8, None),
  }
}

/// Number of extended bytes needed by [`opt_len_or_delta`]
pub(crate) fn opt_len_or_delta_size(val: u32) -> usize {
  match val {
    | n if n >= 269 => 2,
    | n if n >= 13 => 1,
    | _ => 0,
  }
}

/// Decode an option delta or value length, consuming the
/// extended bytes (if any) from the cursor.
///
/// Delta **MUST** be consumed before Value length, since the
/// extended delta bytes precede the extended length bytes.
pub(crate) fn parse_opt_len_or_delta<A: AsRef<[u8]>>(head: u8,
                                                     bytes: &mut Cursor<A>,
                                                     reserved_err: OptParseError)
                                                     -> Result<u32, OptParseError> {
  match head {
    | 13 => {
      let n = bytes.next().ok_or_else(OptParseError::eof)?;
      Ok((n as u32) + 13)
    },
    | 14 => match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok(u16::from_be_bytes([a, b]) as u32 + 269),
      | _ => Err(OptParseError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(head as u32),
  }
}

impl From<Id> for [u8; 2] {
  fn from(id: Id) -> [u8; 2] {
    id.0.to_be_bytes()
  }
}

impl From<Type> for u8 {
  fn from(t: Type) -> u8 {
    use Type::*;
    match t {
      | Con => 0,
      | Non => 1,
      | Ack => 2,
      | Reset => 3,
    }
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl;

    ver | ty | tkl
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> u8 {
    let class = code.class << 5;
    let detail = code.detail;

    class | detail
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Version;

  #[test]
  fn byte_1() {
    let byte = Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 };
    let actual: u8 = byte.into();
    let expected = 0b_01_10_0011u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn code() {
    let code = Code { class: 2,
                      detail: 5 };
    let actual: u8 = code.into();
    let expected = 0b0100_0101_u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn id() {
    let id = Id(16);
    let actual = u16::from_be_bytes(id.into());
    assert_eqb!(actual, 16)
  }

  #[test]
  fn len_or_delta() {
    assert_eq!(opt_len_or_delta(12), (12, None));
    assert_eq!(opt_len_or_delta(13), (13, Some(tinyvec::array_vec!([u8; 2] => 0))));
    assert_eq!(opt_len_or_delta(268), (13, Some(tinyvec::array_vec!([u8; 2] => 255))));
    assert_eq!(opt_len_or_delta(269), (14, Some(tinyvec::array_vec!([u8; 2] => 0, 0))));
    assert_eq!(opt_len_or_delta(1000),
               (14, Some(tinyvec::array_vec!([u8; 2] => 2, 219))));

    [0u32, 12, 13, 268, 269, 1000, MAX_OPT_LEN_OR_DELTA as u32].into_iter()
                                                               .for_each(|n| {
                                                                 let (head, ext) =
                                                                   opt_len_or_delta(n);
                                                                 let ext = ext.unwrap_or_default();
                                                                 assert_eq!(ext.len(),
                                                                            opt_len_or_delta_size(n));
                                                                 let mut cur = Cursor::new(ext);
                                                                 let parsed =
                                                                   parse_opt_len_or_delta(head,
                                                                                          &mut cur,
                                                                                          OptParseError::OptionDeltaReservedValue(15));
                                                                 assert_eq!(parsed, Ok(n));
                                                               });
  }

  #[test]
  fn reserved_nibble() {
    let mut cur = Cursor::new([0u8; 0]);
    assert_eq!(parse_opt_len_or_delta(15, &mut cur, OptParseError::ValueLengthReservedValue(15)),
               Err(OptParseError::ValueLengthReservedValue(15)));
  }
}
