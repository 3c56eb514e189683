use std_alloc::vec::Vec;

use toad_macros::rfc_7252_doc;

use crate::wire::{opt_len_or_delta,
                  opt_len_or_delta_size,
                  parse_opt_len_or_delta,
                  TryConsumeBytes,
                  MAX_OPT_LEN_OR_DELTA};
use crate::Cursor;

/// Option parsing & appending errors
pub mod parse_error;
pub use parse_error::*;

/// Registered option numbers & content formats
pub mod known;
pub use known::ContentFormat;

/// Typed option values
pub mod value;
pub use value::Value;

#[doc = rfc_7252_doc!("5.4.6")]
/// <details><summary><b>RFC7252 Section 12.2 Core CoAP Option Numbers</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("12.2"))]
/// </details>
///
/// # `OptNumber` struct
/// Option Numbers are only stored on the wire as deltas from the
/// previous option; an [`OptCursor`] recovers them while reading an [`OptBlock`].
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u32);

impl OptNumber {
  /// Registered name of this option (e.g. `"Uri-Path"`), if it is known
  ///
  /// ```
  /// use toad_pdu::OptNumber;
  ///
  /// assert_eq!(OptNumber(11).name(), Some("Uri-Path"));
  /// assert_eq!(OptNumber(9).name(), None);
  /// ```
  pub fn name(&self) -> Option<&'static str> {
    known::name(*self)
  }
}

impl core::fmt::Display for OptNumber {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self.name() {
      | Some(name) => write!(f, "{} ({})", name, self.0),
      | None => write!(f, "{}", self.0),
    }
  }
}

#[doc = rfc_7252_doc!("3.1")]
///
/// # `OptBlock` struct
/// The options of a message, stored exactly as they are laid out on the wire:
/// a sequence of delta-encoded option headers, each followed by the option value.
///
/// Options can only be appended, and only in non-decreasing [`OptNumber`] order.
/// Several options may share a number (e.g. one `Uri-Path` option per path segment).
///
/// ```
/// use toad_pdu::{OptBlock, OptNumber, OptPushError};
///
/// let mut opts = OptBlock::default();
/// opts.push(OptNumber(11), b"a").unwrap();
/// opts.push(OptNumber(11), b"b").unwrap();
/// opts.push(OptNumber(12), &[50]).unwrap();
///
/// assert_eq!(opts.push(OptNumber(4), b""),
///            Err(OptPushError::OutOfOrder { last: OptNumber(12),
///                                           number: OptNumber(4) }));
///
/// let paths = opts.iter()
///                 .filter_map(Result::ok)
///                 .filter(|(n, _)| *n == OptNumber(11))
///                 .map(|(_, v)| v)
///                 .collect::<Vec<_>>();
/// assert_eq!(paths, vec![b"a".as_ref(), b"b".as_ref()]);
/// ```
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct OptBlock {
  bytes: Vec<u8>,
  last: OptNumber,
  count: usize,
}

impl OptBlock {
  /// Create an empty option block
  pub fn new() -> Self {
    Self::default()
  }

  /// The raw, delta-encoded bytes of this block
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// Size of the block on the wire, in bytes
  pub fn size(&self) -> usize {
    self.bytes.len()
  }

  /// Number of options in the block
  pub fn len(&self) -> usize {
    self.count
  }

  /// Whether the block contains no options
  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  /// Number of the most recently appended option
  pub fn last_number(&self) -> Option<OptNumber> {
    Some(self.last).filter(|_| !self.is_empty())
  }

  /// How many bytes appending an option `number` with a value
  /// of `value_len` bytes would add to this block.
  ///
  /// Assumes `number` is not less than [`OptBlock::last_number`].
  pub fn encoded_size(&self, number: OptNumber, value_len: usize) -> usize {
    let delta = number.0.saturating_sub(self.last.0);
    1 + opt_len_or_delta_size(delta) + opt_len_or_delta_size(value_len as u32) + value_len
  }

  /// Append an option to the block
  pub fn push(&mut self, number: OptNumber, value: &[u8]) -> Result<(), OptPushError> {
    if number < self.last {
      return Err(OptPushError::OutOfOrder { last: self.last,
                                            number });
    }

    let delta = number.0 - self.last.0;
    if delta as usize > MAX_OPT_LEN_OR_DELTA {
      return Err(OptPushError::NumberTooLarge(number));
    }

    if value.len() > MAX_OPT_LEN_OR_DELTA {
      return Err(OptPushError::ValueTooLong { len: value.len(),
                                              max: MAX_OPT_LEN_OR_DELTA });
    }

    self.push_delta(delta, value);
    Ok(())
  }

  fn push_delta(&mut self, delta: u32, value: &[u8]) {
    let (del, del_bytes) = opt_len_or_delta(delta);
    let (len, len_bytes) = opt_len_or_delta(value.len() as u32);

    self.bytes.push(del << 4 | len);

    if let Some(bs) = del_bytes {
      self.bytes.extend(bs);
    }

    if let Some(bs) = len_bytes {
      self.bytes.extend(bs);
    }

    self.bytes.extend_from_slice(value);
    self.last = OptNumber(self.last.0 + delta);
    self.count += 1;
  }

  /// Iterate over the options in this block, in wire order
  pub fn iter(&self) -> OptIter<'_> {
    OptIter { bytes: &self.bytes,
              cursor: OptCursor::new() }
  }

  /// Get the value of the first option numbered `number`
  pub fn get(&self, number: OptNumber) -> Option<&[u8]> {
    self.iter()
        .map_while(Result::ok)
        .take_while(|(n, _)| *n <= number)
        .find(|(n, _)| *n == number)
        .map(|(_, v)| v)
  }
}

/// Read an option header, yielding the option delta and value length.
///
/// Yields [`OptParseError::OptionsExhausted`] when there are no bytes
/// left or the next byte is the payload marker.
fn read_header<A: AsRef<[u8]>>(bytes: &mut Cursor<A>) -> Result<(u32, usize), OptParseError> {
  let byte1 = bytes.next()
                   .ok_or(OptParseError::OptionsExhausted)
                   .and_then(|b| {
                     if b == 0b11111111 {
                       Err(OptParseError::OptionsExhausted)
                     } else {
                       Ok(b)
                     }
                   })?;

  let delta = parse_opt_len_or_delta(byte1 >> 4,
                                     bytes,
                                     OptParseError::OptionDeltaReservedValue(15))?;

  let len = parse_opt_len_or_delta(byte1 & 0b00001111,
                                   bytes,
                                   OptParseError::ValueLengthReservedValue(15))?;

  Ok((delta, len as usize))
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for OptBlock {
  type Error = OptParseError;

  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    let mut block = OptBlock::default();

    loop {
      match bytes.peek_exact(1) {
        | None | Some(&[0b11111111]) => break Ok(block),
        | _ => (),
      }

      let (delta, len) = read_header(bytes)?;
      let value = bytes.take_exact(len).ok_or_else(OptParseError::eof)?;
      block.push_delta(delta, value);
    }
  }
}

/// A position within a raw option block that remembers
/// the number of the last option it read.
///
/// Because it does not borrow the block, an `OptCursor` can be
/// stored alongside a shared handle to a message and advanced
/// one option at a time.
///
/// Once the cursor reaches the end of the block (or the payload marker)
/// or encounters a malformed option, it yields nothing further.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptCursor {
  pos: usize,
  number: u32,
  done: bool,
}

impl OptCursor {
  /// A cursor at the start of a block
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether this cursor will yield no more options
  pub fn is_done(&self) -> bool {
    self.done
  }

  /// Read the option at the cursor's position in `bytes`
  ///
  /// ```
  /// use toad_pdu::{OptCursor, OptNumber, OptParseError};
  ///
  /// let block = [0b1011_0001, b'a', 0b0000_0001, b'b', 0b1111_0000];
  /// let mut cur = OptCursor::new();
  ///
  /// assert_eq!(cur.next(&block), Some(Ok((OptNumber(11), b"a".as_ref()))));
  /// assert_eq!(cur.next(&block), Some(Ok((OptNumber(11), b"b".as_ref()))));
  /// assert_eq!(cur.next(&block),
  ///            Some(Err(OptParseError::OptionDeltaReservedValue(15))));
  /// assert_eq!(cur.next(&block), None);
  /// ```
  pub fn next<'a>(&mut self,
                  bytes: &'a [u8])
                  -> Option<Result<(OptNumber, &'a [u8]), OptParseError>> {
    if self.done {
      return None;
    }

    let mut cur = Cursor::new(bytes);
    cur.skip(self.pos);
    match read_header(&mut cur) {
      | Err(OptParseError::OptionsExhausted) => {
        self.done = true;
        None
      },
      | Err(e) => {
        self.done = true;
        Some(Err(e))
      },
      | Ok((delta, len)) => {
        let start = cur.position();
        if cur.remaining() < len {
          self.done = true;
          return Some(Err(OptParseError::eof()));
        }

        self.pos = start + len;
        self.number = self.number.saturating_add(delta);
        Some(Ok((OptNumber(self.number), &bytes[start..start + len])))
      },
    }
  }
}

/// Iterator over the options in an [`OptBlock`]
///
/// Yields at most one error, after which the iterator is exhausted.
#[derive(Clone, Debug)]
pub struct OptIter<'a> {
  bytes: &'a [u8],
  cursor: OptCursor,
}

impl<'a> Iterator for OptIter<'a> {
  type Item = Result<(OptNumber, &'a [u8]), OptParseError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.cursor.next(self.bytes)
  }
}
