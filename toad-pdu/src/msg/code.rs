use toad_macros::rfc_7252_doc;

#[doc = rfc_7252_doc!("12.1")]
/// <details><summary><b>RFC7252 Section 12.1.1 Method Codes</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("12.1.1"))]
/// </details>
/// <details><summary><b>RFC7252 Section 12.1.2 Response Codes</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("12.1.2"))]
/// </details>
///
/// # Examples
/// ```
/// use toad_pdu::Code;
/// assert_eq!(Code { class: 2, detail: 5 }.to_string(), "2.05".to_string())
/// ```
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Code {
  /// The "class" of message codes identify it as a request or response, and provides the class of response status:
  ///
  /// |class|meaning|
  /// |---|---|
  /// |`0`|Message is a request|
  /// |`2`|Message is a success response|
  /// |`4`|Message is a client error response|
  /// |`5`|Message is a server error response|
  /// |`7`|Message is a signaling message|
  pub class: u8,

  /// 2-digit integer (range `[0, 32)`) that provides granular information about the response status.
  pub detail: u8,
}

/// Whether a code is for a request, response, or empty message
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CodeKind {
  /// A request code (0.xx, other than 0.00)
  Request,
  /// A response (or signaling) code (1.xx and up)
  Response,
  /// EMPTY (0.00)
  Empty,
}

impl Code {
  /// The empty code `0.00`, used by ACKs, RSTs and pings
  pub const EMPTY: Code = Code::new(0, 0);

  /// Create a new Code
  ///
  /// ```
  /// use toad_pdu::Code;
  ///
  /// let content = Code::new(2, 05);
  /// ```
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Get whether this code is for a request, response, or empty message
  ///
  /// ```
  /// use toad_pdu::{Code, CodeKind};
  ///
  /// assert_eq!(Code::new(0, 0).kind(), CodeKind::Empty);
  /// assert_eq!(Code::new(0, 1).kind(), CodeKind::Request);
  /// assert_eq!(Code::new(2, 5).kind(), CodeKind::Response);
  /// ```
  pub fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | _ => CodeKind::Response,
    }
  }

  /// Is this the empty code (0.00)?
  pub fn is_empty(&self) -> bool {
    self.kind() == CodeKind::Empty
  }

  /// Express this code as the integer `100 * class + detail`,
  /// e.g. `2.05` becomes `205`.
  ///
  /// ```
  /// use toad_pdu::Code;
  ///
  /// assert_eq!(Code::new(2, 5).to_decimal(), 205);
  /// assert_eq!(Code::new(0, 1).to_decimal(), 1);
  /// ```
  pub fn to_decimal(&self) -> u16 {
    self.class as u16 * 100 + self.detail as u16
  }

  /// Inverse of [`Code::to_decimal`].
  ///
  /// Yields `None` if the class does not fit in 3 bits
  /// or the detail does not fit in 5 bits.
  ///
  /// ```
  /// use toad_pdu::Code;
  ///
  /// assert_eq!(Code::from_decimal(404), Some(Code::new(4, 4)));
  /// assert_eq!(Code::from_decimal(840), None);
  /// assert_eq!(Code::from_decimal(232), None);
  /// ```
  pub fn from_decimal(n: u16) -> Option<Self> {
    let (class, detail) = (n / 100, n % 100);
    if class > 0b111 || detail > 0b11111 {
      None
    } else {
      Some(Self::new(class as u8, detail as u8))
    }
  }

  /// Get the human string representation of a message code
  ///
  /// # Returns
  /// A `char` array
  ///
  /// This is to avoid unnecessary heap allocation,
  /// you can create a `String` with `FromIterator::<String>::from_iter`,
  /// or use the [`core::fmt::Display`] implementation.
  /// ```
  /// use toad_pdu::Code;
  ///
  /// let code = Code { class: 2, detail: 5 };
  /// let chars = code.to_human();
  /// let string = String::from_iter(chars);
  /// assert_eq!(string, "2.05".to_string());
  /// ```
  pub fn to_human(&self) -> [char; 4] {
    let to_char = |d: u8| char::from_digit(d.into(), 10).unwrap_or('?');
    [to_char(self.class),
     '.',
     to_char(self.detail / 10),
     to_char(self.detail % 10)]
  }
}

impl core::fmt::Display for Code {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    use core::fmt::Write;

    self.to_human().into_iter().try_for_each(|c| f.write_char(c))
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    let class = b >> 5;
    let detail = b & 0b0011111;

    Code { class, detail }
  }
}
