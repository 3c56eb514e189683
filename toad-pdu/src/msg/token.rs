use tinyvec::ArrayVec;
use toad_macros::rfc_7252_doc;

#[doc = rfc_7252_doc!("5.3.1")]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Hash, Debug, Default)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Longest token allowed on the wire
  pub const MAX_LEN: usize = 8;

  /// A zero-length token
  pub fn empty() -> Self {
    Self(ArrayVec::new())
  }

  /// Copy up to 8 bytes into a token, yielding `None`
  /// when `bytes` is longer than [`Token::MAX_LEN`].
  ///
  /// ```
  /// use toad_pdu::Token;
  ///
  /// assert_eq!(Token::try_from_slice(&[1, 2]).unwrap().as_bytes(), &[1, 2]);
  /// assert_eq!(Token::try_from_slice(&[0; 9]), None);
  /// ```
  pub fn try_from_slice(bytes: &[u8]) -> Option<Self> {
    if bytes.len() > Self::MAX_LEN {
      return None;
    }

    let mut token = ArrayVec::new();
    token.extend_from_slice(bytes);
    Some(Self(token))
  }

  /// Borrow the token's bytes
  pub fn as_bytes(&self) -> &[u8] {
    self.0.as_slice()
  }

  /// Length of the token, in bytes
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether this is a zero-length token
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl AsRef<[u8]> for Token {
  fn as_ref(&self) -> &[u8] {
    self.as_bytes()
  }
}
