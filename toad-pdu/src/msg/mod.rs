use std_alloc::vec::Vec;

use toad_macros::rfc_7252_doc;

/// Message Code
pub mod code;

/// Message parsing errors
pub mod parse_error;

/// Message ID
pub mod id;

/// Message Options
pub mod opt;

/// Message Type
pub mod ty;

/// Message Token
pub mod token;

/// Message Version
pub mod ver;

pub use code::*;
pub use id::*;
pub use opt::*;
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

use crate::wire::TryConsumeBytes;
use crate::{Cursor, TryFromBytes};

#[doc = rfc_7252_doc!("5.5")]
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Hash)]
pub struct Payload(pub Vec<u8>);

impl Payload {
  /// Borrow the payload bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (request, response, empty)
/// |  |
/// |  |  Length of token, in bytes. (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let tkl = b & 0b1111u8; // last 4 bits

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               tkl })
  }
}

/// # `Message` struct
/// Low-level representation of a CoAP message.
///
/// Options are kept in their wire encoding (see [`OptBlock`]),
/// so serializing a message is a matter of concatenating its parts.
///
/// <details>
/// <summary><b>RFC7252 - CoAP Messaging Model</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("2.1"))]
/// </details>
/// <details>
/// <summary><b>RFC7252 - CoAP Message Binary Format</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("3"))]
/// </details>
///
/// ```
/// use toad_pdu::*;
/// # //                       version  token len  code (2.05 Content)
/// # //                       |        |          /
/// # //                       |  type  |         /  message ID
/// # //                       |  |     |        |   |
/// # //                       vv vv vvvv vvvvvvvv vvvvvvvvvvvvvvvv
/// # let header: [u8; 4] = 0b_01_00_0001_01000101_0000000000000001u32.to_be_bytes();
/// # let token: [u8; 1] = [254u8];
/// # let content_format: &[u8] = b"application/json";
/// # let options: [&[u8]; 2] = [&[0b_1100_1101u8, 0b00000011u8], content_format];
/// # let payload: [&[u8]; 2] = [&[0b_11111111u8], b"hello, world!"];
/// let packet: Vec<u8> = /* bytes! */
/// # [header.as_ref(), token.as_ref(), options.concat().as_ref(), payload.concat().as_ref()].concat();
///
/// let msg = Message::try_from_bytes(&packet).unwrap();
///
/// assert_eq!(msg.ty, Type::Con);
/// assert_eq!(msg.code, Code::new(2, 5));
/// assert_eq!(msg.token.as_bytes(), &[254]);
/// assert_eq!(msg.opts.get(OptNumber(12)), Some(b"application/json".as_ref()));
/// assert_eq!(msg.payload.as_bytes(), b"hello, world!");
/// assert_eq!(msg.to_bytes(), packet);
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Message {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`OptBlock`] for details
  pub opts: OptBlock,
  /// see [`Payload`]
  pub payload: Payload,
}

impl Message {
  /// Create a message with no options and no payload
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Self {
    Self { id,
           ty,
           ver: Version::default(),
           token,
           code,
           opts: OptBlock::default(),
           payload: Payload::default() }
  }

  /// Create a new message that ACKs this one.
  ///
  /// The ACK is an empty message; it carries this message's [`Id`]
  /// if you pass `self.id`, or any other id you wish to assign.
  ///
  /// ```
  /// use toad_pdu::{Code, Id, Message, Token, Type};
  ///
  /// let req = Message::new(Type::Con, Code::new(0, 1), Id(8), Token::try_from_slice(&[1]).unwrap());
  /// let ack = req.ack(req.id);
  ///
  /// assert_eq!(ack.ty, Type::Ack);
  /// assert_eq!(ack.id, Id(8));
  /// assert!(ack.code.is_empty());
  /// assert!(ack.token.is_empty());
  /// ```
  pub fn ack(&self, id: Id) -> Self {
    Self::new(Type::Ack, Code::EMPTY, id, Token::empty())
  }

  /// Create a reset message for this one, carrying its [`Id`]
  pub fn reset(&self) -> Self {
    Self::new(Type::Reset, Code::EMPTY, self.id, Token::empty())
  }

  /// Size of this message on the wire, in bytes
  pub fn size(&self) -> usize {
    let header_size = 4;
    let payload_size = match self.payload.0.len() {
      | 0 => 0,
      | n => n + 1,
    };

    header_size + self.token.len() + self.opts.size() + payload_size
  }

  /// Serialize this message into its wire representation
  pub fn to_bytes(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(self.size());

    let byte1: u8 = Byte1 { ver: self.ver,
                            ty: self.ty,
                            tkl: self.token.len() as u8 }.into();
    let id: [u8; 2] = self.id.into();

    bytes.push(byte1);
    bytes.push(self.code.into());
    bytes.extend(id);
    bytes.extend_from_slice(self.token.as_bytes());
    bytes.extend_from_slice(self.opts.as_bytes());

    if !self.payload.0.is_empty() {
      bytes.push(0b11111111);
      bytes.extend_from_slice(&self.payload.0);
    }

    bytes
  }
}

impl<Bytes: AsRef<[u8]>> TryFromBytes<Bytes> for Message {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let Byte1 { tkl, ty, ver } = bytes.next()
                                      .ok_or_else(MessageParseError::eof)?
                                      .try_into()?;

    if ver != Version(1) {
      return Err(Self::Error::UnsupportedVersion(ver.0));
    }

    if tkl as usize > Token::MAX_LEN {
      return Err(Self::Error::InvalidTokenLength(tkl));
    }

    let code: Code = bytes.next().ok_or_else(MessageParseError::eof)?.into();
    let id: Id = Id::try_consume_bytes(&mut bytes)?;

    let token = bytes.take_exact(tkl as usize)
                     .and_then(Token::try_from_slice)
                     .ok_or_else(MessageParseError::eof)?;

    let opts = OptBlock::try_consume_bytes(&mut bytes).map_err(Self::Error::OptParseError)?;

    let payload = match bytes.next() {
      | None => Payload::default(),
      | Some(_marker) if bytes.is_exhausted() => {
        return Err(Self::Error::EmptyPayloadAfterMarker)
      },
      | Some(_marker) => Payload(bytes.take_until_end().to_vec()),
    };

    Ok(Message { id,
                 ty,
                 ver,
                 code,
                 token,
                 opts,
                 payload })
  }
}
