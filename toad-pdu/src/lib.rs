//! Low-level representation of CoAP messages.
//!
//! The most notable item in `toad_pdu` is [`Message`];
//! a CoAP message very close to the actual byte layout.
//!
//! Unlike a message that stores its options in a map, a [`Message`]
//! keeps its options as the raw, delta-encoded [`OptBlock`] that
//! goes on the wire. Options are appended in ascending number order
//! (repeats allowed) and read back lazily with an [`OptCursor`].
//!
//! Option values are typed by the [`value`] codec, which knows
//! which options carry unsigned integers, strings or opaque bytes.
//!
//! ```
//! use toad_pdu::opt::known::no;
//! use toad_pdu::{Code, Id, Message, Token, TryFromBytes, Type};
//!
//! let mut msg = Message::new(Type::Con, Code::new(0, 1), Id(1), Token::empty());
//! msg.opts.push(no::URI_PATH, b"hello").unwrap();
//! msg.payload.0.extend_from_slice(b"hi!");
//!
//! let bytes = msg.to_bytes();
//! assert_eq!(Message::try_from_bytes(&bytes).unwrap(), msg);
//! ```

// x-release-please-start-version
#![doc(html_root_url = "https://docs.rs/toad-pdu/0.1.0")]
// x-release-please-end
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

extern crate alloc as std_alloc;

#[cfg(test)]
macro_rules! assert_eqb {
  ($actual:expr, $expected:expr) => {
    if $actual != $expected {
      panic!("expected {:08b} to equal {:08b}", $actual, $expected)
    }
  };
}

#[cfg(test)]
macro_rules! assert_eqb_iter {
  ($actual:expr, $expected:expr) => {
    if $actual.iter().ne($expected.iter()) {
      panic!("expected {:?} to equal {:?}",
             $actual.into_iter()
                    .map(|b| format!("{:08b}", b))
                    .collect::<Vec<_>>(),
             $expected.into_iter()
                      .map(|b| format!("{:08b}", b))
                      .collect::<Vec<_>>())
    }
  };
}

/// Message structs
pub mod msg;

#[doc(hidden)]
pub mod wire;

#[doc(inline)]
pub use toad_cursor::Cursor;
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use wire::TryFromBytes;

#[cfg(test)]
pub(crate) fn test_msg() -> (Message, std_alloc::vec::Vec<u8>) {
  use std_alloc::vec::Vec;

  let header: [u8; 4] = 0b0100_0001_0100_0101_0000_0000_0000_0001_u32.to_be_bytes();
  let token: [u8; 1] = [254u8];
  let content_format: &[u8] = b"application/json";
  let options: [&[u8]; 2] = [&[0b_1100_1101u8, 0b00000011u8], content_format];
  let payload: [&[u8]; 2] = [&[0b_11111111u8], b"hello, world!"];
  let bytes = [header.as_ref(),
               token.as_ref(),
               options.concat().as_ref(),
               payload.concat().as_ref()].concat();

  let mut opts = OptBlock::default();
  opts.push(OptNumber(12), content_format).unwrap();

  let msg = Message { id: Id(1),
                      ty: Type::Con,
                      ver: Version(1),
                      token: Token(tinyvec::array_vec!([u8; 8] => 254)),
                      opts,
                      code: Code { class: 2,
                                   detail: 5 },
                      payload: Payload(b"hello, world!".iter().copied().collect::<Vec<_>>()) };
  (msg, bytes)
}
