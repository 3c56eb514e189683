//! `toad-script` is the CoAP layer a scripting runtime embeds
//! to speak CoAP without ever touching raw bytes.
//!
//! It hands out [`Pdu`]s: shared handles to messages that can be
//! read & built field by field, and that know where they came from
//! and what they may be used for.
//!
//! ## Sending requests
//! A [`Context`] creates messages with [`Context::new_msg`] and
//! sessions to peers with [`Context::new_connection`];
//! [`Connection::send`] transmits a message and locks it.
//!
//! ## Serving requests
//! [`Context::bind_server`] listens on a local address. Each time
//! [`Context::process_step`] is invoked, the engine is pumped and
//! whatever arrived is handed to a handler:
//!  - requests to the request handler, along with a response to fill in
//!  - responses to the response handler, along with the request they answer
//!  - messages that were never acknowledged to the NACK handler
//!
//! Confirmable requests and responses are acknowledged automatically.
//!
//! ## Handlers
//! A handler slot holds a callback, the name of a callback registered with
//! [`Context::register`], or nothing at all, in which case whatever is
//! registered under the slot's default name (`coap_req_handler`,
//! `coap_resp_handler` or `coap_nack_handler`) is used.
//!
//! ```no_run
//! use toad_script::handler::Handler;
//! use toad_script::{code, Context};
//!
//! let mut ctx = Context::new(Default::default());
//! ctx.bind_server("0.0.0.0",
//!                  5683,
//!                  Some(Handler::request(|req, resp| {
//!                    if req.uri_path()?.as_deref() == Some("/hello") {
//!                      resp.set_payload("hello!")?;
//!                    } else {
//!                      resp.set_code(code::NOT_FOUND)?;
//!                    }
//!                    Ok(())
//!                  })))
//!    .unwrap();
//!
//! loop {
//!   ctx.process_step(Some(1_000)).unwrap();
//! }
//! ```

// x-release-please-version
#![doc(html_root_url = "https://docs.rs/toad-script/0.1.0")]
// x-release-please-end
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]

#[cfg(test)]
pub(crate) mod test;

pub(crate) mod dispatch;
pub(crate) mod logging;

/// method, response & signaling codes
pub mod code;

/// configuring runtime behavior
pub mod config;

/// sessions with peers
pub mod conn;

/// the entry point
pub mod context;

/// the engine that does the protocol work
pub mod engine;

/// errors
pub mod error;

/// request, response & NACK handlers
pub mod handler;

/// network abstractions
pub mod net;

/// protocol data units
pub mod pdu;

/// customizable retrying of fallible operations
pub mod retry;

/// time abstractions
pub mod time;

pub mod udp;

pub use conn::Connection;
pub use context::Context;
pub use error::Error;
pub use pdu::Pdu;
pub use toad_pdu::{ContentFormat, Id, Message, OptNumber, Token, Type, Value};
