//! The [`Pdu`] object: a CoAP message handle with access control.
//!
//! A [`Pdu`] is either constructed by the user with
//! [`Context::new_msg`](crate::Context::new_msg), or built by the
//! dispatcher when an event arrives, in which case it is bound to the
//! session it arrived on and its [`Origin`] records which handler it was built for.
//!
//! ```
//! use toad_pdu::opt::known::no;
//! use toad_pdu::Value;
//! use toad_script::code;
//! use toad_script::config::Config;
//! use toad_script::pdu::Access;
//! use toad_script::{Context, Type};
//!
//! let ctx = Context::new(Config::default());
//! let req = ctx.new_msg(Type::Con, code::GET, 1);
//!
//! req.set_token(&[1, 2, 3]).unwrap();
//! req.set_uri_path("/sensors/temp").unwrap();
//! req.set_option(no::ACCEPT, 50u16).unwrap();
//!
//! assert_eq!(req.uri_path().unwrap(), Some("/sensors/temp".to_string()));
//! assert_eq!(req.option(no::ACCEPT).unwrap(), Some(Value::Uint(50)));
//! assert_eq!(req.access(), Access::Unrestricted);
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use toad_pdu::opt::known::no;
use toad_pdu::opt::value::{self, EncodeError};
use toad_pdu::{Code,
               ContentFormat,
               Id,
               Message,
               OptNumber,
               OptPushError,
               Token,
               Type,
               Value};

use crate::code::default_response_code;
use crate::conn::Connection;
use crate::engine::{Engine, SessionId};
use crate::error::Error;

mod options;
mod path;
mod query;

pub use options::Options;
pub use path::IntoUriPath;
pub use query::{QueryParam, QueryParams, MAX_FILTER_NAMES};

/// What may be done with a [`Pdu`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Access {
  /// Anything
  Unrestricted,
  /// Reads only
  ReadOnly,
  /// Nothing; the PDU was sent or its handler returned
  Locked,
}

/// Which handler invocation a [`Pdu`] was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
  /// Constructed by the user
  None,
  /// Built for a request handler: the received request, or the response to it
  Request,
  /// Built for a response handler: the request we sent, or the response we got
  Response,
  /// Built for a NACK handler: the message that was not acknowledged
  Nack,
}

/// A session a [`Pdu`] arrived on, held without keeping the engine alive
#[derive(Debug, Clone)]
pub(crate) struct SessionRef {
  pub(crate) id: SessionId,
  pub(crate) engine: Weak<RefCell<dyn Engine>>,
}

impl SessionRef {
  pub(crate) fn new(id: SessionId, engine: &Rc<RefCell<dyn Engine>>) -> Self {
    Self { id,
           engine: Rc::downgrade(engine) }
  }
}

#[derive(Debug)]
struct State {
  msg: Option<Message>,
  access: Access,
  origin: Origin,
  session: Option<SessionRef>,
  max_size: usize,
  /// Method of the request a request-handler response answers
  reply_to: Option<Code>,
}

/// A CoAP message shared between the user and the dispatcher.
///
/// Cloning a `Pdu` yields another handle to the same message.
#[derive(Debug, Clone)]
pub struct Pdu(Rc<RefCell<State>>);

impl Pdu {
  /// A PDU constructed by the user; not bound to any session
  pub(crate) fn unbound(msg: Message, max_size: usize) -> Self {
    Self(Rc::new(RefCell::new(State { msg: Some(msg),
                                      access: Access::Unrestricted,
                                      origin: Origin::None,
                                      session: None,
                                      max_size,
                                      reply_to: None })))
  }

  /// A PDU built by the dispatcher for a handler
  pub(crate) fn bound(msg: Message,
                      access: Access,
                      origin: Origin,
                      session: SessionRef,
                      max_size: usize)
                      -> Self {
    Self(Rc::new(RefCell::new(State { msg: Some(msg),
                                      access,
                                      origin,
                                      session: Some(session),
                                      max_size,
                                      reply_to: None })))
  }

  /// Remember the method this response answers, for [`Pdu::send`]'s default code
  pub(crate) fn replying_to(self, method: Code) -> Self {
    self.0.borrow_mut().reply_to = Some(method);
    self
  }

  /// Forbid any further use of this PDU
  pub(crate) fn lock(&self) {
    self.0.borrow_mut().access = Access::Locked;
  }

  /// Move the message out of this PDU, regardless of its access mode
  pub(crate) fn take_msg(&self) -> Option<Message> {
    self.0.borrow_mut().msg.take()
  }

  /// Attach a payload to a user-constructed PDU and
  /// copy out the message to be transmitted.
  pub(crate) fn prepare_send(&self, payload: Option<&[u8]>) -> Result<Message, Error> {
    if self.origin() != Origin::None {
      return Err(Error::invalid_argument("PDUs built for a handler cannot be sent through a connection"));
    }

    if let Some(payload) = payload {
      self.set_payload(payload)?;
    }

    self.read(Message::clone)
  }

  pub(crate) fn read<R>(&self, f: impl FnOnce(&Message) -> R) -> Result<R, Error> {
    let state = self.0.borrow();
    match (state.access, state.msg.as_ref()) {
      | (Access::Locked, _) | (_, None) => Err(Error::ObjectLocked),
      | (_, Some(msg)) => Ok(f(msg)),
    }
  }

  /// Apply a change to a copy of the message, keeping
  /// it only if it succeeded and the message still fits.
  fn write<R>(&self, f: impl FnOnce(&mut Message) -> Result<R, Error>) -> Result<R, Error> {
    let mut state = self.0.borrow_mut();
    match state.access {
      | Access::Locked => return Err(Error::ObjectLocked),
      | Access::ReadOnly => return Err(Error::ReadOnlyViolation),
      | Access::Unrestricted => (),
    }

    let max = state.max_size;
    let msg = state.msg.as_mut().ok_or(Error::ObjectLocked)?;

    let mut staged = msg.clone();
    let out = f(&mut staged)?;

    let size = staged.size();
    if size > max {
      return Err(Error::PduTooLarge { size, max });
    }

    *msg = staged;
    Ok(out)
  }

  /// Current access mode
  pub fn access(&self) -> Access {
    self.0.borrow().access
  }

  /// Which handler this PDU was built for
  pub fn origin(&self) -> Origin {
    self.0.borrow().origin
  }

  /// Largest size (in bytes) the message may grow to
  pub fn max_size(&self) -> usize {
    self.0.borrow().max_size
  }

  /// Size of the message on the wire, in bytes
  pub fn size(&self) -> Result<usize, Error> {
    self.read(Message::size)
  }

  /// Copy of the underlying message
  pub fn to_message(&self) -> Result<Message, Error> {
    self.read(Message::clone)
  }

  /// Message type
  pub fn ty(&self) -> Result<Type, Error> {
    self.read(|m| m.ty)
  }

  /// Change the message type
  pub fn set_type(&self, ty: Type) -> Result<(), Error> {
    self.write(|m| {
          m.ty = ty;
          Ok(())
        })
  }

  /// Method or response code
  pub fn code(&self) -> Result<Code, Error> {
    self.read(|m| m.code)
  }

  /// Change the method or response code
  pub fn set_code(&self, code: Code) -> Result<(), Error> {
    self.write(|m| {
          m.code = code;
          Ok(())
        })
  }

  /// Message id
  pub fn msg_id(&self) -> Result<Id, Error> {
    self.read(|m| m.id)
  }

  /// Change the message id
  pub fn set_msg_id(&self, id: Id) -> Result<(), Error> {
    self.write(|m| {
          m.id = id;
          Ok(())
        })
  }

  /// Token, or `None` if the token is empty
  pub fn token(&self) -> Result<Option<Token>, Error> {
    self.read(|m| Some(m.token).filter(|t| !t.is_empty()))
  }

  /// Change the token.
  ///
  /// The token must be set before any option or payload is added.
  pub fn set_token(&self, token: &[u8]) -> Result<(), Error> {
    self.write(|m| {
          if !m.opts.is_empty() || !m.payload.0.is_empty() {
            return Err(Error::TokenAfterOptions);
          }

          m.token = Token::try_from_slice(token).ok_or(Error::TokenTooLong(token.len()))?;
          Ok(())
        })
  }

  /// Decoded value of the first option numbered `number`,
  /// or `None` if the message has no such option.
  pub fn option(&self, number: OptNumber) -> Result<Option<Value>, Error> {
    self.read(|m| m.opts.get(number).map(|bytes| value::decode(number, bytes)))
  }

  /// Append an option.
  ///
  /// Options must be added in ascending option number order;
  /// an option may be added several times.
  pub fn set_option(&self, number: OptNumber, value: impl Into<Value>) -> Result<(), Error> {
    let bytes = value::encode(number, &value.into()).map_err(|e| encode_error(number, e))?;
    self.write(|m| m.opts.push(number, &bytes).map_err(|e| push_error(number, e)))
  }

  /// Content-Format of the payload, if the message has one.
  ///
  /// A Content-Format option wider than 16 bits is malformed
  /// and yields `None`.
  pub fn content_format(&self) -> Result<Option<ContentFormat>, Error> {
    let format = match self.option(no::CONTENT_FORMAT)? {
      | Some(Value::Uint(n)) => u16::try_from(n).ok().map(ContentFormat::from),
      | Some(Value::Empty) => Some(ContentFormat::from(0u16)),
      | _ => None,
    };

    Ok(format)
  }

  /// The non-empty segments of the `Uri-Path` options, or `None` if there are none
  pub fn uri_path_segments(&self) -> Result<Option<Vec<String>>, Error> {
    self.read(|m| {
          let segs = m.opts
                      .iter()
                      .map_while(Result::ok)
                      .filter(|(n, v)| *n == no::URI_PATH && !v.is_empty())
                      .map(|(_, v)| String::from_utf8_lossy(v).into_owned())
                      .collect::<Vec<_>>();

          Some(segs).filter(|s| !s.is_empty())
        })
  }

  /// The `Uri-Path` options joined as `/a/b/c`, or `None` if there are none
  pub fn uri_path(&self) -> Result<Option<String>, Error> {
    self.uri_path_segments()
        .map(|segs| segs.and_then(path::join))
  }

  /// Append one `Uri-Path` option per path segment
  ///
  /// ```
  /// # use toad_script::{code, Context, Type};
  /// # let ctx = Context::new(Default::default());
  /// let a = ctx.new_msg(Type::Con, code::GET, 1);
  /// let b = ctx.new_msg(Type::Con, code::GET, 1);
  ///
  /// a.set_uri_path("a//b/c").unwrap();
  /// b.set_uri_path(["a", "b", "c"]).unwrap();
  ///
  /// assert_eq!(a.to_message().unwrap(), b.to_message().unwrap());
  /// assert_eq!(a.uri_path_segments().unwrap(),
  ///            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]));
  /// ```
  pub fn set_uri_path(&self, path: impl IntoUriPath) -> Result<(), Error> {
    let segments = path.into_segments()
                       .into_iter()
                       .map(|seg| value::encode(no::URI_PATH, &Value::Str(seg)))
                       .collect::<Result<Vec<_>, _>>()
                       .map_err(|e| encode_error(no::URI_PATH, e))?;

    self.write(|m| {
          segments.iter().try_for_each(|seg| {
                            m.opts
                             .push(no::URI_PATH, seg)
                             .map_err(|e| push_error(no::URI_PATH, e))
                          })
        })
  }

  /// Iterate over the options of the message, decoded.
  ///
  /// If `filter` is not empty, only options whose number is in `filter` are yielded.
  pub fn options(&self, filter: &[OptNumber]) -> Result<Options, Error> {
    self.read(|_| ())?;
    Ok(Options::new(self.clone(), filter.to_vec()))
  }

  /// Iterate over the query string parameters in the `Uri-Query` options.
  ///
  /// If `names` is not empty, only parameters with one of these names
  /// are yielded. At most [`MAX_FILTER_NAMES`] names may be given.
  pub fn qstr_params<S: AsRef<str>>(&self, names: &[S]) -> Result<QueryParams, Error> {
    QueryParams::new(self.options(&[no::URI_QUERY])?, names)
  }

  /// The first query string parameter named `name`, or `None` if there is none
  pub fn qstr_param(&self, name: &str) -> Result<Option<QueryParam>, Error> {
    self.qstr_params(&[name]).map(|mut params| params.next())
  }

  /// Payload bytes, or `None` if the message has no payload
  pub fn payload(&self) -> Result<Option<Vec<u8>>, Error> {
    self.read(|m| Some(m.payload.0.clone()).filter(|p| !p.is_empty()))
  }

  /// Payload decoded as UTF-8, replacing invalid sequences
  pub fn payload_str(&self) -> Result<Option<String>, Error> {
    self.payload()
        .map(|p| p.map(|p| String::from_utf8_lossy(&p).into_owned()))
  }

  /// Replace the payload; an empty payload removes it
  pub fn set_payload(&self, payload: impl AsRef<[u8]>) -> Result<(), Error> {
    self.write(|m| {
          m.payload.0 = payload.as_ref().to_vec();
          Ok(())
        })
  }

  /// A connection to the session this PDU arrived on.
  ///
  /// The connection does not own the session; dropping it leaves the session be.
  pub fn connection(&self) -> Result<Connection, Error> {
    self.read(|_| ())?;

    let state = self.0.borrow();
    if state.origin == Origin::None {
      return Err(Error::Unavailable("get_connection"));
    }

    let session = state.session.as_ref().ok_or(Error::SessionClosed)?;
    let engine = session.engine.upgrade().ok_or(Error::SessionClosed)?;
    Ok(Connection::borrowed(engine, session.id))
  }

  /// Finish the response to a request.
  ///
  /// Only available on the response PDU handed to a request handler.
  /// If no code is given and none was set, the code defaults to the one
  /// conventional for the request's method (e.g. `2.05 Content` for `GET`).
  ///
  /// The response is transmitted once the handler returns,
  /// and the PDU may no longer be used.
  pub fn send(&self, code: Option<Code>, payload: Option<&[u8]>) -> Result<(), Error> {
    let reply_to = {
      let state = self.0.borrow();
      if state.access == Access::Locked {
        return Err(Error::ObjectLocked);
      }
      if state.origin != Origin::Request {
        return Err(Error::Unavailable("send"));
      }
      state.reply_to
    };

    self.write(|m| {
          if let Some(code) = code {
            m.code = code;
          }

          if let (true, Some(method)) = (m.code.is_empty(), reply_to) {
            m.code = default_response_code(method);
          }

          if let Some(payload) = payload {
            m.payload.0 = payload.to_vec();
          }

          Ok(())
        })?;

    self.lock();
    Ok(())
  }
}

fn encode_error(number: OptNumber, e: EncodeError) -> Error {
  match e {
    | EncodeError::InvalidArgument { expected } => {
      Error::invalid_argument(format!("option {} expects a {:?} value", number, expected))
    },
    | EncodeError::ValueTooLarge { size, max } => Error::ValueTooLarge { number, size, max },
  }
}

fn push_error(number: OptNumber, e: OptPushError) -> Error {
  match e {
    | OptPushError::OutOfOrder { last, number } => Error::OptionOrderViolation { last, number },
    | OptPushError::NumberTooLarge(n) => {
      Error::invalid_argument(format!("option number {} cannot be encoded", n))
    },
    | OptPushError::ValueTooLong { len, max } => Error::ValueTooLarge { number,
                                                                      size: len,
                                                                      max },
  }
}
