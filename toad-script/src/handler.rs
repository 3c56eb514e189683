//! Handler callbacks & how they are bound to a [`Context`](crate::Context)

use std::collections::BTreeMap;
use std::rc::Rc;

use toad_pdu::Id;

use crate::engine::NackReason;
use crate::error::Error;
use crate::pdu::Pdu;

/// Invoked with a received request and the response to fill in
pub type RequestHandler = dyn Fn(&Pdu, &Pdu) -> Result<(), Error>;

/// Invoked with the request we sent (if it is known) and the response we got.
///
/// The returned [`AckDecision`] decides whether a CON response is acknowledged.
pub type ResponseHandler = dyn Fn(Option<&Pdu>, &Pdu) -> Result<AckDecision, Error>;

/// Invoked with a message that was not acknowledged, why, and its id
pub type NackHandler = dyn Fn(&Pdu, NackReason, Id) -> Result<(), Error>;

/// What a response handler wants done about acknowledging a CON response
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AckDecision {
  /// No preference; acknowledge
  Default,
  /// Acknowledge
  Send,
  /// Do not acknowledge
  Suppress,
  /// The handler returned something that is not a yes or no.
  ///
  /// Treated as [`AckDecision::Send`], with a warning.
  Unrecognized(String),
}

impl AckDecision {
  /// Whether an ACK should be sent
  pub fn acks(&self) -> bool {
    !matches!(self, AckDecision::Suppress)
  }
}

impl From<()> for AckDecision {
  fn from(_: ()) -> Self {
    AckDecision::Default
  }
}

impl From<bool> for AckDecision {
  fn from(ack: bool) -> Self {
    if ack {
      AckDecision::Send
    } else {
      AckDecision::Suppress
    }
  }
}

impl From<Option<bool>> for AckDecision {
  fn from(ack: Option<bool>) -> Self {
    ack.map(AckDecision::from).unwrap_or_default()
  }
}

impl Default for AckDecision {
  fn default() -> Self {
    AckDecision::Default
  }
}

/// A callback registered by name with [`Context::register`](crate::Context::register)
#[derive(Clone)]
pub enum Callback {
  /// See [`RequestHandler`]
  Request(Rc<RequestHandler>),
  /// See [`ResponseHandler`]
  Response(Rc<ResponseHandler>),
  /// See [`NackHandler`]
  Nack(Rc<NackHandler>),
}

impl Callback {
  /// Wrap a request handler
  pub fn request(f: impl Fn(&Pdu, &Pdu) -> Result<(), Error> + 'static) -> Self {
    Callback::Request(Rc::new(f))
  }

  /// Wrap a response handler
  pub fn response<R: Into<AckDecision>>(f: impl Fn(Option<&Pdu>, &Pdu) -> Result<R, Error> + 'static)
                                        -> Self {
    Callback::Response(Rc::new(move |sent: Option<&Pdu>, got: &Pdu| -> Result<AckDecision, Error> {
                                 f(sent, got).map(Into::into)
                               }))
  }

  /// Wrap a NACK handler
  pub fn nack(f: impl Fn(&Pdu, NackReason, Id) -> Result<(), Error> + 'static) -> Self {
    Callback::Nack(Rc::new(f))
  }

  fn kind(&self) -> &'static str {
    match self {
      | Callback::Request(_) => "request",
      | Callback::Response(_) => "response",
      | Callback::Nack(_) => "nack",
    }
  }
}

impl core::fmt::Debug for Callback {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "Callback::{}(..)", self.kind())
  }
}

/// The kinds of handler a [`Handler`] slot may hold
pub trait Kind {
  /// Name looked up in the [`Registry`] when a slot holds [`Handler::Default`]
  const DEFAULT_NAME: &'static str;

  /// The handler within a callback, if the callback is of this kind
  fn from_callback(cb: &Callback) -> Option<Rc<Self>>;
}

impl Kind for RequestHandler {
  const DEFAULT_NAME: &'static str = "coap_req_handler";

  fn from_callback(cb: &Callback) -> Option<Rc<Self>> {
    match cb {
      | Callback::Request(f) => Some(f.clone()),
      | _ => None,
    }
  }
}

impl Kind for ResponseHandler {
  const DEFAULT_NAME: &'static str = "coap_resp_handler";

  fn from_callback(cb: &Callback) -> Option<Rc<Self>> {
    match cb {
      | Callback::Response(f) => Some(f.clone()),
      | _ => None,
    }
  }
}

impl Kind for NackHandler {
  const DEFAULT_NAME: &'static str = "coap_nack_handler";

  fn from_callback(cb: &Callback) -> Option<Rc<Self>> {
    match cb {
      | Callback::Nack(f) => Some(f.clone()),
      | _ => None,
    }
  }
}

/// A handler slot of a [`Context`](crate::Context)
pub enum Handler<F: ?Sized> {
  /// Use whatever is registered under the default name
  /// (e.g. `coap_req_handler`) when an event arrives
  Default,
  /// A callback
  Callback(Rc<F>),
  /// The callback registered under this name
  Named(String),
}

impl Handler<RequestHandler> {
  /// A request handler slot holding `f`
  pub fn request(f: impl Fn(&Pdu, &Pdu) -> Result<(), Error> + 'static) -> Self {
    Handler::Callback(Rc::new(f))
  }
}

impl Handler<ResponseHandler> {
  /// A response handler slot holding `f`
  pub fn response<R: Into<AckDecision>>(f: impl Fn(Option<&Pdu>, &Pdu) -> Result<R, Error> + 'static)
                                        -> Self {
    Handler::Callback(Rc::new(move |sent: Option<&Pdu>, got: &Pdu| -> Result<AckDecision, Error> {
                                f(sent, got).map(Into::into)
                              }))
  }
}

impl Handler<NackHandler> {
  /// A NACK handler slot holding `f`
  pub fn nack(f: impl Fn(&Pdu, NackReason, Id) -> Result<(), Error> + 'static) -> Self {
    Handler::Callback(Rc::new(f))
  }
}

impl<F: ?Sized> Default for Handler<F> {
  fn default() -> Self {
    Handler::Default
  }
}

impl<F: ?Sized> Clone for Handler<F> {
  fn clone(&self) -> Self {
    match self {
      | Handler::Default => Handler::Default,
      | Handler::Callback(f) => Handler::Callback(f.clone()),
      | Handler::Named(n) => Handler::Named(n.clone()),
    }
  }
}

impl<F: ?Sized> core::fmt::Debug for Handler<F> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Handler::Default => write!(f, "Handler::Default"),
      | Handler::Callback(_) => write!(f, "Handler::Callback(..)"),
      | Handler::Named(n) => write!(f, "Handler::Named({:?})", n),
    }
  }
}

/// Callbacks registered by name
#[derive(Debug, Default, Clone)]
pub struct Registry(BTreeMap<String, Callback>);

impl Registry {
  /// Register a callback, yielding the one previously registered under `name`
  pub fn insert(&mut self, name: impl ToString, cb: Callback) -> Option<Callback> {
    self.0.insert(name.to_string(), cb)
  }

  /// Forget a callback
  pub fn remove(&mut self, name: &str) -> Option<Callback> {
    self.0.remove(name)
  }

  /// Look up a callback
  pub fn get(&self, name: &str) -> Option<&Callback> {
    self.0.get(name)
  }

  /// Look up a named callback of kind `F`
  pub fn named<F: Kind + ?Sized>(&self, name: &str) -> Result<Rc<F>, Error> {
    let cb = self.get(name)
                 .ok_or_else(|| Error::invalid_argument(format!("no callback named {:?}", name)))?;

    F::from_callback(cb).ok_or_else(|| {
                          Error::invalid_argument(format!("callback {:?} is a {} handler",
                                                          name,
                                                          cb.kind()))
                        })
  }

  /// The callback a slot refers to right now, if any
  pub fn resolve<F: Kind + ?Sized>(&self, handler: &Handler<F>) -> Result<Option<Rc<F>>, Error> {
    match handler {
      | Handler::Callback(f) => Ok(Some(f.clone())),
      | Handler::Named(name) => self.named(name).map(Some),
      | Handler::Default => Ok(self.get(F::DEFAULT_NAME).and_then(F::from_callback)),
    }
  }
}
