use std::cell::RefCell;
use std::net::{SocketAddr, UdpSocket};
use std::rc::Rc;

use log::LevelFilter;
use toad_pdu::{Code, Id, Message, Token, Type};

use crate::config::Config;
use crate::conn::Connection;
use crate::dispatch::{Dispatcher, Effect};
use crate::engine::{Engine, Event};
use crate::error::Error;
use crate::handler::{Callback,
                     Handler,
                     Kind,
                     NackHandler,
                     Registry,
                     RequestHandler,
                     ResponseHandler};
use crate::pdu::Pdu;
use crate::time::{StdClock, Timeout};
use crate::udp::UdpEngine;

/// Smallest maximum PDU size; a bare message header
const MIN_PDU_SIZE: usize = 4;

/// Owns an [`Engine`] and the handlers its events are dispatched to.
///
/// ```no_run
/// use toad_script::handler::Handler;
/// use toad_script::{code, Context};
///
/// let mut ctx = Context::new(Default::default());
///
/// let hello = Handler::request(|req, resp| {
///   match req.uri_path()?.as_deref() {
///     | Some("/hello") => resp.send(None, Some(b"hello, world!")),
///     | _ => resp.set_code(code::NOT_FOUND),
///   }
/// });
///
/// ctx.bind_server("0.0.0.0", 5683, Some(hello)).unwrap();
///
/// loop {
///   ctx.process_step(None).unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct Context {
  engine: Rc<RefCell<dyn Engine>>,
  config: Config,
  max_pdu_size: usize,
  registry: Registry,
  req_handler: Handler<RequestHandler>,
  resp_handler: Handler<ResponseHandler>,
  nack_handler: Handler<NackHandler>,
}

impl Context {
  /// Create a context speaking CoAP over UDP
  pub fn new(config: Config) -> Self {
    let engine = UdpEngine::<UdpSocket, StdClock>::new(config, StdClock::new());
    Self::with_engine(Rc::new(RefCell::new(engine)), config)
  }

  /// Create a context around some other engine
  pub fn with_engine(engine: Rc<RefCell<dyn Engine>>, config: Config) -> Self {
    engine.borrow_mut().set_log_level(config.engine_log_level);

    Self { engine,
           config,
           max_pdu_size: config.msg.max_pdu_size,
           registry: Registry::default(),
           req_handler: Handler::Default,
           resp_handler: Handler::Default,
           nack_handler: Handler::Default }
  }

  /// The runtime config this context was created with
  pub fn config(&self) -> &Config {
    &self.config
  }

  fn resolve(&self, addr: &str, port: i32) -> Result<SocketAddr, Error> {
    let port = u16::try_from(port).map_err(|_| {
                                    Error::invalid_argument(format!("port {} is not within 0-65535",
                                                                    port))
                                  })?;

    self.engine
        .borrow()
        .resolve(addr, port)
        .map_err(Error::from)
  }

  /// Listen for requests on a local interface.
  ///
  /// If a handler is given it replaces the request handler
  /// once the engine is listening.
  pub fn bind_server(&mut self,
                     addr: &str,
                     port: i32,
                     handler: Option<Handler<RequestHandler>>)
                     -> Result<(), Error> {
    let addr = self.resolve(addr, port)?;

    if let Some(handler) = handler.as_ref() {
      self.check(handler)?;
    }

    self.engine.borrow_mut().bind(addr)?;
    log::info!("listening on {}", addr);

    if let Some(handler) = handler {
      self.req_handler = handler;
    }

    Ok(())
  }

  /// Open a client session to a server.
  ///
  /// The session is released when the connection is dropped.
  pub fn new_connection(&self, addr: &str, port: i32) -> Result<Connection, Error> {
    let remote = self.resolve(addr, port)?;
    let session = self.engine.borrow_mut().connect(remote)?;
    log::debug!("{} opened to {}", session, remote);

    Ok(Connection::owned(self.engine.clone(), session))
  }

  /// Create a message to be sent with [`Connection::send`]
  pub fn new_msg(&self, ty: Type, code: Code, id: u16) -> Pdu {
    Pdu::unbound(Message::new(ty, code, Id(id), Token::empty()), self.max_pdu_size)
  }

  /// Largest size of messages created by [`Context::new_msg`]
  pub fn max_pdu_size(&self) -> usize {
    self.max_pdu_size
  }

  /// Change the largest size of messages created by [`Context::new_msg`] from now on
  pub fn set_max_pdu_size(&mut self, bytes: usize) -> Result<(), Error> {
    if bytes < MIN_PDU_SIZE {
      return Err(Error::invalid_argument(format!("max PDU size must be at least {} bytes",
                                                 MIN_PDU_SIZE)));
    }

    self.max_pdu_size = bytes;
    Ok(())
  }

  /// Verbosity of the engine's own logging
  pub fn engine_log_level(&self) -> LevelFilter {
    self.engine.borrow().log_level()
  }

  /// Change the verbosity of the engine's own logging
  pub fn set_engine_log_level(&mut self, level: LevelFilter) {
    self.engine.borrow_mut().set_log_level(level)
  }

  /// Register a callback that handlers may refer to by name
  pub fn register(&mut self, name: impl ToString, cb: Callback) -> Option<Callback> {
    self.registry.insert(name, cb)
  }

  /// Forget a named callback
  pub fn unregister(&mut self, name: &str) -> Option<Callback> {
    self.registry.remove(name)
  }

  fn check<F: Kind + ?Sized>(&self, handler: &Handler<F>) -> Result<(), Error> {
    match handler {
      | Handler::Named(name) => self.registry.named::<F>(name).map(|_| ()),
      | _ => Ok(()),
    }
  }

  /// The request handler
  pub fn req_handler(&self) -> &Handler<RequestHandler> {
    &self.req_handler
  }

  /// Replace the request handler
  pub fn set_req_handler(&mut self, handler: Handler<RequestHandler>) -> Result<(), Error> {
    self.check(&handler)?;
    self.req_handler = handler;
    Ok(())
  }

  /// The response handler
  pub fn resp_handler(&self) -> &Handler<ResponseHandler> {
    &self.resp_handler
  }

  /// Replace the response handler
  pub fn set_resp_handler(&mut self, handler: Handler<ResponseHandler>) -> Result<(), Error> {
    self.check(&handler)?;
    self.resp_handler = handler;
    Ok(())
  }

  /// The NACK handler
  pub fn nack_handler(&self) -> &Handler<NackHandler> {
    &self.nack_handler
  }

  /// Replace the NACK handler
  pub fn set_nack_handler(&mut self, handler: Handler<NackHandler>) -> Result<(), Error> {
    self.check(&handler)?;
    self.nack_handler = handler;
    Ok(())
  }

  fn handler<F: Kind + ?Sized>(&self, handler: &Handler<F>) -> Option<Rc<F>> {
    self.registry.resolve(handler).unwrap_or_else(|e| {
                                    log::warn!("{}", e);
                                    None
                                  })
  }

  /// Pump the engine once, invoking handlers for whatever happened.
  ///
  /// Waits at most `timeout` for something to happen
  /// (`None` waits indefinitely, zero or less does not wait).
  /// Yields the number of milliseconds spent.
  pub fn process_step(&mut self, timeout: Option<i64>) -> Result<u64, Error> {
    let step = self.engine.borrow_mut().step(Timeout::from(timeout))?;
    let dispatch = Dispatcher::new(&self.engine, self.max_pdu_size);

    step.events.into_iter().for_each(|event| {
                             let mut effects = vec![];

                             match event {
                               | Event::Request { session, msg } => {
                                 dispatch.request(self.handler(&self.req_handler),
                                                  session,
                                                  msg,
                                                  &mut effects)
                               },
                               | Event::Response { session,
                                                   sent,
                                                   received, } => {
                                 dispatch.response(self.handler(&self.resp_handler),
                                                   session,
                                                   sent,
                                                   received,
                                                   &mut effects)
                               },
                               | Event::Nack { session,
                                               sent,
                                               reason,
                                               id, } => dispatch.nack(self.handler(&self.nack_handler),
                                                                      session,
                                                                      sent,
                                                                      reason,
                                                                      id,
                                                                      &mut effects),
                             }

                             self.exec(effects);
                           });

    Ok(step.elapsed.0)
  }

  fn exec(&self, effects: Vec<Effect>) {
    effects.into_iter().for_each(|effect| match effect {
                         | Effect::Log(level, msg) => log::log!(level, "{}", msg),
                         | Effect::Send(session, msg) => {
                           if let Err(e) = self.engine.borrow_mut().send(session, msg) {
                             log::error!("{}: send failed: {}", session, e);
                           }
                         },
                       })
  }
}
