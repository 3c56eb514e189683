//! Turning engine [`Event`](crate::engine::Event)s into handler invocations.
//!
//! Dispatching an event never touches the network itself; it yields
//! [`Effect`]s that the [`Context`](crate::Context) then performs.

use std::cell::RefCell;
use std::rc::Rc;

use toad_pdu::{Code, Id, Message, Type};

use crate::engine::{Engine, NackReason, SessionId};
use crate::handler::{AckDecision, NackHandler, RequestHandler, ResponseHandler};
use crate::logging::msg_summary;
use crate::pdu::{Access, Origin, Pdu, SessionRef};

/// Side-effects that dispatching an event would like performed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
  Send(SessionId, Message),
  Log(log::Level, String),
}

/// Builds PDUs for events and invokes handlers with them
#[derive(Debug)]
pub(crate) struct Dispatcher<'a> {
  engine: &'a Rc<RefCell<dyn Engine>>,
  max_pdu_size: usize,
}

/// The PDUs built for one event; all of them are locked when this is dropped
struct Built(Vec<Pdu>);

impl Built {
  fn keep(&mut self, pdu: Pdu) -> Pdu {
    self.0.push(pdu.clone());
    pdu
  }
}

impl Drop for Built {
  fn drop(&mut self) {
    self.0.iter().for_each(Pdu::lock);
  }
}

impl<'a> Dispatcher<'a> {
  pub(crate) fn new(engine: &'a Rc<RefCell<dyn Engine>>, max_pdu_size: usize) -> Self {
    Self { engine,
           max_pdu_size }
  }

  fn pdu(&self, session: SessionId, msg: Message, access: Access, origin: Origin) -> Pdu {
    let max_size = self.engine
                       .borrow()
                       .session(session)
                       .map(|s| s.max_pdu_size)
                       .unwrap_or(self.max_pdu_size)
                       .max(msg.size());

    Pdu::bound(msg,
               access,
               origin,
               SessionRef::new(session, self.engine),
               max_size)
  }

  /// A peer sent us a request.
  ///
  /// The handler gets the request (read-only) and a response to fill in.
  /// A response with a code is sent once the handler returns; otherwise
  /// a CON request is acknowledged with an empty ACK.
  pub(crate) fn request(&self,
                        handler: Option<Rc<RequestHandler>>,
                        session: SessionId,
                        req: Message,
                        effects: &mut Vec<Effect>) {
    let (ty, id) = match req.ty {
      | Type::Con => (Type::Ack, req.id),
      | _ => match self.engine.borrow_mut().next_id(session) {
        | Ok(id) => (Type::Non, id),
        | Err(e) => {
          effects.push(Effect::Log(log::Level::Error,
                                   format!("{}: dropping request, no message id for response: {}",
                                           session, e)));
          return;
        },
      },
    };

    let mut built = Built(vec![]);
    let resp_msg = Message::new(ty, Code::EMPTY, id, req.token);
    let resp = built.keep(self.pdu(session, resp_msg, Access::Unrestricted, Origin::Request)
                              .replying_to(req.code));
    let req_pdu = built.keep(self.pdu(session, req.clone(), Access::ReadOnly, Origin::Request));

    match handler {
      | Some(f) => {
        if let Err(e) = f(&req_pdu, &resp) {
          effects.push(Effect::Log(log::Level::Error,
                                   format!("{}: request handler failed: {}", session, e)));
          return;
        }
      },
      | None => effects.push(Effect::Log(log::Level::Debug,
                                         format!("{}: no request handler", session))),
    }

    match resp.take_msg() {
      | Some(msg) if !msg.code.is_empty() => {
        effects.push(Effect::Log(log::Level::Trace,
                                 format!("{}: responding with {}", session, msg_summary(&msg))));
        effects.push(Effect::Send(session, msg));
      },
      | _ if req.ty == Type::Con => effects.push(Effect::Send(session, req.ack(req.id))),
      | _ => (),
    }
  }

  /// A peer sent us a response.
  ///
  /// A CON response is acknowledged unless the handler says not to.
  pub(crate) fn response(&self,
                         handler: Option<Rc<ResponseHandler>>,
                         session: SessionId,
                         sent: Option<Message>,
                         received: Message,
                         effects: &mut Vec<Effect>) {
    let mut built = Built(vec![]);
    let sent =
      sent.map(|msg| built.keep(self.pdu(session, msg, Access::ReadOnly, Origin::Response)));
    let got = built.keep(self.pdu(session, received.clone(), Access::ReadOnly, Origin::Response));

    let decision = match handler {
      | Some(f) => f(sent.as_ref(), &got).unwrap_or_else(|e| {
                                             effects.push(Effect::Log(log::Level::Error,
                                                                      format!("{}: response handler failed: {}",
                                                                              session, e)));
                                             AckDecision::Default
                                           }),
      | None => AckDecision::Default,
    };

    if let AckDecision::Unrecognized(ret) = &decision {
      effects.push(Effect::Log(log::Level::Warn,
                               format!("{}: response handler returned {}, expected a boolean; sending ACK",
                                       session, ret)));
    }

    if received.ty == Type::Con && decision.acks() {
      effects.push(Effect::Send(session, received.ack(received.id)));
    }
  }

  /// A message we sent was never acknowledged
  pub(crate) fn nack(&self,
                     handler: Option<Rc<NackHandler>>,
                     session: SessionId,
                     sent: Message,
                     reason: NackReason,
                     id: Id,
                     effects: &mut Vec<Effect>) {
    let mut built = Built(vec![]);
    let sent = built.keep(self.pdu(session, sent, Access::ReadOnly, Origin::Nack));

    effects.push(Effect::Log(log::Level::Debug,
                             format!("{}: message {:?} not acknowledged: {:?}",
                                     session, id, reason)));

    if let Some(Err(e)) = handler.map(|f| f(&sent, reason, id)) {
      effects.push(Effect::Log(log::Level::Error,
                               format!("{}: nack handler failed: {}", session, e)));
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use toad_pdu::Token;

  use super::*;
  use crate::code;
  use crate::error::Error;
  use crate::test::{dummy_addr, MockEngine};

  fn setup() -> (Rc<RefCell<dyn Engine>>, SessionId) {
    let mock = Rc::new(RefCell::new(MockEngine::new()));
    let session = mock.borrow_mut().add_session(dummy_addr());
    let engine: Rc<RefCell<dyn Engine>> = mock;
    (engine, session)
  }

  fn req(ty: Type, code: Code) -> Message {
    Message::new(ty, code, Id(10), Token::try_from_slice(&[7]).unwrap())
  }

  fn sends(effects: &[Effect]) -> Vec<Message> {
    effects.iter()
           .filter_map(|e| match e {
             | Effect::Send(_, m) => Some(m.clone()),
             | _ => None,
           })
           .collect()
  }

  #[test]
  fn request_piggybacked_response() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);
    let mut effects = vec![];

    let handler: Rc<RequestHandler> = Rc::new(|req: &Pdu, resp: &Pdu| {
      assert_eq!(req.access(), Access::ReadOnly);
      assert_eq!(req.set_payload(b"x"), Err(Error::ReadOnlyViolation));
      resp.set_payload(b"hello")?;
      resp.send(None, None)
    });

    dispatch.request(Some(handler), session, req(Type::Con, code::GET), &mut effects);

    let sent = sends(&effects);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].ty, Type::Ack);
    assert_eq!(sent[0].id, Id(10));
    assert_eq!(sent[0].code, code::CONTENT);
    assert_eq!(sent[0].token.as_bytes(), &[7]);
    assert_eq!(sent[0].payload.0, b"hello".to_vec());
  }

  #[test]
  fn request_code_without_send() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);
    let mut effects = vec![];

    let handler: Rc<RequestHandler> =
      Rc::new(|_: &Pdu, resp: &Pdu| resp.set_code(code::NOT_FOUND));
    dispatch.request(Some(handler), session, req(Type::Non, code::GET), &mut effects);

    let sent = sends(&effects);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].ty, Type::Non);
    assert_eq!(sent[0].id, Id(101));
    assert_eq!(sent[0].code, code::NOT_FOUND);
  }

  #[test]
  fn request_without_response() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);

    let mut effects = vec![];
    dispatch.request(None, session, req(Type::Con, code::GET), &mut effects);
    let sent = sends(&effects);
    assert_eq!(sent, vec![req(Type::Con, code::GET).ack(Id(10))]);

    let mut effects = vec![];
    dispatch.request(None, session, req(Type::Non, code::GET), &mut effects);
    assert!(sends(&effects).is_empty());
  }

  #[test]
  fn request_handler_failure_drops_event() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);
    let mut effects = vec![];

    let handler: Rc<RequestHandler> = Rc::new(|_: &Pdu, resp: &Pdu| {
      resp.set_code(code::CONTENT)?;
      Err(Error::callback("boom"))
    });
    dispatch.request(Some(handler), session, req(Type::Con, code::GET), &mut effects);

    assert!(sends(&effects).is_empty());
    assert!(effects.iter()
                   .any(|e| matches!(e, Effect::Log(log::Level::Error, _))));
  }

  #[test]
  fn handler_pdus_locked_after_dispatch() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);
    let kept: Rc<RefCell<Vec<Pdu>>> = Default::default();

    let kept_ = kept.clone();
    let handler: Rc<RequestHandler> = Rc::new(move |req: &Pdu, resp: &Pdu| {
      kept_.borrow_mut().extend([req.clone(), resp.clone()]);
      Ok(())
    });
    dispatch.request(Some(handler), session, req(Type::Con, code::GET), &mut vec![]);

    kept.borrow().iter().for_each(|pdu| {
                          assert_eq!(pdu.access(), Access::Locked);
                          assert_eq!(pdu.code(), Err(Error::ObjectLocked));
                        });
  }

  #[test]
  fn response_acks() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);
    let resp = Message::new(Type::Con, code::CONTENT, Id(33), Token::empty());

    let run = |decision: AckDecision, resp: Message| {
      let mut effects = vec![];
      let handler: Rc<ResponseHandler> = Rc::new(move |_: Option<&Pdu>, got: &Pdu| {
        assert_eq!(got.access(), Access::ReadOnly);
        Ok(decision.clone())
      });
      dispatch.response(Some(handler), session, None, resp, &mut effects);
      effects
    };

    let effects = run(AckDecision::Default, resp.clone());
    assert_eq!(sends(&effects), vec![resp.ack(Id(33))]);

    let effects = run(AckDecision::Send, resp.clone());
    assert_eq!(sends(&effects), vec![resp.ack(Id(33))]);

    let effects = run(AckDecision::Suppress, resp.clone());
    assert!(sends(&effects).is_empty());

    let effects = run(AckDecision::Unrecognized("42".into()), resp.clone());
    assert_eq!(sends(&effects), vec![resp.ack(Id(33))]);
    assert!(effects.iter()
                   .any(|e| matches!(e, Effect::Log(log::Level::Warn, _))));

    let mut non = resp;
    non.ty = Type::Non;
    let effects = run(AckDecision::Send, non);
    assert!(sends(&effects).is_empty());
  }

  #[test]
  fn response_gets_sent_request() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);
    let seen = Rc::new(Cell::new(false));

    let seen_ = seen.clone();
    let handler: Rc<ResponseHandler> = Rc::new(move |sent: Option<&Pdu>, _: &Pdu| {
      let sent = sent.ok_or(Error::callback("no request"))?;
      assert_eq!(sent.code()?, code::GET);
      assert_eq!(sent.origin(), Origin::Response);
      seen_.set(true);
      Ok(AckDecision::Default)
    });

    let resp = Message::new(Type::Ack, code::CONTENT, Id(10), Token::empty());
    dispatch.response(Some(handler),
                      session,
                      Some(req(Type::Con, code::GET)),
                      resp,
                      &mut vec![]);
    assert!(seen.get());
  }

  #[test]
  fn nack() {
    let (engine, session) = setup();
    let dispatch = Dispatcher::new(&engine, 1152);
    let got = Rc::new(Cell::new(None));

    let got_ = got.clone();
    let handler: Rc<NackHandler> = Rc::new(move |sent: &Pdu, reason: NackReason, id: Id| {
      assert_eq!(sent.origin(), Origin::Nack);
      assert_eq!(sent.set_code(code::PUT), Err(Error::ReadOnlyViolation));
      got_.set(Some((reason, id)));
      Ok(())
    });

    let mut effects = vec![];
    dispatch.nack(Some(handler),
                  session,
                  req(Type::Con, code::GET),
                  NackReason::TooManyRetries,
                  Id(10),
                  &mut effects);

    assert_eq!(got.get(), Some((NackReason::TooManyRetries, Id(10))));
    assert!(sends(&effects).is_empty());
  }
}
