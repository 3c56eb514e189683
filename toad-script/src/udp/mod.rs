//! An [`Engine`] speaking CoAP over plain UDP.
//!
//! The engine owns up to two sockets:
//!  - the endpoint, bound by [`Engine::bind`], on which peers contact us
//!  - a client socket, bound to an ephemeral port on the first [`Engine::connect`]
//!
//! A session is opened for every peer that sends a datagram to the endpoint,
//! and for every [`Engine::connect`].
//!
//! Messages we send that expect an answer are kept in the session's outbound queue:
//!  - CON messages are retransmitted with exponential backoff until ACKed or reset
//!  - requests are kept (after being ACKed, for CON) until a response with the same token arrives
//!  - when retransmissions run out, or a response never arrives, the message is dropped

use std::collections::{BTreeMap, VecDeque};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use embedded_time::duration::Milliseconds;
use embedded_time::Instant;
use log::{Level, LevelFilter};
use rand::{Rng, SeedableRng};
use toad_pdu::{CodeKind, Id, Message, Token, TryFromBytes, Type};

use crate::config::{Con, Config};
use crate::engine::{Engine, Error, Event, NackReason, SessionId, SessionInfo, Step};
use crate::logging::msg_summary;
use crate::net::{Addrd, Socket, DGRAM_CAPACITY};
use crate::retry::{Attempts, RetryTimer, YouShould};
use crate::time::{millis_between, Clock, Timeout};

/// Number of message ids (and the replies we sent to them)
/// remembered per session for detecting duplicates
pub const DEDUP_WINDOW: usize = 16;

macro_rules! log_at {
  ($filter:expr, $level:expr, $($arg:tt)+) => {
    if $level <= $filter {
      log::log!(target: "toad_script::udp", $level, $($arg)+);
    }
  };
}

fn wall_clock_nanos() -> u64 {
  std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)
                              .map(|d| d.as_nanos() as u64)
                              .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Via {
  Endpoint,
  Client,
}

#[derive(Debug)]
struct Outbound<C: Clock> {
  msg: Message,
  since: Instant<C>,
  retry: Option<RetryTimer<C>>,
}

#[derive(Debug)]
struct Session<C: Clock> {
  info: SessionInfo,
  via: Via,
  next_id: Id,
  next_token: u64,
  seen: VecDeque<Id>,
  replies: VecDeque<Message>,
  outbound: Vec<Outbound<C>>,
}

impl<C: Clock> Session<C> {
  fn token(&mut self) -> Token {
    self.next_token = self.next_token.wrapping_add(1);
    Token::try_from_slice(&self.next_token.to_be_bytes()).unwrap_or_default()
  }

  /// Remember an inbound message id, yielding whether it was seen before
  fn seen(&mut self, id: Id) -> bool {
    if self.seen.contains(&id) {
      return true;
    }

    if self.seen.len() == DEDUP_WINDOW {
      self.seen.pop_front();
    }
    self.seen.push_back(id);
    false
  }

  fn remember_reply(&mut self, msg: Message) {
    if self.replies.len() == DEDUP_WINDOW {
      self.replies.pop_front();
    }
    self.replies.push_back(msg);
  }

  fn reply_to(&self, id: Id) -> Option<&Message> {
    self.replies.iter().rev().find(|r| r.id == id)
  }

  fn take_outbound(&mut self, f: impl Fn(&Message) -> bool) -> Option<Outbound<C>> {
    self.outbound
        .iter()
        .position(|o| f(&o.msg))
        .map(|ix| self.outbound.remove(ix))
  }

  /// Stop retransmitting a CON message, yielding whether one was waiting for this ACK.
  ///
  /// Requests stay queued until their response arrives.
  fn acked(&mut self, id: Id, now: Instant<C>) -> bool {
    let ix = match self.outbound
                       .iter()
                       .position(|o| o.msg.id == id && o.retry.is_some())
    {
      | Some(ix) => ix,
      | None => return false,
    };

    if self.outbound[ix].msg.code.kind() == CodeKind::Request {
      let out = &mut self.outbound[ix];
      out.retry = None;
      out.since = now;
    } else {
      self.outbound.remove(ix);
    }

    true
  }
}

#[derive(Debug)]
struct Sockets<S> {
  endpoint: Option<S>,
  client: Option<S>,
}

impl<S: Socket> Sockets<S> {
  fn get(&self, via: Via) -> Option<&S> {
    match via {
      | Via::Endpoint => self.endpoint.as_ref(),
      | Via::Client => self.client.as_ref(),
    }
  }

  fn local_addr(&self, via: Via) -> Result<SocketAddr, Error> {
    self.get(via)
        .ok_or(Error::NoEndpoint)?
        .local_addr()
        .map_err(Into::into)
  }

  fn send(&self, via: Via, msg: Addrd<&Message>) -> Result<(), Error> {
    let sock = self.get(via).ok_or(Error::NoEndpoint)?;
    let bytes = msg.data().to_bytes();
    nb::block!(sock.send(Addrd(bytes.as_slice(), msg.addr()))).map_err(Into::into)
  }
}

fn nack<C: Clock>(session: SessionId, out: Outbound<C>, reason: NackReason) -> Event {
  Event::Nack { session,
                id: out.msg.id,
                sent: out.msg,
                reason }
}

/// CoAP over UDP
///
/// ```no_run
/// use std::net::UdpSocket;
///
/// use toad_script::config::Config;
/// use toad_script::engine::Engine;
/// use toad_script::time::{StdClock, Timeout};
/// use toad_script::udp::UdpEngine;
///
/// let mut engine = UdpEngine::<UdpSocket, StdClock>::new(Config::default(), StdClock::new());
/// engine.bind("0.0.0.0:5683".parse().unwrap()).unwrap();
///
/// loop {
///   let step = engine.step(Timeout::Millis(1_000)).unwrap();
///   step.events.iter().for_each(|ev| println!("{:?}", ev));
/// }
/// ```
#[derive(Debug)]
pub struct UdpEngine<S: Socket, C: Clock> {
  config: Config,
  clock: C,
  sockets: Sockets<S>,
  sessions: BTreeMap<SessionId, Session<C>>,
  next_session: u32,
  log_level: LevelFilter,
}

impl<S: Socket, C: Clock> UdpEngine<S, C> {
  /// Create an engine. No sockets are bound until
  /// [`Engine::bind`] or [`Engine::connect`] is invoked.
  pub fn new(config: Config, clock: C) -> Self {
    Self { log_level: config.engine_log_level,
           config,
           clock,
           sockets: Sockets { endpoint: None,
                              client: None },
           sessions: BTreeMap::new(),
           next_session: 1 }
  }

  fn now(&self) -> Result<Instant<C>, Error> {
    self.clock.try_now().map_err(Into::into)
  }

  fn find_session(&self, via: Via, remote: SocketAddr) -> Option<SessionId> {
    self.sessions
        .iter()
        .find(|(_, s)| s.via == via && s.info.remote == remote)
        .map(|(id, _)| *id)
  }

  fn open_session(&mut self, via: Via, remote: SocketAddr) -> Result<SessionId, Error> {
    let local = self.sockets.local_addr(via)?;
    let id = SessionId(self.next_session);
    self.next_session = self.next_session.wrapping_add(1);

    let seed = wall_clock_nanos().wrapping_add(self.config.msg.id_seed as u64)
                                 .wrapping_add(id.0 as u64);
    let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(seed);

    let msg = self.config.msg;
    let session = Session { info: SessionInfo { local,
                                                remote,
                                                max_pdu_size: msg.max_pdu_size,
                                                max_retransmit: msg.con.max_retransmit.0,
                                                ack_timeout: msg.con.ack_timeout },
                            via,
                            next_id: Id(rand.gen()),
                            next_token: rand.gen(),
                            seen: VecDeque::with_capacity(DEDUP_WINDOW),
                            replies: VecDeque::with_capacity(DEDUP_WINDOW),
                            outbound: vec![] };

    self.sessions.insert(id, session);
    log_at!(self.log_level,
            Level::Debug,
            "{} opened: {} <-> {}",
            id,
            local,
            remote);
    Ok(id)
  }

  /// Largest datagram we may need to receive
  fn recv_capacity(&self) -> usize {
    self.sessions
        .values()
        .map(|s| s.info.max_pdu_size)
        .fold(self.config.msg.max_pdu_size.max(DGRAM_CAPACITY), usize::max)
  }

  /// Drain a socket, handling every datagram waiting on it.
  ///
  /// A datagram that cannot be handled is logged and dropped.
  fn poll(&mut self, via: Via, events: &mut Vec<Event>) {
    let capacity = self.recv_capacity();

    loop {
      let dgram = match self.sockets.get(via) {
        | Some(sock) => sock.poll(capacity),
        | None => return,
      };

      match dgram {
        | Ok(Some(dgram)) => {
          let addr = dgram.addr();
          if let Err(e) = self.receive(via, dgram, events) {
            log_at!(self.log_level,
                    Level::Warn,
                    "dropping datagram from {}: {}",
                    addr,
                    e);
          }
        },
        | Ok(None) => return,
        | Err(e) => {
          let e: Error = e.into();
          log_at!(self.log_level, Level::Warn, "{:?} socket: {}", via, e);
          return;
        },
      }
    }
  }

  fn receive(&mut self,
             via: Via,
             dgram: Addrd<Vec<u8>>,
             events: &mut Vec<Event>)
             -> Result<(), Error> {
    let addr = dgram.addr();
    let msg = match Message::try_from_bytes(dgram.data()) {
      | Ok(msg) => msg,
      | Err(e) => {
        log_at!(self.log_level,
                Level::Warn,
                "dropping malformed datagram from {}: {:?}",
                addr,
                e);
        return Ok(());
      },
    };

    let id = match self.find_session(via, addr) {
      | Some(id) => id,
      | None if via == Via::Endpoint => self.open_session(via, addr)?,
      | None => {
        log_at!(self.log_level,
                Level::Warn,
                "dropping datagram from unknown peer {}",
                addr);
        return Ok(());
      },
    };

    let now = self.now()?;
    let filter = self.log_level;
    log_at!(filter, Level::Trace, "{} <- {}", id, msg_summary(&msg));

    let session = match self.sessions.get_mut(&id) {
      | Some(s) => s,
      | None => return Ok(()),
    };

    let reply = match (msg.ty, msg.code.kind()) {
      | (Type::Reset, _) => {
        match session.take_outbound(|o| o.id == msg.id) {
          | Some(out) => events.push(nack(id, out, NackReason::Rst)),
          | None => log_at!(filter, Level::Debug, "{} reset for unknown {:?}", id, msg.id),
        }
        None
      },
      | (Type::Con, CodeKind::Empty) => Some(msg.reset()),
      | (Type::Ack, CodeKind::Empty) => {
        if !session.acked(msg.id, now) {
          log_at!(filter, Level::Debug, "{} ACK for unknown {:?}", id, msg.id);
        }
        None
      },
      | (Type::Ack, CodeKind::Response) => {
        match session.take_outbound(|o| o.id == msg.id && o.token == msg.token) {
          | Some(out) => events.push(Event::Response { session: id,
                                                       sent: Some(out.msg),
                                                       received: msg }),
          | None => log_at!(filter, Level::Debug, "{} ACK for unknown {:?}", id, msg.id),
        }
        None
      },
      | (Type::Con | Type::Non, _) if session.seen(msg.id) => {
        log_at!(filter, Level::Debug, "{} duplicate {:?}", id, msg.id);
        match msg.ty {
          | Type::Con => session.reply_to(msg.id).cloned(),
          | _ => None,
        }
      },
      | (Type::Con | Type::Non, CodeKind::Request) => {
        events.push(Event::Request { session: id, msg });
        None
      },
      | (Type::Con | Type::Non, CodeKind::Response) => {
        let sent = session.take_outbound(|o| {
                            o.code.kind() == CodeKind::Request && o.token == msg.token
                          });

        match sent {
          | Some(out) => {
            events.push(Event::Response { session: id,
                                          sent: Some(out.msg),
                                          received: msg });
            None
          },
          | None if msg.ty == Type::Con => {
            log_at!(filter,
                    Level::Debug,
                    "{} unexpected response {:?}, resetting",
                    id,
                    msg.id);
            Some(msg.reset())
          },
          | None => {
            log_at!(filter, Level::Debug, "{} unexpected response {:?}", id, msg.id);
            None
          },
        }
      },
      | _ => {
        log_at!(filter, Level::Debug, "{} ignoring {}", id, msg_summary(&msg));
        None
      },
    };

    if let Some(reply) = reply {
      if let Err(e) = self.sockets.send(via, Addrd(&reply, addr)) {
        log_at!(filter, Level::Warn, "{} could not reply: {}", id, e);
      }
    }

    Ok(())
  }

  /// Retransmit CON messages that are due, and give up on
  /// messages that were never answered.
  fn tick(&mut self, now: Instant<C>, events: &mut Vec<Event>) {
    let Milliseconds(lifetime) = self.config.msg.non_lifetime;
    let filter = self.log_level;
    let Self { sessions, sockets, .. } = self;

    for (&id, session) in sessions.iter_mut() {
      let (via, remote) = (session.via, session.info.remote);

      for mut out in core::mem::take(&mut session.outbound) {
        match out.retry.as_mut().map(|r| r.what_should_i_do(now)) {
          | Some(Ok(YouShould::Retry)) => match sockets.send(via, Addrd(&out.msg, remote)) {
            | Ok(()) => {
              log_at!(filter, Level::Debug, "{} retransmitting {:?}", id, out.msg.id);
              session.outbound.push(out);
            },
            | Err(e) => {
              log_at!(filter, Level::Warn, "{} retransmit failed: {}", id, e);
              events.push(nack(id, out, NackReason::NotDeliverable));
            },
          },
          | Some(Ok(YouShould::Cry)) => {
            log_at!(filter, Level::Debug, "{} {:?} never acknowledged", id, out.msg.id);
            events.push(nack(id, out, NackReason::TooManyRetries));
          },
          | Some(Err(nb::Error::WouldBlock)) => session.outbound.push(out),
          | Some(Err(nb::Error::Other(never))) => match never {},
          | None if millis_between(out.since, now) >= lifetime => {
            log_at!(filter, Level::Debug, "{} no response to {:?}", id, out.msg.id);
          },
          | None => session.outbound.push(out),
        }
      }
    }
  }
}

impl<S, C> Engine for UdpEngine<S, C>
  where S: Socket,
        C: Clock + core::fmt::Debug
{
  fn bind(&mut self, addr: SocketAddr) -> Result<(), Error> {
    let sock = S::bind_raw(addr).map_err(Into::<Error>::into)?;
    self.sockets.endpoint = Some(sock);
    log_at!(self.log_level, Level::Info, "listening on {}", addr);
    Ok(())
  }

  fn connect(&mut self, remote: SocketAddr) -> Result<SessionId, Error> {
    if self.sockets.client.is_none() {
      let any: SocketAddr = if remote.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
      } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
      };

      self.sockets.client = Some(S::bind_raw(any).map_err(Into::<Error>::into)?);
    }

    self.open_session(Via::Client, remote)
  }

  fn release(&mut self, session: SessionId) {
    if let Some(s) = self.sessions.remove(&session) {
      log_at!(self.log_level,
              Level::Debug,
              "{} released, dropping {} outstanding",
              session,
              s.outbound.len());
    }
  }

  fn session(&self, session: SessionId) -> Option<&SessionInfo> {
    self.sessions.get(&session).map(|s| &s.info)
  }

  fn session_mut(&mut self, session: SessionId) -> Option<&mut SessionInfo> {
    self.sessions.get_mut(&session).map(|s| &mut s.info)
  }

  fn next_id(&mut self, session: SessionId) -> Result<Id, Error> {
    let s = self.sessions
                .get_mut(&session)
                .ok_or(Error::UnknownSession)?;
    s.next_id = s.next_id.next();
    Ok(s.next_id)
  }

  fn send(&mut self, session: SessionId, mut msg: Message) -> Result<Id, Error> {
    let now = self.now()?;
    let s = self.sessions
                .get_mut(&session)
                .ok_or(Error::UnknownSession)?;

    let request = msg.code.kind() == CodeKind::Request;
    if request && msg.token.is_empty() {
      msg.token = s.token();
    }

    let (size, max) = (msg.size(), s.info.max_pdu_size);
    if size > max {
      return Err(Error::MessageTooLarge { size, max });
    }

    self.sockets.send(s.via, Addrd(&msg, s.info.remote))?;
    log_at!(self.log_level,
            Level::Trace,
            "{} -> {}",
            session,
            msg_summary(&msg));

    let id = msg.id;
    match msg.ty {
      | Type::Con => {
        let seed = ((session.0 as u64) << 16) | id.0 as u64;
        let retry = RetryTimer::new(now,
                                    Con::strategy(s.info.ack_timeout),
                                    Attempts(s.info.max_retransmit),
                                    seed);
        s.outbound.push(Outbound { msg,
                                   since: now,
                                   retry: Some(retry) });
      },
      | Type::Non if request => s.outbound.push(Outbound { msg,
                                                           since: now,
                                                           retry: None }),
      | Type::Ack | Type::Reset => s.remember_reply(msg),
      | Type::Non => (),
    }

    Ok(id)
  }

  fn step(&mut self, timeout: Timeout) -> Result<Step, Error> {
    let start = self.now()?;
    let mut events = vec![];

    loop {
      self.poll(Via::Endpoint, &mut events);
      self.poll(Via::Client, &mut events);

      let now = self.now()?;
      self.tick(now, &mut events);

      let elapsed = millis_between(start, now);
      let timed_out = match timeout {
        | Timeout::Millis(ms) => elapsed >= ms,
        | Timeout::Never => false,
      };

      if timed_out || !events.is_empty() {
        return Ok(Step { elapsed: Milliseconds(elapsed),
                         events });
      }

      std::thread::sleep(std::time::Duration::from_millis(self.config.poll_interval.0));
    }
  }

  fn log_level(&self) -> LevelFilter {
    self.log_level
  }

  fn set_log_level(&mut self, level: LevelFilter) {
    self.log_level = level;
  }
}

#[cfg(test)]
mod tests {
  use toad_pdu::Code;

  use super::*;
  use crate::code;
  use crate::test::{dummy_addr, dummy_addr_2, init_logger, ClockMock, SockMock};

  type Mock = UdpEngine<SockMock, ClockMock>;

  fn server() -> Mock {
    let mut engine = Mock::new(Config::default(), ClockMock::new());
    engine.bind("0.0.0.0:5683".parse().unwrap()).unwrap();
    engine
  }

  fn client() -> (Mock, SessionId) {
    let mut engine = Mock::new(Config::default(), ClockMock::new());
    let session = engine.connect(dummy_addr()).unwrap();
    (engine, session)
  }

  fn endpoint(engine: &Mock) -> &SockMock {
    engine.sockets.endpoint.as_ref().unwrap()
  }

  fn client_sock(engine: &Mock) -> &SockMock {
    engine.sockets.client.as_ref().unwrap()
  }

  fn step(engine: &mut Mock) -> Vec<Event> {
    engine.step(Timeout::NONBLOCKING).unwrap().events
  }

  fn token(bytes: &[u8]) -> Token {
    Token::try_from_slice(bytes).unwrap()
  }

  /// Send a CON GET on a client session, yielding what went out on the wire
  fn send_get(engine: &mut Mock, session: SessionId) -> Message {
    let req = Message::new(Type::Con, code::GET, Id(1), Token::empty());
    assert_eq!(engine.send(session, req).unwrap(), Id(1));

    let mut sent = client_sock(engine).take_sent();
    assert_eq!(sent.len(), 1);
    sent.remove(0).unwrap()
  }

  #[test]
  fn ping_is_reset() {
    let mut engine = server();
    let ping = Message::new(Type::Con, Code::EMPTY, Id(3), Token::empty());
    endpoint(&engine).push_msg(dummy_addr(), &ping);

    let step = engine.step(Timeout::NONBLOCKING).unwrap();
    assert!(step.events.is_empty());
    assert_eq!(step.elapsed, Milliseconds(0u64));

    let sent = endpoint(&engine).take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].addr(), dummy_addr());
    assert_eq!(sent[0].data().ty, Type::Reset);
    assert_eq!(sent[0].data().id, Id(3));
  }

  #[test]
  fn requests_open_sessions() {
    let mut engine = server();
    let req = Message::new(Type::Non, code::GET, Id(9), token(&[1]));
    endpoint(&engine).push_msg(dummy_addr(), &req);

    let events = step(&mut engine);
    let session = match &events[..] {
      | [Event::Request { session, msg }] => {
        assert_eq!(msg, &req);
        *session
      },
      | other => panic!("{:?}", other),
    };

    let info = engine.session(session).unwrap();
    assert_eq!(info.remote, dummy_addr());
    assert_eq!(info.local, "0.0.0.0:5683".parse().unwrap());
    assert_eq!(info.max_pdu_size, 1152);
  }

  #[test]
  fn session_per_peer() {
    let mut engine = server();
    let req = Message::new(Type::Non, code::GET, Id(1), Token::empty());
    endpoint(&engine).push_msg(dummy_addr(), &req);
    endpoint(&engine).push_msg(dummy_addr_2(), &req);
    endpoint(&engine).push_msg(dummy_addr(), &Message { id: Id(2), ..req.clone() });

    let sessions = step(&mut engine).into_iter()
                                    .map(|ev| match ev {
                                      | Event::Request { session, .. } => session,
                                      | other => panic!("{:?}", other),
                                    })
                                    .collect::<Vec<_>>();

    assert_eq!(sessions.len(), 3);
    assert_ne!(sessions[0], sessions[1]);
    assert_eq!(sessions[0], sessions[2]);
    assert_eq!(engine.session(sessions[1]).unwrap().remote, dummy_addr_2());
  }

  #[test]
  fn bad_datagram_does_not_drop_the_rest() {
    let mut engine = server();
    let req = Message::new(Type::Non, code::GET, Id(1), Token::empty());
    endpoint(&engine).push_msg(dummy_addr(), &req);
    let session = match &step(&mut engine)[..] {
      | [Event::Request { session, .. }] => *session,
      | other => panic!("{:?}", other),
    };

    // a new peer needs a session, which needs the endpoint's address
    *endpoint(&engine).lost_addr.lock().unwrap() = true;
    endpoint(&engine).push_msg(dummy_addr(), &Message { id: Id(2), ..req.clone() });
    endpoint(&engine).push_msg(dummy_addr_2(), &req);
    endpoint(&engine).push_msg(dummy_addr(), &Message { id: Id(3), ..req.clone() });

    let ids = step(&mut engine).into_iter()
                               .map(|ev| match ev {
                                 | Event::Request { session: s, msg } => {
                                   assert_eq!(s, session);
                                   msg.id
                                 },
                                 | other => panic!("{:?}", other),
                               })
                               .collect::<Vec<_>>();

    assert_eq!(ids, vec![Id(2), Id(3)]);
    assert_eq!(engine.sessions.len(), 1);
  }

  #[test]
  fn receives_datagrams_up_to_max_pdu_size() {
    let mut config = Config::default();
    config.msg.max_pdu_size = 4096;
    let mut engine = Mock::new(config, ClockMock::new());
    engine.bind("0.0.0.0:5683".parse().unwrap()).unwrap();

    let mut req = Message::new(Type::Non, code::POST, Id(1), Token::empty());
    req.payload.0.extend_from_slice(&[1u8; 3000]);
    endpoint(&engine).push_msg(dummy_addr(), &req);

    match &step(&mut engine)[..] {
      | [Event::Request { msg, .. }] => assert_eq!(msg, &req),
      | other => panic!("{:?}", other),
    }
  }

  #[test]
  fn sessions_seeded_from_wall_clock() {
    let (mut a, a_session) = client();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let (mut b, b_session) = client();

    assert_ne!(send_get(&mut a, a_session).token,
               send_get(&mut b, b_session).token);
  }

  #[test]
  fn duplicates_get_the_same_reply() {
    let mut engine = server();
    let req = Message::new(Type::Con, code::GET, Id(9), token(&[1]));
    endpoint(&engine).push_msg(dummy_addr(), &req);
    endpoint(&engine).push_msg(dummy_addr(), &req);

    let events = step(&mut engine);
    assert_eq!(events.len(), 1);
    let session = match &events[0] {
      | Event::Request { session, .. } => *session,
      | other => panic!("{:?}", other),
    };
    assert!(endpoint(&engine).take_sent().is_empty());

    let mut resp = Message::new(Type::Ack, code::CONTENT, Id(9), token(&[1]));
    resp.payload.0.extend_from_slice(b"hi");
    engine.send(session, resp.clone()).unwrap();
    assert_eq!(endpoint(&engine).take_sent().len(), 1);

    endpoint(&engine).push_msg(dummy_addr(), &req);
    assert!(step(&mut engine).is_empty());

    let sent = endpoint(&engine).take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data(), &resp);
  }

  #[test]
  fn requests_get_tokens() {
    let (mut engine, session) = client();
    let sent = send_get(&mut engine, session);
    assert_eq!(sent.token.len(), 8);

    let next = send_get(&mut engine, session);
    assert_ne!(sent.token, next.token);
  }

  #[test]
  fn con_retransmitted_then_nacked() {
    init_logger();
    let (mut engine, session) = client();
    engine.set_log_level(LevelFilter::Trace);
    let info = engine.session_mut(session).unwrap();
    info.max_retransmit = 1;
    info.ack_timeout = Milliseconds(1_000);

    let sent = send_get(&mut engine, session);

    engine.clock.advance_millis(999);
    assert!(step(&mut engine).is_empty());
    assert!(client_sock(&engine).take_sent().is_empty());

    engine.clock.advance_millis(501);
    assert!(step(&mut engine).is_empty());
    let resent = client_sock(&engine).take_sent();
    assert_eq!(resent.len(), 1);
    assert_eq!(resent[0].data(), &sent);

    engine.clock.advance_millis(3_000);
    assert_eq!(step(&mut engine),
               vec![Event::Nack { session,
                                  id: Id(1),
                                  sent,
                                  reason: NackReason::TooManyRetries }]);
    assert!(engine.sessions[&session].outbound.is_empty());
  }

  #[test]
  fn retransmit_failure_not_deliverable() {
    let (mut engine, session) = client();
    let sent = send_get(&mut engine, session);

    *client_sock(&engine).broken.lock().unwrap() = true;
    engine.clock.advance_millis(3_000);

    assert_eq!(step(&mut engine),
               vec![Event::Nack { session,
                                  id: Id(1),
                                  sent,
                                  reason: NackReason::NotDeliverable }]);
  }

  #[test]
  fn piggybacked_response() {
    let (mut engine, session) = client();
    let sent = send_get(&mut engine, session);

    let resp = Message::new(Type::Ack, code::CONTENT, Id(1), sent.token);
    client_sock(&engine).push_msg(dummy_addr(), &resp);

    assert_eq!(step(&mut engine),
               vec![Event::Response { session,
                                      sent: Some(sent),
                                      received: resp }]);
    assert!(engine.sessions[&session].outbound.is_empty());
  }

  #[test]
  fn separate_response() {
    let (mut engine, session) = client();
    let sent = send_get(&mut engine, session);

    client_sock(&engine).push_msg(dummy_addr(), &sent.ack(sent.id));
    assert!(step(&mut engine).is_empty());

    // ACKed; no longer retransmitted
    engine.clock.advance_millis(10_000);
    assert!(step(&mut engine).is_empty());
    assert!(client_sock(&engine).take_sent().is_empty());

    let resp = Message::new(Type::Con, code::CONTENT, Id(77), sent.token);
    client_sock(&engine).push_msg(dummy_addr(), &resp);

    assert_eq!(step(&mut engine),
               vec![Event::Response { session,
                                      sent: Some(sent),
                                      received: resp }]);
  }

  #[test]
  fn unexpected_con_response_is_reset() {
    let mut engine = server();
    let resp = Message::new(Type::Con, code::CONTENT, Id(5), token(&[9]));
    endpoint(&engine).push_msg(dummy_addr(), &resp);

    assert!(step(&mut engine).is_empty());

    let sent = endpoint(&engine).take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data().ty, Type::Reset);
    assert_eq!(sent[0].data().id, Id(5));
  }

  #[test]
  fn reset_nacks() {
    let (mut engine, session) = client();
    let sent = send_get(&mut engine, session);

    client_sock(&engine).push_msg(dummy_addr(), &sent.reset());
    assert_eq!(step(&mut engine),
               vec![Event::Nack { session,
                                  id: Id(1),
                                  sent,
                                  reason: NackReason::Rst }]);
  }

  #[test]
  fn non_requests_expire() {
    let (mut engine, session) = client();
    let req = Message::new(Type::Non, code::GET, Id(4), Token::empty());
    engine.send(session, req).unwrap();
    assert_eq!(engine.sessions[&session].outbound.len(), 1);

    engine.clock.advance_millis(engine.config.msg.non_lifetime.0);
    assert!(step(&mut engine).is_empty());
    assert!(engine.sessions[&session].outbound.is_empty());
  }

  #[test]
  fn datagrams_from_strangers_dropped() {
    let (mut engine, _) = client();
    let stranger: SocketAddr = "10.0.0.1:5683".parse().unwrap();
    let req = Message::new(Type::Con, code::GET, Id(1), Token::empty());
    client_sock(&engine).push_msg(stranger, &req);

    assert!(step(&mut engine).is_empty());
    assert_eq!(engine.sessions.len(), 1);
  }

  #[test]
  fn too_large() {
    let (mut engine, session) = client();
    engine.session_mut(session).unwrap().max_pdu_size = 16;

    let mut msg = Message::new(Type::Non, code::CONTENT, Id(1), Token::empty());
    msg.payload.0.extend_from_slice(&[0u8; 32]);

    assert!(matches!(engine.send(session, msg),
                     Err(Error::MessageTooLarge { max: 16, .. })));
    assert!(client_sock(&engine).take_sent().is_empty());
  }

  #[test]
  fn ids_and_sessions() {
    let (mut engine, session) = client();
    let a = engine.next_id(session).unwrap();
    let b = engine.next_id(session).unwrap();
    assert_eq!(b, a.next());

    engine.release(session);
    assert!(engine.session(session).is_none());
    assert_eq!(engine.next_id(session), Err(Error::UnknownSession));
    assert_eq!(engine.send(session, Message::new(Type::Non, code::GET, Id(1), Token::empty())),
               Err(Error::UnknownSession));
  }

  #[test]
  fn log_level() {
    let mut engine = server();
    assert_eq!(engine.log_level(), LevelFilter::Warn);
    engine.set_log_level(LevelFilter::Trace);
    assert_eq!(engine.log_level(), LevelFilter::Trace);
  }
}
