#![allow(dead_code)]

use ::core::cell::Cell;
use ::std::collections::{BTreeMap, VecDeque};
use ::std::io;
use ::std::net::SocketAddr;
use ::std::sync::{Arc, Mutex};

use embedded_time::duration::Milliseconds;
use embedded_time::rate::Fraction;
use embedded_time::Instant;
use log::LevelFilter;
use toad_pdu::{Id, Message, TryFromBytes};

use crate::engine::{self, Engine, Event, SessionId, SessionInfo, Step};
use crate::net::{Addrd, Socket};
use crate::time::Timeout;

pub fn dummy_addr() -> SocketAddr {
  "192.168.0.1:8080".parse().unwrap()
}

pub fn dummy_addr_2() -> SocketAddr {
  "192.168.0.2:8080".parse().unwrap()
}

pub fn init_logger() {
  simple_logger::init_with_level(log::Level::Trace).ok();
}

/// A clock that only moves when told to, ticking in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockMock(pub Cell<u64>);

impl ClockMock {
  pub fn new() -> Self {
    Self(Cell::new(0))
  }

  pub fn set_millis(&self, to: u64) {
    self.0.set(to);
  }

  pub fn advance_millis(&self, by: u64) {
    self.0.set(self.0.get() + by);
  }
}

impl embedded_time::Clock for ClockMock {
  type T = u64;

  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000);

  fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
    Ok(Instant::new(self.0.get()))
  }
}

pub type Dgrams = Arc<Mutex<Vec<Addrd<Vec<u8>>>>>;

/// A mocked socket
#[derive(Debug)]
pub struct SockMock {
  pub addr: SocketAddr,
  /// Inbound bytes from remote sockets. Address represents the sender
  pub rx: Dgrams,
  /// Outbound bytes to remote sockets. Address represents the destination
  pub tx: Dgrams,
  /// When set, every send fails
  pub broken: Arc<Mutex<bool>>,
  /// When set, asking for the local address fails
  pub lost_addr: Arc<Mutex<bool>>,
}

impl SockMock {
  pub fn new(addr: SocketAddr) -> Self {
    Self { addr,
           rx: Default::default(),
           tx: Default::default(),
           broken: Default::default(),
           lost_addr: Default::default() }
  }

  pub fn push_msg(&self, from: SocketAddr, msg: &Message) {
    self.rx.lock().unwrap().push(Addrd(msg.to_bytes(), from));
  }

  pub fn take_sent(&self) -> Vec<Addrd<Message>> {
    self.tx
        .lock()
        .unwrap()
        .drain(..)
        .map(|dgram| dgram.map(|bytes| Message::try_from_bytes(bytes).unwrap()))
        .collect()
  }
}

impl Socket for SockMock {
  type Error = io::Error;

  fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
    if *self.lost_addr.lock().unwrap() {
      return Err(io::Error::from(io::ErrorKind::NotConnected));
    }

    Ok(self.addr)
  }

  fn bind_raw(addr: SocketAddr) -> Result<Self, Self::Error> {
    Ok(Self::new(addr))
  }

  fn recv(&self, buf: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    let mut rx = self.rx.lock().unwrap();

    if rx.is_empty() {
      return Err(nb::Error::WouldBlock);
    }

    let dgram = rx.remove(0);
    let n = dgram.data().len().min(buf.len());
    buf[..n].copy_from_slice(&dgram.data()[..n]);

    Ok(dgram.map(|_| n))
  }

  fn send(&self, buf: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    if *self.broken.lock().unwrap() {
      return Err(nb::Error::Other(io::Error::from(io::ErrorKind::ConnectionRefused)));
    }

    self.tx.lock().unwrap().push(buf.map(Vec::from));
    Ok(())
  }
}

/// An engine that records what it is asked to do
/// and replays queued events.
#[derive(Debug)]
pub struct MockEngine {
  pub local: SocketAddr,
  pub bound: Vec<SocketAddr>,
  pub sessions: BTreeMap<SessionId, SessionInfo>,
  pub released: Vec<SessionId>,
  pub sent: Vec<(SessionId, Message)>,
  pub steps: VecDeque<Vec<Event>>,
  pub timeouts: Vec<Timeout>,
  pub next_session: u32,
  pub next_id: u16,
  pub log_level: LevelFilter,
  pub fail_send: bool,
  pub fail_bind: bool,
}

impl MockEngine {
  pub fn new() -> Self {
    Self { local: "127.0.0.1:5683".parse().unwrap(),
           bound: vec![],
           sessions: BTreeMap::new(),
           released: vec![],
           sent: vec![],
           steps: VecDeque::new(),
           timeouts: vec![],
           next_session: 1,
           next_id: 100,
           log_level: LevelFilter::Warn,
           fail_send: false,
           fail_bind: false }
  }

  /// Create a session as though a peer had contacted us
  pub fn add_session(&mut self, remote: SocketAddr) -> SessionId {
    let id = SessionId(self.next_session);
    self.next_session += 1;
    self.sessions.insert(id,
                         SessionInfo { local: self.local,
                                       remote,
                                       max_pdu_size: 1152,
                                       max_retransmit: 4,
                                       ack_timeout: Milliseconds(2_000) });
    id
  }

  /// Queue events to be yielded by the next call to `step`
  pub fn queue(&mut self, events: Vec<Event>) {
    self.steps.push_back(events);
  }
}

impl Engine for MockEngine {
  fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, engine::Error> {
    host.parse::<std::net::IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .map_err(|_| engine::Error::Resolve(host.to_string()))
  }

  fn bind(&mut self, addr: SocketAddr) -> Result<(), engine::Error> {
    if self.fail_bind {
      return Err(engine::Error::Io(io::ErrorKind::AddrInUse));
    }

    self.bound.push(addr);
    Ok(())
  }

  fn connect(&mut self, remote: SocketAddr) -> Result<SessionId, engine::Error> {
    Ok(self.add_session(remote))
  }

  fn release(&mut self, session: SessionId) {
    self.sessions.remove(&session);
    self.released.push(session);
  }

  fn session(&self, session: SessionId) -> Option<&SessionInfo> {
    self.sessions.get(&session)
  }

  fn session_mut(&mut self, session: SessionId) -> Option<&mut SessionInfo> {
    self.sessions.get_mut(&session)
  }

  fn next_id(&mut self, session: SessionId) -> Result<Id, engine::Error> {
    self.session(session).ok_or(engine::Error::UnknownSession)?;
    self.next_id += 1;
    Ok(Id(self.next_id))
  }

  fn send(&mut self, session: SessionId, msg: Message) -> Result<Id, engine::Error> {
    if self.fail_send {
      return Err(engine::Error::Io(io::ErrorKind::ConnectionRefused));
    }

    self.session(session).ok_or(engine::Error::UnknownSession)?;
    let id = msg.id;
    self.sent.push((session, msg));
    Ok(id)
  }

  fn step(&mut self, timeout: Timeout) -> Result<Step, engine::Error> {
    self.timeouts.push(timeout);
    Ok(Step { elapsed: Milliseconds(1),
              events: self.steps.pop_front().unwrap_or_default() })
  }

  fn log_level(&self) -> LevelFilter {
    self.log_level
  }

  fn set_log_level(&mut self, level: LevelFilter) {
    self.log_level = level;
  }
}
