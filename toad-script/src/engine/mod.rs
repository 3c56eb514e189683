//! The interface between this crate and the CoAP engine that owns
//! sockets, sessions and retransmission timers.
//!
//! [`Context`](crate::Context) drives an [`Engine`]: it hands it messages
//! to transmit and pumps it with [`Engine::step`], receiving
//! [`Event`]s in return that it dispatches to handlers.
//!
//! [`UdpEngine`](crate::udp::UdpEngine) is an engine that speaks
//! CoAP over plain UDP.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use log::LevelFilter;
use toad_pdu::{Id, Message};

use crate::time::{Millis, Timeout};

/// Identifies a session (a local endpoint paired with a remote peer)
/// owned by an [`Engine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u32);

impl core::fmt::Display for SessionId {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "session#{}", self.0)
  }
}

/// Properties of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionInfo {
  /// Address of our side of the session
  pub local: SocketAddr,
  /// Address of the peer
  pub remote: SocketAddr,
  /// Largest message the session will transmit
  pub max_pdu_size: usize,
  /// Number of retransmissions of an unacknowledged CON message
  pub max_retransmit: u32,
  /// Initial ACK timeout for CON messages
  pub ack_timeout: Millis,
}

/// Why a message we sent was not acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NackReason {
  /// Retransmissions were exhausted without an ACK
  TooManyRetries,
  /// The message could not be handed to the network
  NotDeliverable,
  /// The peer answered with a reset
  Rst,
  /// The secure transport could not be established
  TlsFailed,
  /// An ICMP error was reported for the peer
  IcmpIssue,
}

impl From<NackReason> for u8 {
  fn from(r: NackReason) -> u8 {
    match r {
      | NackReason::TooManyRetries => 0,
      | NackReason::NotDeliverable => 1,
      | NackReason::Rst => 2,
      | NackReason::TlsFailed => 3,
      | NackReason::IcmpIssue => 4,
    }
  }
}

impl TryFrom<u8> for NackReason {
  type Error = u8;

  fn try_from(n: u8) -> Result<Self, u8> {
    match n {
      | 0 => Ok(NackReason::TooManyRetries),
      | 1 => Ok(NackReason::NotDeliverable),
      | 2 => Ok(NackReason::Rst),
      | 3 => Ok(NackReason::TlsFailed),
      | 4 => Ok(NackReason::IcmpIssue),
      | n => Err(n),
    }
  }
}

/// Something that happened while the engine was pumped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// A peer sent us a request
  Request {
    /// Session the request arrived on
    session: SessionId,
    /// The request
    msg: Message,
  },
  /// A peer sent us a response
  Response {
    /// Session the response arrived on
    session: SessionId,
    /// The request this responds to, if the engine could correlate it
    sent: Option<Message>,
    /// The response
    received: Message,
  },
  /// A message we sent was not acknowledged
  Nack {
    /// Session the message was sent on
    session: SessionId,
    /// The message
    sent: Message,
    /// Why it was not acknowledged
    reason: NackReason,
    /// Id of the message
    id: Id,
  },
}

/// Result of pumping an engine once
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Step {
  /// Time spent in [`Engine::step`]
  pub elapsed: Millis,
  /// Events raised, in the order they happened
  pub events: Vec<Event>,
}

/// Errors an [`Engine`] may yield
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// A socket operation failed
  Io(io::ErrorKind),
  /// The session does not exist (anymore)
  UnknownSession,
  /// No endpoint has been bound
  NoEndpoint,
  /// The message is larger than the session allows
  MessageTooLarge {
    /// Size of the message
    size: usize,
    /// Maximum size for the session
    max: usize,
  },
  /// A host name could not be resolved
  Resolve(String),
  /// The clock could not be read
  Clock,
}

impl core::fmt::Display for Error {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      | Self::Io(kind) => write!(f, "io error: {:?}", kind),
      | Self::UnknownSession => write!(f, "unknown session"),
      | Self::NoEndpoint => write!(f, "no endpoint bound"),
      | Self::MessageTooLarge { size, max } => {
        write!(f, "message of {} bytes exceeds session maximum of {}", size, max)
      },
      | Self::Resolve(host) => write!(f, "could not resolve {}", host),
      | Self::Clock => write!(f, "clock failure"),
    }
  }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
  fn from(e: io::Error) -> Self {
    Error::Io(e.kind())
  }
}

impl From<embedded_time::clock::Error> for Error {
  fn from(_: embedded_time::clock::Error) -> Self {
    Error::Clock
  }
}

/// A CoAP engine
pub trait Engine: core::fmt::Debug {
  /// Resolve a host & port to a socket address
  ///
  /// The default implementation uses the system resolver
  /// and picks the first address.
  fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, Error> {
    (host, port).to_socket_addrs()
                .ok()
                .and_then(|mut addrs| addrs.next())
                .ok_or_else(|| Error::Resolve(host.to_string()))
  }

  /// Start listening for requests on a local address
  fn bind(&mut self, addr: SocketAddr) -> Result<(), Error>;

  /// Create a client session to a remote address
  fn connect(&mut self, remote: SocketAddr) -> Result<SessionId, Error>;

  /// Discard a session and everything outstanding on it
  fn release(&mut self, session: SessionId);

  /// Look up a session
  fn session(&self, session: SessionId) -> Option<&SessionInfo>;

  /// Look up a session for modification
  fn session_mut(&mut self, session: SessionId) -> Option<&mut SessionInfo>;

  /// Allocate a fresh message id on a session
  fn next_id(&mut self, session: SessionId) -> Result<Id, Error>;

  /// Transmit a message, yielding its message id.
  ///
  /// CON messages are retransmitted until acknowledged;
  /// if they never are, a [`Event::Nack`] is raised.
  fn send(&mut self, session: SessionId, msg: Message) -> Result<Id, Error>;

  /// Do the work of the protocol: receive, acknowledge, retransmit.
  ///
  /// Returns once at least one event happened or the timeout elapsed.
  fn step(&mut self, timeout: Timeout) -> Result<Step, Error>;

  /// Verbosity of the engine's own logging
  fn log_level(&self) -> LevelFilter;

  /// Change the verbosity of the engine's own logging
  fn set_log_level(&mut self, level: LevelFilter);
}
