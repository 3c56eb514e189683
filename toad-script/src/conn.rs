use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;

use embedded_time::duration::Milliseconds;
use toad_pdu::Id;

use crate::engine::{Engine, SessionId, SessionInfo};
use crate::error::Error;
use crate::pdu::Pdu;

/// Which end of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
  /// Our end
  Local,
  /// The peer's end
  Remote,
}

/// An ACK timeout, as whole seconds plus thousandths of a second
///
/// ```
/// use toad_script::conn::AckTimeout;
///
/// let t = AckTimeout::try_from_millis(2_500).unwrap();
/// assert_eq!(t, AckTimeout { integer: 2, fractional: 500 });
/// assert_eq!(t.millis(), 2_500);
///
/// assert!(AckTimeout::try_from_millis(0).is_err());
/// assert!(AckTimeout::try_from_millis(AckTimeout::MAX_MILLIS + 1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AckTimeout {
  /// Whole seconds
  pub integer: u16,
  /// Thousandths of a second
  pub fractional: u16,
}

impl AckTimeout {
  /// Longest representable timeout, in milliseconds
  pub const MAX_MILLIS: u32 = u16::MAX as u32 * 1000 + 999;

  /// Split a positive number of milliseconds
  pub fn try_from_millis(ms: u32) -> Result<Self, Error> {
    match ms {
      | 0 => Err(Error::invalid_argument("ack timeout must be greater than zero")),
      | ms if ms > Self::MAX_MILLIS => {
        Err(Error::invalid_argument(format!("ack timeout of {}ms exceeds {}ms",
                                            ms,
                                            Self::MAX_MILLIS)))
      },
      | ms => Ok(Self { integer: (ms / 1000) as u16,
                        fractional: (ms % 1000) as u16 }),
    }
  }

  /// Total milliseconds
  pub fn millis(&self) -> u32 {
    self.integer as u32 * 1000 + self.fractional as u32
  }
}

/// A handle to a session owned by the engine.
///
/// Connections opened with [`Context::new_connection`](crate::Context::new_connection)
/// own their session and release it when dropped. Connections obtained from a
/// [`Pdu`] handed to a handler only borrow it.
#[derive(Debug)]
pub struct Connection {
  engine: Rc<RefCell<dyn Engine>>,
  session: SessionId,
  owns_session: bool,
}

impl Connection {
  pub(crate) fn owned(engine: Rc<RefCell<dyn Engine>>, session: SessionId) -> Self {
    Self { engine,
           session,
           owns_session: true }
  }

  pub(crate) fn borrowed(engine: Rc<RefCell<dyn Engine>>, session: SessionId) -> Self {
    Self { engine,
           session,
           owns_session: false }
  }

  /// The session this connection is a handle to
  pub fn session(&self) -> SessionId {
    self.session
  }

  /// Whether dropping this connection releases its session
  pub fn owns_session(&self) -> bool {
    self.owns_session
  }

  fn info<R>(&self, f: impl FnOnce(&SessionInfo) -> R) -> Result<R, Error> {
    self.engine
        .borrow()
        .session(self.session)
        .map(f)
        .ok_or(Error::SessionClosed)
  }

  fn info_mut<R>(&self, f: impl FnOnce(&mut SessionInfo) -> R) -> Result<R, Error> {
    self.engine
        .borrow_mut()
        .session_mut(self.session)
        .map(f)
        .ok_or(Error::SessionClosed)
  }

  fn sock_addr(&self, side: Side) -> Result<SocketAddr, Error> {
    self.info(|s| match side {
          | Side::Local => s.local,
          | Side::Remote => s.remote,
        })
  }

  /// IP address of one end of the session
  pub fn addr(&self, side: Side) -> Result<String, Error> {
    self.sock_addr(side).map(|a| a.ip().to_string())
  }

  /// Port of one end of the session
  pub fn port(&self, side: Side) -> Result<u16, Error> {
    self.sock_addr(side).map(|a| a.port())
  }

  /// Largest message the session will transmit
  pub fn max_pdu_size(&self) -> Result<usize, Error> {
    self.info(|s| s.max_pdu_size)
  }

  /// Number of retransmissions of an unacknowledged CON message
  pub fn max_retransmit(&self) -> Result<u32, Error> {
    self.info(|s| s.max_retransmit)
  }

  /// Change the number of retransmissions; must be greater than zero
  pub fn set_max_retransmit(&self, n: u32) -> Result<(), Error> {
    if n == 0 {
      return Err(Error::invalid_argument("max retransmit must be greater than zero"));
    }

    self.info_mut(|s| s.max_retransmit = n)
  }

  /// Initial ACK timeout for CON messages, in milliseconds
  pub fn ack_timeout(&self) -> Result<u32, Error> {
    self.info(|s| u32::try_from(s.ack_timeout.0).unwrap_or(u32::MAX))
  }

  /// Change the initial ACK timeout, in milliseconds.
  ///
  /// Must be greater than zero and at most [`AckTimeout::MAX_MILLIS`].
  pub fn set_ack_timeout(&self, ms: u32) -> Result<(), Error> {
    let timeout = AckTimeout::try_from_millis(ms)?;
    self.info_mut(|s| s.ack_timeout = Milliseconds(timeout.millis() as u64))
  }

  /// Transmit a PDU created with [`Context::new_msg`](crate::Context::new_msg),
  /// attaching `payload` first if given.
  ///
  /// Once sent, the PDU is locked. If transmission fails the PDU stays usable.
  pub fn send(&self, pdu: &Pdu, payload: Option<&[u8]>) -> Result<Id, Error> {
    let msg = pdu.prepare_send(payload)?;
    let sent = self.engine.borrow_mut().send(self.session, msg);

    match sent {
      | Ok(id) => {
        pdu.lock();
        pdu.take_msg();
        Ok(id)
      },
      | Err(e) => {
        log::error!("{}: send failed: {}", self.session, e);
        Err(e.into())
      },
    }
  }
}

impl Drop for Connection {
  fn drop(&mut self) {
    if !self.owns_session {
      return;
    }

    match self.engine.try_borrow_mut() {
      | Ok(mut engine) => engine.release(self.session),
      | Err(_) => log::warn!("{} not released; engine busy", self.session),
    }
  }
}
