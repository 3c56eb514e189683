use embedded_time::duration::Milliseconds;
use log::LevelFilter;

use crate::retry::{Attempts, Strategy};
use crate::time::Millis;

/// Configuration options related to outbound CON messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Con {
  /// Initial time to wait for an ACK before retransmitting a CON message.
  ///
  /// The actual first wait is random between this value and
  /// 1.5 times this value, and doubles after every retransmission.
  ///
  /// Sessions start out with this value; it may be changed
  /// per-session with [`Connection::set_ack_timeout`](crate::Connection::set_ack_timeout).
  ///
  /// Defaults to 2 seconds.
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use toad_script::config::Con;
  ///
  /// assert_eq!(Con::default().ack_timeout, Milliseconds(2_000u64));
  /// ```
  pub ack_timeout: Millis,
  /// Number of times we are allowed to retransmit a CON message
  /// before giving up on it.
  ///
  /// Defaults to 4 retransmissions.
  /// ```
  /// use toad_script::config::Con;
  /// use toad_script::retry::Attempts;
  ///
  /// assert_eq!(Con::default().max_retransmit, Attempts(4));
  /// ```
  pub max_retransmit: Attempts,
}

impl Con {
  /// The retry strategy implied by an ACK timeout
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use toad_script::config::Con;
  /// use toad_script::retry::Strategy;
  ///
  /// assert_eq!(Con::strategy(Milliseconds(2_000)),
  ///            Strategy::Exponential { init_min: Milliseconds(2_000),
  ///                                    init_max: Milliseconds(3_000) });
  /// ```
  pub fn strategy(ack_timeout: Millis) -> Strategy {
    let Milliseconds(ms) = ack_timeout;
    Strategy::Exponential { init_min: Milliseconds(ms),
                            init_max: Milliseconds(ms + ms / 2) }
  }
}

/// Configuration options related to parsing & handling messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msg {
  /// Largest message (in bytes) that a PDU may grow to.
  ///
  /// Defaults to 1152 bytes, the usual CoAP-over-UDP limit.
  /// ```
  /// use toad_script::config::Msg;
  ///
  /// assert_eq!(Msg::default().max_pdu_size, 1152);
  /// ```
  pub max_pdu_size: usize,

  /// Seed mixed into the random starting message id of each session.
  ///
  /// ```
  /// use toad_script::config::Msg;
  ///
  /// assert_eq!(Msg::default().id_seed, 0);
  /// ```
  pub id_seed: u16,

  /// How long we keep listening for responses to a NON request.
  ///
  /// Defaults to 145 seconds (`NON_LIFETIME`).
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use toad_script::config::Msg;
  ///
  /// assert_eq!(Msg::default().non_lifetime, Milliseconds(145_000u64));
  /// ```
  pub non_lifetime: Millis,

  /// See [`Con`]
  pub con: Con,
}

impl Default for Con {
  fn default() -> Self {
    Con { ack_timeout: Milliseconds(2_000),
          max_retransmit: Attempts(4) }
  }
}

impl Default for Msg {
  fn default() -> Self {
    Msg { max_pdu_size: 1152,
          id_seed: 0,
          non_lifetime: Milliseconds(145_000),
          con: Con::default() }
  }
}

/// Runtime config
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Config {
  /// See [`Msg`]
  pub msg: Msg,

  /// How long the UDP engine sleeps between polls of its sockets
  /// while waiting for something to happen.
  ///
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use toad_script::config::Config;
  ///
  /// assert_eq!(Config::default().poll_interval, Milliseconds(1u64));
  /// ```
  pub poll_interval: Millis,

  /// Verbosity of the engine's own logging.
  ///
  /// ```
  /// use log::LevelFilter;
  /// use toad_script::config::Config;
  ///
  /// assert_eq!(Config::default().engine_log_level, LevelFilter::Warn);
  /// ```
  pub engine_log_level: LevelFilter,
}

impl Default for Config {
  fn default() -> Self {
    Config { msg: Msg::default(),
             poll_interval: Milliseconds(1),
             engine_log_level: LevelFilter::Warn }
  }
}

impl Config {
  /// Largest total time a CON message may spend being retransmitted
  /// (`MAX_TRANSMIT_WAIT`) with the default ACK timeout.
  pub fn max_transmit_wait(&self) -> Millis {
    Con::strategy(self.msg.con.ack_timeout).max_time(self.msg.con.max_retransmit)
  }
}
