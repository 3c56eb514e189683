use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use embedded_time::Instant;
use rand::{Rng, SeedableRng};

use crate::time::{millis_between, millis_since_epoch, Clock, Millis};

/// A non-blocking timer that allows a fixed-delay or exponential-backoff retry,
/// that lives alongside some operation to retry.
///
/// It does not _contain_ the work to be done; the owner asks it
/// what to do whenever it is polled.
///
/// ```
/// use embedded_time::clock::Clock;
/// use embedded_time::duration::Milliseconds;
/// use toad_script::retry;
/// use toad_script::time::StdClock;
///
/// let mut called = false;
/// let mut fails_once = || -> Result<(), ()> {
///   if !called {
///     called = true;
///     Err(())
///   } else {
///     Ok(())
///   }
/// };
///
/// let clock = StdClock::new();
/// let now = || clock.try_now().unwrap();
/// let strategy = retry::Strategy::Delay { min: Milliseconds(1),
///                                         max: Milliseconds(2) };
/// let mut retry = retry::RetryTimer::new(now(), strategy, retry::Attempts(2), 0);
///
/// while let Err(_) = fails_once() {
///   match nb::block!(retry.what_should_i_do(now())) {
///     | Ok(retry::YouShould::Retry) => continue,
///     | Ok(retry::YouShould::Cry) => panic!("no more attempts! it failed more than once!!"),
///     | Err(never) => match never {},
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer<C: Clock> {
  last: Instant<C>,
  delay: Millis,
  strategy: Strategy,
  retries: Attempts,
  max_retries: Attempts,
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u32);

/// Result of [`RetryTimer::what_should_i_do`].
///
/// This tells you if a retry should be attempted or not.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed
  Retry,
}

impl<C: Clock> RetryTimer<C> {
  /// Create a new retrier, started at the first attempt.
  ///
  /// `seed` is mixed into the random initial delay, so that
  /// timers started at the same instant do not retry in lockstep.
  pub fn new(start: Instant<C>, strategy: Strategy, max_retries: Attempts, seed: u64) -> Self {
    let delay = if strategy.has_jitter() {
      let mut rand =
        rand_chacha::ChaCha8Rng::seed_from_u64(millis_since_epoch(start).wrapping_add(seed));
      Milliseconds(rand.gen_range(strategy.range()))
    } else {
      Milliseconds(*strategy.range().start())
    };

    Self { last: start,
           delay,
           strategy,
           retries: Attempts(0),
           max_retries }
  }

  /// Number of retries performed so far
  pub fn retries(&self) -> Attempts {
    self.retries
  }

  /// When the thing we keep trying fails, invoke this to
  /// tell the retrytimer "it failed again! what do I do??"
  ///
  /// Returns `nb::Error::WouldBlock` when we have not yet
  /// waited the appropriate amount of time since the last attempt.
  /// Only once the wait after the final attempt has elapsed
  /// does this yield [`YouShould::Cry`].
  pub fn what_should_i_do(&mut self,
                          now: Instant<C>)
                          -> nb::Result<YouShould, core::convert::Infallible> {
    if millis_between(self.last, now) < self.delay.0 {
      return Err(nb::Error::WouldBlock);
    }

    if self.retries >= self.max_retries {
      Ok(YouShould::Cry)
    } else {
      self.retries.0 += 1;
      self.last = now;
      if let Strategy::Exponential { .. } = self.strategy {
        self.delay = Milliseconds(self.delay.0.saturating_mul(2));
      }
      Ok(YouShould::Retry)
    }
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
  /// Generate a random delay between `init_min` and `init_max`,
  /// and wait until this delay has passed before the first retry.
  ///
  /// After each retry, double the delay before retrying again.
  Exponential {
    /// Minimum (inclusive) delay before the first retry
    init_min: Millis,
    /// Maximum (inclusive) delay before the first retry
    init_max: Millis,
  },
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  Delay {
    /// Minimum (inclusive) delay for attempts
    min: Millis,
    /// Maximum (inclusive) delay for attempts
    max: Millis,
  },
}

impl Strategy {
  /// Are min & max delays the same? if so, we should probably skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    match self {
      | &Self::Delay { min: Milliseconds(min),
                       max: Milliseconds(max), } => min..=max.max(min),

      | &Self::Exponential { init_min: Milliseconds(min),
                             init_max: Milliseconds(max), } => min..=max.max(min),
    }
  }

  /// Get the longest time this strategy will wait
  /// if every retry fails, including the wait after the last one.
  pub fn max_time(&self, max_retries: Attempts) -> Millis {
    Milliseconds(match self {
                   | Self::Exponential { init_max, .. } => {
                     Self::total_delay_exp(*init_max, max_retries.0 + 1)
                   },
                   | Self::Delay { max: Milliseconds(max),
                                   .. } => max * (max_retries.0 as u64 + 1),
                 })
  }

  /// Total time spent waiting across `waits` doubling waits
  /// that start at `init`.
  fn total_delay_exp(Milliseconds(init): Millis, waits: u32) -> u64 {
    // | waits | total delay  |
    // | 1     | init         |
    // | 2     | init * 3     |
    // | 3     | init * 7     |
    // | n     | init * (2^n - 1) |
    init.saturating_mul(2u64.saturating_pow(waits).saturating_sub(1))
  }
}

#[cfg(test)]
mod test {
  use embedded_time::Clock as _;

  use super::*;
  use crate::test::ClockMock;

  #[test]
  fn strategy_range() {
    assert_eq!(Strategy::Delay { min: Milliseconds(10u64),
                                 max: Milliseconds(20u64) }.range(),
               10..=20);
    assert_eq!(Strategy::Exponential { init_min: Milliseconds(30u64),
                                       init_max: Milliseconds(20u64) }.range(),
               30..=30);
  }

  #[test]
  fn delay_retrier() {
    let clock = ClockMock::new();
    let now = || clock.try_now().unwrap();
    let mut retry = RetryTimer::new(now(),
                                    Strategy::Delay { min: Milliseconds(1000),
                                                      max: Milliseconds(1000) },
                                    Attempts(2),
                                    0);

    clock.set_millis(999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set_millis(1000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);

    clock.set_millis(1999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    // waiting a long time does not let several retries happen at once
    clock.set_millis(10_000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set_millis(11_000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Cry);
    assert_eq!(retry.retries(), Attempts(2));
  }

  #[test]
  fn exponential_retrier() {
    let clock = ClockMock::new();
    let now = || clock.try_now().unwrap();
    let mut retry = RetryTimer::new(now(),
                                    Strategy::Exponential { init_min: Milliseconds(1000),
                                                            init_max: Milliseconds(1000) },
                                    Attempts(2),
                                    0);

    clock.set_millis(999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set_millis(1000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);

    clock.set_millis(2999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set_millis(3000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Retry);

    clock.set_millis(6999);
    assert_eq!(retry.what_should_i_do(now()).unwrap_err(),
               nb::Error::WouldBlock);

    clock.set_millis(7000);
    assert_eq!(retry.what_should_i_do(now()).unwrap(), YouShould::Cry);
  }

  #[test]
  fn jitter_stays_in_range() {
    let clock = ClockMock::new();
    (0..32).for_each(|seed| {
             let mut retry = RetryTimer::new(clock.try_now().unwrap(),
                                             Strategy::Exponential { init_min: Milliseconds(100),
                                                                     init_max: Milliseconds(150) },
                                             Attempts(1),
                                             seed);
             clock.set_millis(99);
             assert!(retry.what_should_i_do(clock.try_now().unwrap()).is_err());
             clock.set_millis(150);
             assert_eq!(retry.what_should_i_do(clock.try_now().unwrap()),
                        Ok(YouShould::Retry));
             clock.set_millis(0);
           });
  }

  #[test]
  fn exp_calculation() {
    let init = Milliseconds(100);
    assert_eq!(Strategy::total_delay_exp(init, 1), 100);
    assert_eq!(Strategy::total_delay_exp(init, 2), 300);
    assert_eq!(Strategy::total_delay_exp(init, 3), 700);
  }
}
