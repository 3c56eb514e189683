use embedded_time::duration::Milliseconds;
use embedded_time::rate::Fraction;
use embedded_time::Instant;

/// A duration, in milliseconds
pub type Millis = Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Timeout configuration allowing for "never time out" as an option
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub enum Timeout {
  /// Timeout after some number of milliseconds has elapsed
  Millis(u64),
  /// Never time out
  Never,
}

impl Timeout {
  /// Do not wait at all; do whatever work is immediately available
  pub const NONBLOCKING: Timeout = Timeout::Millis(0);
}

/// `None` waits forever, zero or less does not wait,
/// anything else is a number of milliseconds.
///
/// ```
/// use toad_script::time::Timeout;
///
/// assert_eq!(Timeout::from(None), Timeout::Never);
/// assert_eq!(Timeout::from(Some(-1)), Timeout::Millis(0));
/// assert_eq!(Timeout::from(Some(250)), Timeout::Millis(250));
/// ```
impl From<Option<i64>> for Timeout {
  fn from(ms: Option<i64>) -> Self {
    match ms {
      | None => Timeout::Never,
      | Some(ms) if ms <= 0 => Timeout::Millis(0),
      | Some(ms) => Timeout::Millis(ms as u64),
    }
  }
}

impl From<Millis> for Timeout {
  fn from(Milliseconds(ms): Millis) -> Self {
    Timeout::Millis(ms)
  }
}

/// Milliseconds elapsed between two instants, or zero if `later` is not later.
pub(crate) fn millis_between<C: Clock>(earlier: Instant<C>, later: Instant<C>) -> u64 {
  later.checked_duration_since(&earlier)
       .and_then(|dur| Millis::try_from(dur).ok())
       .map(|Milliseconds(ms)| ms)
       .unwrap_or(0)
}

/// Milliseconds between the clock's epoch and `now`
pub(crate) fn millis_since_epoch<C: Clock>(now: Instant<C>) -> u64 {
  Millis::try_from(now.duration_since_epoch()).map(|Milliseconds(ms)| ms)
                                               .unwrap_or(0)
}

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives
#[derive(Debug, Clone, Copy)]
pub struct StdClock(std::time::Instant);

impl Default for StdClock {
  fn default() -> Self {
    Self::new()
  }
}

impl StdClock {
  /// Create a new clock
  pub fn new() -> Self {
    Self(std::time::Instant::now())
  }
}

impl embedded_time::Clock for StdClock {
  type T = u64;

  // microseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

  fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
    let now = std::time::Instant::now();
    let elapsed = now.duration_since(self.0);
    Ok(Instant::new(elapsed.as_micros() as u64))
  }
}
