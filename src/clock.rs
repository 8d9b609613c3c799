use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock source in milliseconds since the Unix epoch.
///
/// Batch file names are timestamps from this clock, so it drives both the
/// recent windows and retention.
pub trait Clock: Send + Sync {
  fn now_ms(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_ms(&self) -> u64 {
    SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_millis() as u64)
      .unwrap_or(0)
  }
}

/// A clock that only moves when told to. Shareable across threads.
#[derive(Debug, Default)]
pub struct ManualClock {
  now: AtomicU64,
}

impl ManualClock {
  pub fn new(start_ms: u64) -> Self {
    Self {
      now: AtomicU64::new(start_ms),
    }
  }

  pub fn set(&self, now_ms: u64) {
    self.now.store(now_ms, Ordering::Release);
  }

  pub fn advance(&self, delta_ms: u64) {
    self.now.fetch_add(delta_ms, Ordering::AcqRel);
  }
}

impl Clock for ManualClock {
  fn now_ms(&self) -> u64 {
    self.now.load(Ordering::Acquire)
  }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
  fn now_ms(&self) -> u64 {
    (**self).now_ms()
  }
}
