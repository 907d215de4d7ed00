// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Monotonic millisecond clock, test-injectable so the session loop and its
//! timing-sensitive components (latch, keepalive, idle timeout, FFB
//! staleness) can be driven deterministically in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A source of monotonic milliseconds since some fixed (but otherwise
/// unspecified) epoch. All durations in the system are computed as
/// differences between two `now()` readings, never as tick counts, so a
/// slower tick rate degrades gracefully.
pub trait Clock: Send + Sync + std::fmt::Debug {
  fn now_ms(&self) -> u64;
}

/// Real wall clock, backed by `std::time::Instant`.
#[derive(Debug)]
pub struct SystemClock {
  epoch: Instant,
}

impl SystemClock {
  pub fn new() -> Self {
    Self {
      epoch: Instant::now(),
    }
  }
}

impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for SystemClock {
  fn now_ms(&self) -> u64 {
    self.epoch.elapsed().as_millis() as u64
  }
}

/// A clock that only advances when told to. Used by tests that need
/// deterministic control over latch expiry, keepalive cadence, idle
/// timeout, and FFB staleness without sleeping real time.
#[derive(Debug, Clone)]
pub struct TestClock {
  millis: Arc<AtomicU64>,
}

impl TestClock {
  pub fn new() -> Self {
    Self {
      millis: Arc::new(AtomicU64::new(0)),
    }
  }

  pub fn advance(&self, delta_ms: u64) {
    self.millis.fetch_add(delta_ms, Ordering::SeqCst);
  }

  pub fn set(&self, ms: u64) {
    self.millis.store(ms, Ordering::SeqCst);
  }
}

impl Default for TestClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for TestClock {
  fn now_ms(&self) -> u64 {
    self.millis.load(Ordering::SeqCst)
  }
}

pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clock_advances_on_demand() {
    let clock = TestClock::new();
    assert_eq!(clock.now_ms(), 0);
    clock.advance(16);
    clock.advance(16);
    assert_eq!(clock.now_ms(), 32);
  }

  #[test]
  fn system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let a = clock.now_ms();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let b = clock.now_ms();
    assert!(b >= a);
  }
}
