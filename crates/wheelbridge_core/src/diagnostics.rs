// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Process-lifetime counters and gauges. These are logged periodically by
//! the session loop but never exported to any metrics backend or persisted
//! — that would be a "metrics" feature, which is out of scope. They exist
//! so an operator reading logs can tell protocol drift from a healthy idle
//! link, and see `latG` even though no output path consumes it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Diagnostics {
  pub transient_io_errors: AtomicU64,
  pub protocol_drift_drops: AtomicU64,
  pub finetune_received: AtomicU64,
  pub rejected_foreign_peer: AtomicU64,
  pub sidecar_restarts: AtomicU64,
  last_lat_g: Mutex<f32>,
}

impl Diagnostics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record_transient_io_error(&self) {
    self.transient_io_errors.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_protocol_drift(&self) {
    self.protocol_drift_drops.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_finetune(&self) {
    self.finetune_received.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_rejected_foreign_peer(&self) {
    self.rejected_foreign_peer.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_sidecar_restart(&self) {
    self.sidecar_restarts.fetch_add(1, Ordering::Relaxed);
  }

  /// `latG` is never consumed by any controller output path; this is the
  /// only place it goes.
  pub fn record_lat_g(&self, value: f32) {
    if let Ok(mut guard) = self.last_lat_g.lock() {
      *guard = value;
    }
  }

  pub fn last_lat_g(&self) -> f32 {
    self.last_lat_g.lock().map(|g| *g).unwrap_or(0.0)
  }

  pub fn snapshot(&self) -> DiagnosticsSnapshot {
    DiagnosticsSnapshot {
      transient_io_errors: self.transient_io_errors.load(Ordering::Relaxed),
      protocol_drift_drops: self.protocol_drift_drops.load(Ordering::Relaxed),
      finetune_received: self.finetune_received.load(Ordering::Relaxed),
      rejected_foreign_peer: self.rejected_foreign_peer.load(Ordering::Relaxed),
      sidecar_restarts: self.sidecar_restarts.load(Ordering::Relaxed),
      last_lat_g: self.last_lat_g(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosticsSnapshot {
  pub transient_io_errors: u64,
  pub protocol_drift_drops: u64,
  pub finetune_received: u64,
  pub rejected_foreign_peer: u64,
  pub sidecar_restarts: u64,
  pub last_lat_g: f32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counters_start_at_zero() {
    let diag = Diagnostics::new();
    let snap = diag.snapshot();
    assert_eq!(snap.transient_io_errors, 0);
    assert_eq!(snap.protocol_drift_drops, 0);
    assert_eq!(snap.last_lat_g, 0.0);
  }

  #[test]
  fn lat_g_is_recorded_but_nothing_else_reads_it_as_output() {
    let diag = Diagnostics::new();
    diag.record_lat_g(1.25);
    assert_eq!(diag.last_lat_g(), 1.25);
  }

  #[test]
  fn counters_increment_independently() {
    let diag = Diagnostics::new();
    diag.record_protocol_drift();
    diag.record_protocol_drift();
    diag.record_sidecar_restart();
    let snap = diag.snapshot();
    assert_eq!(snap.protocol_drift_drops, 2);
    assert_eq!(snap.sidecar_restarts, 1);
    assert_eq!(snap.transient_io_errors, 0);
  }
}
