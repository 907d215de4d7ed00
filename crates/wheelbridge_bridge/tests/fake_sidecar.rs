// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Drives the supervisor against a real child process standing in for a
//! gamepad driver sidecar: a tiny shell script that announces readiness
//! and then drains whatever is written to its stdin, the same duplex
//! shape a real sidecar binary presents.
//!
//! Unix-only: the fake sidecar is a shell script, which has no equivalent
//! on the Windows bridge target.
#![cfg(unix)]

use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use wheelbridge_bridge::supervisor::spawn;
use wheelbridge_bridge::{BridgeEvent, BridgeSupervisorConfig, BridgeTarget};
use wheelbridge_core::{Diagnostics, SharedClock, SystemClock};

/// Writes an executable shell script that prints a `ready` line as soon as
/// it starts, then hands its stdin to `cat` so the supervisor's writes
/// never hit a closed pipe.
fn write_fake_sidecar() -> std::path::PathBuf {
  let mut path = std::env::temp_dir();
  path.push(format!("wheelbridge-fake-sidecar-{}", std::process::id()));
  let mut file = std::fs::File::create(&path).unwrap();
  file
    .write_all(b"#!/bin/sh\necho '{\"type\":\"ready\"}'\nexec cat >/dev/null\n")
    .unwrap();
  let mut perms = std::fs::metadata(&path).unwrap().permissions();
  perms.set_mode(0o755);
  std::fs::set_permissions(&path, perms).unwrap();
  path
}

#[tokio::test]
async fn fake_sidecar_reports_ready_after_spawn() {
  let script = write_fake_sidecar();
  let config = BridgeSupervisorConfig::new(
    script.to_str().unwrap().to_string(),
    BridgeTarget::DkBridgeSidecar,
    250,
  );
  let clock: SharedClock = Arc::new(SystemClock::new());
  let diagnostics = Arc::new(Diagnostics::new());
  let cancellation = CancellationToken::new();

  let (_handle, mut events, join) = spawn(config, clock, diagnostics, cancellation.child_token());

  let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
    .await
    .expect("ready event should arrive within the timeout")
    .expect("event channel should stay open");
  assert_eq!(event, BridgeEvent::Ready);

  cancellation.cancel();
  let _ = tokio::time::timeout(Duration::from_secs(2), join).await;
  let _ = std::fs::remove_file(&script);
}
