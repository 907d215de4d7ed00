// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Launches the platform audio helper and keeps its latest reported
//! [`AudioFeatures`]. Does no DSP of its own — it trusts whatever envelope
//! the helper reports.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use wheelbridge_core::errors::FeedbackError;
use wheelbridge_core::util::async_manager;
use wheelbridge_protocol::AudioFeatures;

#[derive(Debug, Default)]
struct IngestorState {
  armed: bool,
  features: AudioFeatures,
}

/// Shared handle to the latest audio-derived features. Cloning shares the
/// same underlying state; the reader task and the `FeedbackMixer` each
/// hold a clone.
#[derive(Clone)]
pub struct AudioIngestor {
  state: Arc<Mutex<IngestorState>>,
}

#[derive(Debug, Deserialize)]
struct StatusLine {
  status: String,
}

impl AudioIngestor {
  /// No helper configured: behaves as if all features were always zero.
  pub fn disabled() -> Self {
    Self {
      state: Arc::new(Mutex::new(IngestorState::default())),
    }
  }

  /// Spawns the helper process and starts draining its stdout.
  pub fn spawn(helper_path: &str) -> Result<Self, FeedbackError> {
    let mut child = Command::new(helper_path)
      .stdout(Stdio::piped())
      .stderr(Stdio::null())
      .spawn()
      .map_err(|e| FeedbackError::HelperSpawn(helper_path.to_string(), e))?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let state = Arc::new(Mutex::new(IngestorState::default()));
    let reader_state = state.clone();

    async_manager::spawn(async move {
      let mut reader = BufReader::new(stdout);
      let mut line = String::new();
      loop {
        line.clear();
        match reader.read_line(&mut line).await {
          Ok(0) => {
            disarm(&reader_state);
            break;
          }
          Ok(_) => handle_line(&reader_state, line.trim_end()),
          Err(_) => {
            disarm(&reader_state);
            break;
          }
        }
      }
      let _ = child.wait().await;
    });

    Ok(Self { state })
  }

  /// Returns the latest features, or all-zero if disarmed or never armed.
  pub fn latest(&self) -> AudioFeatures {
    let guard = self.state.lock().expect("audio ingestor mutex poisoned");
    if guard.armed {
      guard.features.clone()
    } else {
      AudioFeatures::default()
    }
  }

  pub fn is_armed(&self) -> bool {
    self.state.lock().expect("audio ingestor mutex poisoned").armed
  }
}

fn handle_line(state: &Arc<Mutex<IngestorState>>, line: &str) {
  if line.is_empty() {
    return;
  }
  let Ok(value) = serde_json::from_str::<Value>(line) else {
    return;
  };

  if let Ok(status) = serde_json::from_value::<StatusLine>(value.clone()) {
    match status.status.as_str() {
      "started" => {
        state.lock().expect("audio ingestor mutex poisoned").armed = true;
      }
      "stopped" | "error" => disarm(state),
      _ => {}
    }
    return;
  }

  if let Ok(features) = serde_json::from_value::<AudioFeatures>(value) {
    let mut guard = state.lock().expect("audio ingestor mutex poisoned");
    guard.armed = true;
    guard.features = features;
  }
}

fn disarm(state: &Arc<Mutex<IngestorState>>) {
  let mut guard = state.lock().expect("audio ingestor mutex poisoned");
  guard.armed = false;
  guard.features = AudioFeatures::default();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn disabled_ingestor_reports_zero_features() {
    let ingestor = AudioIngestor::disabled();
    assert!(!ingestor.is_armed());
    assert_eq!(ingestor.latest(), AudioFeatures::default());
  }

  #[test]
  fn started_status_arms_and_feature_line_updates() {
    let ingestor = AudioIngestor::disabled();
    handle_line(&ingestor.state, r#"{"status":"started","device":"mic0"}"#);
    assert!(ingestor.is_armed());

    handle_line(&ingestor.state, r#"{"bodyL":0.4,"bodyR":0.6,"impact":0.8}"#);
    let features = ingestor.latest();
    assert_eq!(features.body_l, 0.4);
    assert_eq!(features.body_r, 0.6);
    assert_eq!(features.impact, 0.8);
  }

  #[test]
  fn stopped_status_disarms() {
    let ingestor = AudioIngestor::disabled();
    handle_line(&ingestor.state, r#"{"status":"started"}"#);
    handle_line(&ingestor.state, r#"{"bodyL":0.9}"#);
    handle_line(&ingestor.state, r#"{"status":"stopped"}"#);
    assert!(!ingestor.is_armed());
    assert_eq!(ingestor.latest(), AudioFeatures::default());
  }

  #[test]
  fn malformed_line_is_ignored() {
    let ingestor = AudioIngestor::disabled();
    handle_line(&ingestor.state, "not json");
    assert!(!ingestor.is_armed());
  }
}
