// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Error taxonomy for the wheel bridge. Each subsystem gets its own error
//! enum; [`WheelBridgeError`] aggregates them for code that needs a single
//! return type (mainly the session loop and the CLI entry point).

use thiserror::Error;

pub type WheelBridgeResult<T = ()> = Result<T, WheelBridgeError>;

/// Errors from loading or validating [`Config`](crate::Config) layers.
///
/// These are the only errors that are fatal at startup (exit code 2, see the
/// CLI entry point).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("config file {0} could not be read: {1}")]
  FileRead(String, String),

  #[error("config file {0} is not valid TOML: {1}")]
  FileParse(String, String),

  #[error("invalid value for {field}: {reason}")]
  InvalidValue { field: String, reason: String },

  #[error("reconfigure rejected, current config left untouched: {0}")]
  ReconfigureRejected(String),
}

/// Errors from the sidecar supervisor.
#[derive(Debug, Error)]
pub enum BridgeError {
  #[error("failed to spawn sidecar {0}: {1}")]
  Spawn(String, std::io::Error),

  #[error("sidecar stdin unavailable")]
  StdinUnavailable,

  #[error("sidecar stdout unavailable")]
  StdoutUnavailable,

  #[error("no sidecar available after exhausting backoff ceiling")]
  NoSidecarAvailable,
}

/// Errors from the audio feature ingestor.
#[derive(Debug, Error)]
pub enum FeedbackError {
  #[error("failed to spawn audio helper {0}: {1}")]
  HelperSpawn(String, std::io::Error),
}

/// Errors from UDP bind/send.
#[derive(Debug, Error)]
pub enum SessionError {
  #[error("failed to bind UDP socket on {0}: {1}")]
  UdpBind(String, std::io::Error),

  #[error("UDP send failed: {0}")]
  UdpSend(std::io::Error),
}

/// Aggregation enum for all wheel bridge error kinds. Only [`ConfigError`]
/// and [`BridgeError::NoSidecarAvailable`] are ever allowed to propagate all
/// the way to `main`; everything else is swallowed and counted per the
/// error handling design (transient I/O, protocol drift, session loss are
/// never fatal).
#[derive(Debug, Error)]
pub enum WheelBridgeError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Bridge(#[from] BridgeError),

  #[error(transparent)]
  Feedback(#[from] FeedbackError),

  #[error(transparent)]
  Session(#[from] SessionError),
}

impl WheelBridgeError {
  /// Maps this error onto the process exit codes from the configuration
  /// section of the spec: 0 normal, 2 bad configuration, 3 UDP bind
  /// failure, 4 no sidecar available after backoff ceiling.
  pub fn exit_code(&self) -> i32 {
    match self {
      WheelBridgeError::Config(_) => 2,
      WheelBridgeError::Session(SessionError::UdpBind(..)) => 3,
      WheelBridgeError::Bridge(BridgeError::NoSidecarAvailable) => 4,
      _ => 1,
    }
  }
}
