// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Command line interface. Every flag also accepts `WHEELBRIDGE_*` as its
//! env var default via `clap`'s `env` feature, but the session loop's own
//! env layer (see `wheelbridge_session::ConfigLayer::from_env`) is still
//! read and merged separately so the precedence order (defaults, file, env,
//! CLI) holds even for a flag the user never typed.

use clap::Parser;
use wheelbridge_session::ConfigLayer;

/// Bridges a phone gyro/wheel app to a virtual gamepad over UDP.
#[derive(Debug, Parser)]
#[command(name = "wheelbridge", version)]
pub struct CliOptions {
  /// path to an optional TOML configuration file
  #[arg(long, env = "WHEELBRIDGE_CONFIG_FILE")]
  pub config_file: Option<String>,

  /// UDP port to listen for phone telemetry on
  #[arg(long, env = "WHEELBRIDGE_UDP_PORT")]
  pub udp_port: Option<u16>,

  /// milliseconds of silence before a session is considered disconnected
  #[arg(long, env = "WHEELBRIDGE_IDLE_TIMEOUT_MS")]
  pub idle_timeout_ms: Option<u64>,

  /// session loop tick rate in Hz
  #[arg(long, env = "WHEELBRIDGE_TICK_HZ")]
  pub tick_hz: Option<u32>,

  /// keepalive push interval to the sidecar, in milliseconds
  #[arg(long, env = "WHEELBRIDGE_KEEPALIVE_MS")]
  pub keepalive_ms: Option<u64>,

  /// button latch hold duration, in ticks
  #[arg(long, env = "WHEELBRIDGE_LATCH_TICKS")]
  pub latch_ticks: Option<u32>,

  /// steering expo curve coefficient, within [0, 1]
  #[arg(long, env = "WHEELBRIDGE_EXPO")]
  pub expo: Option<f32>,

  /// steering deadzone, within [0, 1]
  #[arg(long, env = "WHEELBRIDGE_DEADZONE")]
  pub deadzone: Option<f32>,

  /// force feedback mode: passthrough, synthetic, or hybrid
  #[arg(long, env = "WHEELBRIDGE_FFB_MODE")]
  pub ffb_mode: Option<String>,

  /// force feedback staleness threshold, in milliseconds
  #[arg(long, env = "WHEELBRIDGE_FFB_STALE_MS")]
  pub ffb_stale_ms: Option<u64>,

  /// synthetic force feedback gain for the left motor
  #[arg(long, env = "WHEELBRIDGE_FFB_GAIN_L")]
  pub ffb_gain_l: Option<f32>,

  /// synthetic force feedback gain for the right motor
  #[arg(long, env = "WHEELBRIDGE_FFB_GAIN_R")]
  pub ffb_gain_r: Option<f32>,

  /// gamepad sidecar target: x360, ds4, or dkbridge
  #[arg(long, env = "WHEELBRIDGE_BRIDGE_TARGET")]
  pub bridge_target: Option<String>,

  /// path to the sidecar executable, overriding the platform default
  #[arg(long, env = "WHEELBRIDGE_BRIDGE_EXE")]
  pub bridge_exe: Option<String>,

  /// path to the audio feature helper executable
  #[arg(long, env = "WHEELBRIDGE_AUDIO_HELPER")]
  pub audio_helper: Option<String>,

  /// log level filter, e.g. "info" or "wheelbridge_session=debug,info"
  #[arg(long, env = "WHEELBRIDGE_LOG_LEVEL")]
  pub log_level: Option<String>,

  /// emit logs as JSON lines instead of human-readable text
  #[arg(long, env = "WHEELBRIDGE_LOG_JSON")]
  pub log_json: Option<bool>,
}

impl From<CliOptions> for ConfigLayer {
  fn from(args: CliOptions) -> Self {
    ConfigLayer {
      udp_port: args.udp_port,
      idle_timeout_ms: args.idle_timeout_ms,
      tick_hz: args.tick_hz,
      keepalive_ms: args.keepalive_ms,
      latch_ticks: args.latch_ticks,
      expo: args.expo,
      deadzone: args.deadzone,
      ffb_mode: args.ffb_mode,
      ffb_stale_ms: args.ffb_stale_ms,
      ffb_gain_l: args.ffb_gain_l,
      ffb_gain_r: args.ffb_gain_r,
      bridge_target: args.bridge_target,
      bridge_exe: args.bridge_exe,
      audio_helper: args.audio_helper,
      log_level: args.log_level,
      log_json: args.log_json,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bare_invocation_parses_with_every_field_absent() {
    let args = CliOptions::parse_from(["wheelbridge"]);
    let layer: ConfigLayer = args.into();
    assert!(layer.udp_port.is_none());
    assert!(layer.ffb_mode.is_none());
  }

  #[test]
  fn flags_populate_the_matching_layer_fields() {
    let args = CliOptions::parse_from([
      "wheelbridge",
      "--udp-port",
      "9999",
      "--ffb-mode",
      "synthetic",
    ]);
    let layer: ConfigLayer = args.into();
    assert_eq!(layer.udp_port, Some(9999));
    assert_eq!(layer.ffb_mode.as_deref(), Some("synthetic"));
  }
}
