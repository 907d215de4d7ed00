// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Layered configuration: built-in defaults, an optional TOML file,
//! environment variables, then CLI flags, each layer overriding the one
//! before it. `Config` is the single in-memory struct the session loop
//! reads; it is mutable only via [`Config::reconfigure`].

use getset::{CopyGetters, Getters};
use serde::Deserialize;

use wheelbridge_bridge::BridgeTarget;
use wheelbridge_core::errors::ConfigError;
use wheelbridge_protocol::FfbMode;

/// One layer of optional overrides, as read from a TOML file, the
/// environment, or CLI flags. `None` means "this layer doesn't set it".
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
  pub udp_port: Option<u16>,
  pub idle_timeout_ms: Option<u64>,
  pub tick_hz: Option<u32>,
  pub keepalive_ms: Option<u64>,
  pub latch_ticks: Option<u32>,
  pub expo: Option<f32>,
  pub deadzone: Option<f32>,
  pub ffb_mode: Option<String>,
  pub ffb_stale_ms: Option<u64>,
  pub ffb_gain_l: Option<f32>,
  pub ffb_gain_r: Option<f32>,
  pub bridge_target: Option<String>,
  pub bridge_exe: Option<String>,
  pub audio_helper: Option<String>,
  pub log_level: Option<String>,
  pub log_json: Option<bool>,
}

impl ConfigLayer {
  /// Overlays `other` on top of `self`: any field `other` sets wins.
  pub fn merge(mut self, other: ConfigLayer) -> Self {
    macro_rules! take {
      ($field:ident) => {
        if other.$field.is_some() {
          self.$field = other.$field;
        }
      };
    }
    take!(udp_port);
    take!(idle_timeout_ms);
    take!(tick_hz);
    take!(keepalive_ms);
    take!(latch_ticks);
    take!(expo);
    take!(deadzone);
    take!(ffb_mode);
    take!(ffb_stale_ms);
    take!(ffb_gain_l);
    take!(ffb_gain_r);
    take!(bridge_target);
    take!(bridge_exe);
    take!(audio_helper);
    take!(log_level);
    take!(log_json);
    self
  }

  pub fn from_toml_str(contents: &str, source: &str) -> Result<Self, ConfigError> {
    toml::from_str(contents).map_err(|e| ConfigError::FileParse(source.to_string(), e.to_string()))
  }

  /// Reads the `WHEELBRIDGE_*` environment variables this system
  /// recognizes. Unset variables leave the corresponding field `None`.
  pub fn from_env() -> Self {
    fn var(name: &str) -> Option<String> {
      std::env::var(name).ok()
    }
    fn parse<T: std::str::FromStr>(name: &str) -> Option<T> {
      var(name).and_then(|v| v.parse().ok())
    }

    Self {
      udp_port: parse("WHEELBRIDGE_UDP_PORT"),
      idle_timeout_ms: parse("WHEELBRIDGE_IDLE_TIMEOUT_MS"),
      tick_hz: parse("WHEELBRIDGE_TICK_HZ"),
      keepalive_ms: parse("WHEELBRIDGE_KEEPALIVE_MS"),
      latch_ticks: parse("WHEELBRIDGE_LATCH_TICKS"),
      expo: parse("WHEELBRIDGE_EXPO"),
      deadzone: parse("WHEELBRIDGE_DEADZONE"),
      ffb_mode: var("WHEELBRIDGE_FFB_MODE"),
      ffb_stale_ms: parse("WHEELBRIDGE_FFB_STALE_MS"),
      ffb_gain_l: parse("WHEELBRIDGE_FFB_GAIN_L"),
      ffb_gain_r: parse("WHEELBRIDGE_FFB_GAIN_R"),
      bridge_target: var("WHEELBRIDGE_BRIDGE_TARGET"),
      bridge_exe: var("WHEELBRIDGE_BRIDGE_EXE"),
      audio_helper: var("WHEELBRIDGE_AUDIO_HELPER"),
      log_level: var("WHEELBRIDGE_LOG_LEVEL"),
      log_json: parse("WHEELBRIDGE_LOG_JSON"),
    }
  }
}

fn default_layer() -> ConfigLayer {
  ConfigLayer {
    udp_port: Some(8765),
    idle_timeout_ms: Some(3000),
    tick_hz: Some(60),
    keepalive_ms: Some(90),
    latch_ticks: Some(3),
    expo: Some(0.22),
    deadzone: Some(0.06),
    ffb_mode: Some("hybrid".to_string()),
    ffb_stale_ms: Some(500),
    ffb_gain_l: Some(1.0),
    ffb_gain_r: Some(1.0),
    bridge_target: None,
    bridge_exe: None,
    audio_helper: None,
    log_level: Some("info".to_string()),
    log_json: Some(false),
  }
}

/// Resolved, concrete configuration. Every value is guaranteed present and
/// validated; nothing downstream needs to re-check ranges.
#[derive(Debug, Clone, CopyGetters, Getters)]
pub struct Config {
  #[getset(get_copy = "pub")]
  udp_port: u16,
  #[getset(get_copy = "pub")]
  idle_timeout_ms: u64,
  #[getset(get_copy = "pub")]
  tick_hz: u32,
  #[getset(get_copy = "pub")]
  keepalive_ms: u64,
  #[getset(get_copy = "pub")]
  latch_ticks: u32,
  #[getset(get_copy = "pub")]
  expo: f32,
  #[getset(get_copy = "pub")]
  deadzone: f32,
  #[getset(get_copy = "pub")]
  ffb_mode: FfbMode,
  #[getset(get_copy = "pub")]
  ffb_stale_ms: u64,
  #[getset(get_copy = "pub")]
  ffb_gain_l: f32,
  #[getset(get_copy = "pub")]
  ffb_gain_r: f32,
  #[getset(get_copy = "pub")]
  bridge_target: BridgeTarget,
  #[getset(get = "pub")]
  bridge_exe: Option<String>,
  #[getset(get = "pub")]
  audio_helper: Option<String>,
  #[getset(get = "pub")]
  log_level: String,
  #[getset(get_copy = "pub")]
  log_json: bool,
}

impl Config {
  /// Merges defaults, an optional file layer, the environment layer, and
  /// the CLI layer, in that order, and validates the result. Validation
  /// failures reject the whole reconfigure — no partial application.
  pub fn resolve(
    file: Option<ConfigLayer>,
    env: ConfigLayer,
    cli: ConfigLayer,
  ) -> Result<Config, ConfigError> {
    let mut merged = default_layer();
    if let Some(file) = file {
      merged = merged.merge(file);
    }
    merged = merged.merge(env).merge(cli);
    Config::from_layer(merged)
  }

  fn from_layer(layer: ConfigLayer) -> Result<Config, ConfigError> {
    let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
      field: field.to_string(),
      reason: reason.to_string(),
    };

    let expo = layer.expo.unwrap_or(0.22);
    if !(0.0..=1.0).contains(&expo) {
      return Err(invalid("expo", "must be within [0, 1]"));
    }
    let deadzone = layer.deadzone.unwrap_or(0.06);
    if !(0.0..=1.0).contains(&deadzone) {
      return Err(invalid("deadzone", "must be within [0, 1]"));
    }
    let tick_hz = layer.tick_hz.unwrap_or(60);
    if tick_hz == 0 {
      return Err(invalid("tick_hz", "must be nonzero"));
    }

    let ffb_mode = match layer.ffb_mode.as_deref().unwrap_or("hybrid") {
      "passthrough" => FfbMode::Passthrough,
      "synthetic" => FfbMode::Synthetic,
      "hybrid" => FfbMode::Hybrid,
      other => {
        return Err(invalid(
          "ffb.mode",
          &format!("unrecognized mode {other:?}, expected passthrough|synthetic|hybrid"),
        ))
      }
    };

    let bridge_target = match &layer.bridge_target {
      Some(value) => value
        .parse::<BridgeTarget>()
        .map_err(|_| invalid("bridge.target", &format!("unrecognized target {value:?}")))?,
      None => BridgeTarget::platform_default(),
    };

    Ok(Config {
      udp_port: layer.udp_port.unwrap_or(8765),
      idle_timeout_ms: layer.idle_timeout_ms.unwrap_or(3000),
      tick_hz,
      keepalive_ms: layer.keepalive_ms.unwrap_or(90),
      latch_ticks: layer.latch_ticks.unwrap_or(3),
      expo,
      deadzone,
      ffb_mode,
      ffb_stale_ms: layer.ffb_stale_ms.unwrap_or(500),
      ffb_gain_l: layer.ffb_gain_l.unwrap_or(1.0),
      ffb_gain_r: layer.ffb_gain_r.unwrap_or(1.0),
      bridge_target,
      bridge_exe: layer.bridge_exe,
      audio_helper: layer.audio_helper,
      log_level: layer.log_level.unwrap_or_else(|| "info".to_string()),
      log_json: layer.log_json.unwrap_or(false),
    })
  }

  /// Latch hold duration in milliseconds, derived from `latch_ticks` at
  /// the configured tick rate rather than hardcoded, so a slower tick
  /// rate still yields a sane real-time hold.
  pub fn latch_ms(&self) -> u64 {
    (self.latch_ticks as u64 * 1000) / self.tick_hz as u64
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_alone_resolve_to_spec_defaults() {
    let config = Config::resolve(None, ConfigLayer::default(), ConfigLayer::default()).unwrap();
    assert_eq!(config.udp_port(), 8765);
    assert_eq!(config.idle_timeout_ms(), 3000);
    assert_eq!(config.tick_hz(), 60);
    assert_eq!(config.ffb_mode(), FfbMode::Hybrid);
  }

  #[test]
  fn cli_layer_wins_over_env_and_file() {
    let file = ConfigLayer {
      udp_port: Some(1111),
      ..ConfigLayer::default()
    };
    let env = ConfigLayer {
      udp_port: Some(2222),
      ..ConfigLayer::default()
    };
    let cli = ConfigLayer {
      udp_port: Some(3333),
      ..ConfigLayer::default()
    };
    let config = Config::resolve(Some(file), env, cli).unwrap();
    assert_eq!(config.udp_port(), 3333);
  }

  #[test]
  fn env_layer_wins_over_file_when_cli_silent() {
    let file = ConfigLayer {
      tick_hz: Some(30),
      ..ConfigLayer::default()
    };
    let env = ConfigLayer {
      tick_hz: Some(45),
      ..ConfigLayer::default()
    };
    let config = Config::resolve(Some(file), env, ConfigLayer::default()).unwrap();
    assert_eq!(config.tick_hz(), 45);
  }

  #[test]
  fn invalid_expo_is_rejected() {
    let cli = ConfigLayer {
      expo: Some(5.0),
      ..ConfigLayer::default()
    };
    let err = Config::resolve(None, ConfigLayer::default(), cli).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
  }

  #[test]
  fn unrecognized_ffb_mode_is_rejected() {
    let cli = ConfigLayer {
      ffb_mode: Some("bogus".to_string()),
      ..ConfigLayer::default()
    };
    let err = Config::resolve(None, ConfigLayer::default(), cli).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
  }

  #[test]
  fn latch_ms_scales_with_tick_rate() {
    let config = Config::resolve(None, ConfigLayer::default(), ConfigLayer::default()).unwrap();
    assert_eq!(config.latch_ms(), 50);
  }
}
