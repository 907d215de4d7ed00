// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Merges native (passthrough) FFB from the sidecar with audio-derived
//! synthetic haptics into the [`FeedbackState`] replied to the phone.

use std::collections::VecDeque;

use wheelbridge_protocol::{AudioFeatures, FeedbackState, FfbMode, NativeFfb};

const ZERO_CROSSING_WINDOW_MS: u64 = 300;
const ZERO_CROSSING_THRESHOLD_HZ: f32 = 6.0;
const IMPACT_ATTACK_MS: f32 = 30.0;
const IMPACT_DECAY_MS: f32 = 180.0;
const CENTER_DWELL_MS: u64 = 250;
const CENTER_STEERING_EPSILON: f32 = 0.02;
const HYBRID_EMA_ALPHA: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackMixerConfig {
  pub mode: FfbMode,
  pub stale_ms: u64,
  pub gain_l: f32,
  pub gain_r: f32,
}

impl Default for FeedbackMixerConfig {
  fn default() -> Self {
    Self {
      mode: FfbMode::Hybrid,
      stale_ms: 500,
      gain_l: 1.0,
      gain_r: 1.0,
    }
  }
}

/// Detects oscillation in a signal by counting zero crossings in a
/// trailing window, used as the ABS/slip heuristic.
#[derive(Debug, Default)]
struct ZeroCrossingDetector {
  last_sign: i8,
  crossings: VecDeque<u64>,
}

impl ZeroCrossingDetector {
  fn observe(&mut self, value: f32, now_ms: u64) -> f32 {
    let sign = if value > 1e-4 {
      1
    } else if value < -1e-4 {
      -1
    } else {
      0
    };
    if sign != 0 && self.last_sign != 0 && sign != self.last_sign {
      self.crossings.push_back(now_ms);
    }
    if sign != 0 {
      self.last_sign = sign;
    }
    while let Some(&oldest) = self.crossings.front() {
      if now_ms.saturating_sub(oldest) > ZERO_CROSSING_WINDOW_MS {
        self.crossings.pop_front();
      } else {
        break;
      }
    }
    self.crossings.len() as f32 / (ZERO_CROSSING_WINDOW_MS as f32 / 1000.0)
  }
}

pub struct FeedbackMixer {
  config: FeedbackMixerConfig,
  native: Option<NativeFfb>,
  impact_envelope: f32,
  last_compose_ms: Option<u64>,
  hybrid_l: f32,
  hybrid_r: f32,
  crossing_detector: ZeroCrossingDetector,
  pending_session_center: bool,
  within_center_since: Option<u64>,
  had_large_excursion: bool,
}

impl FeedbackMixer {
  pub fn new(config: FeedbackMixerConfig) -> Self {
    Self {
      config,
      native: None,
      impact_envelope: 0.0,
      last_compose_ms: None,
      hybrid_l: 0.0,
      hybrid_r: 0.0,
      crossing_detector: ZeroCrossingDetector::default(),
      pending_session_center: true,
      within_center_since: None,
      had_large_excursion: false,
    }
  }

  pub fn reconfigure(&mut self, config: FeedbackMixerConfig) {
    self.config = config;
  }

  /// Marks the start of a new session: the next reply's `center` flag is
  /// forced true regardless of steering.
  pub fn reset_for_new_session(&mut self) {
    self.native = None;
    self.impact_envelope = 0.0;
    self.hybrid_l = 0.0;
    self.hybrid_r = 0.0;
    self.pending_session_center = true;
    self.within_center_since = None;
    self.had_large_excursion = false;
  }

  pub fn on_native_ffb(&mut self, rumble_l: f32, rumble_r: f32, received_at_ms: u64) {
    self.native = Some(NativeFfb {
      rumble_l,
      rumble_r,
      received_at_ms,
    });
  }

  pub fn compose(&mut self, ack: u32, steering_lx: f32, audio: &AudioFeatures, now_ms: u64) -> FeedbackState {
    let dt_ms = now_ms.saturating_sub(self.last_compose_ms.unwrap_or(now_ms)) as f32;
    self.last_compose_ms = Some(now_ms);

    let (passthrough_l, passthrough_r) = self.passthrough_values(now_ms);
    let (synthetic_l, synthetic_r, impact, trig_l, trig_r) =
      self.synthetic_values(audio, now_ms, dt_ms);

    let (rumble_l, rumble_r) = match self.config.mode {
      FfbMode::Passthrough => (passthrough_l, passthrough_r),
      FfbMode::Synthetic => (synthetic_l, synthetic_r),
      FfbMode::Hybrid => {
        let target_l = passthrough_l.max(synthetic_l);
        let target_r = passthrough_r.max(synthetic_r);
        self.hybrid_l += HYBRID_EMA_ALPHA * (target_l - self.hybrid_l);
        self.hybrid_r += HYBRID_EMA_ALPHA * (target_r - self.hybrid_r);
        (self.hybrid_l, self.hybrid_r)
      }
    };

    FeedbackState {
      ack,
      rumble_l: rumble_l.clamp(0.0, 1.0),
      rumble_r: rumble_r.clamp(0.0, 1.0),
      trig_l,
      trig_r,
      impact,
      center: self.update_center(steering_lx, now_ms),
    }
  }

  fn passthrough_values(&self, now_ms: u64) -> (f32, f32) {
    match self.native {
      Some(native) if now_ms.saturating_sub(native.received_at_ms) <= self.config.stale_ms => {
        (native.rumble_l, native.rumble_r)
      }
      _ => (0.0, 0.0),
    }
  }

  fn synthetic_values(
    &mut self,
    audio: &AudioFeatures,
    now_ms: u64,
    dt_ms: f32,
  ) -> (f32, f32, f32, f32, f32) {
    let rumble_l = (audio.body_l * self.config.gain_l).clamp(0.0, 1.0);
    let rumble_r = (audio.body_r * self.config.gain_r).clamp(0.0, 1.0);

    if audio.impact > self.impact_envelope {
      let step = if IMPACT_ATTACK_MS > 0.0 {
        dt_ms / IMPACT_ATTACK_MS
      } else {
        1.0
      };
      self.impact_envelope += (audio.impact - self.impact_envelope) * step.min(1.0);
    } else {
      let step = if IMPACT_DECAY_MS > 0.0 {
        dt_ms / IMPACT_DECAY_MS
      } else {
        1.0
      };
      self.impact_envelope -= self.impact_envelope * step.min(1.0);
    }
    self.impact_envelope = self.impact_envelope.clamp(0.0, 1.0);

    let crossing_rate = self.crossing_detector.observe(audio.engine - 0.5, now_ms);
    let slip_like = crossing_rate > ZERO_CROSSING_THRESHOLD_HZ;
    let (trig_l, trig_r) = if slip_like {
      let magnitude = audio.body_r.clamp(0.0, 1.0);
      (magnitude, magnitude)
    } else {
      (0.0, 0.0)
    };

    (rumble_l, rumble_r, self.impact_envelope, trig_l, trig_r)
  }

  fn update_center(&mut self, steering_lx: f32, now_ms: u64) -> bool {
    if self.pending_session_center {
      self.pending_session_center = false;
      self.within_center_since = Some(now_ms);
      return true;
    }

    if steering_lx.abs() > CENTER_STEERING_EPSILON {
      self.had_large_excursion = true;
      self.within_center_since = None;
      return false;
    }

    let since = *self.within_center_since.get_or_insert(now_ms);
    if self.had_large_excursion && now_ms.saturating_sub(since) >= CENTER_DWELL_MS {
      self.had_large_excursion = false;
      return true;
    }
    false
  }
}
