// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Translates the phone's reported axes and buttons into a normalized
//! [`GamepadState`], applying the steering curve, trigger mapping, D-pad
//! derivation and button latch.

use wheelbridge_core::SharedClock;
use wheelbridge_protocol::{ButtonBit, GamepadState, InputPacket, RawAxes, RawMeta};

/// Tuning knobs a session can reconfigure between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslatorConfig {
  pub deadzone: f32,
  pub expo: f32,
  pub latch_ms: u64,
}

impl Default for TranslatorConfig {
  fn default() -> Self {
    Self {
      deadzone: 0.06,
      expo: 0.22,
      latch_ms: 50,
    }
  }
}

/// Per-button hold state: the tick deadline before which a `true` output
/// must remain asserted even if the source has already gone false.
#[derive(Debug, Clone, Copy, Default)]
struct Latch {
  expires_at_ms: Option<u64>,
}

/// Stateful translator: one instance per session, since the button latch
/// and `ly`/`lx` continuity depend on prior ticks.
pub struct InputTranslator {
  config: TranslatorConfig,
  clock: SharedClock,
  latches: [Latch; 13],
  prev_source: [bool; 13],
}

impl InputTranslator {
  pub fn new(config: TranslatorConfig, clock: SharedClock) -> Self {
    Self {
      config,
      clock,
      latches: [Latch::default(); 13],
      prev_source: [false; 13],
    }
  }

  pub fn reconfigure(&mut self, config: TranslatorConfig) {
    self.config = config;
  }

  /// Resets latch and edge-tracking state; called when a new session
  /// begins so a prior phone's button holds don't leak forward.
  pub fn reset(&mut self) {
    self.latches = [Latch::default(); 13];
    self.prev_source = [false; 13];
  }

  pub fn translate(&mut self, packet: &InputPacket) -> GamepadState {
    let lx = self.translate_steering(packet);
    let ly = self.translate_ly(packet);
    let rt = to_trigger_value(packet.axes.throttle);
    let lt = to_trigger_value(packet.axes.brake);
    let buttons = self.latch_buttons(packet);

    GamepadState {
      lx,
      ly,
      rt,
      lt,
      buttons,
    }
  }

  fn translate_steering(&self, packet: &InputPacket) -> f32 {
    let raw = match packet.axes.steering_x {
      Some(x) => x,
      None => match tilt_from_gyro(&packet.axes, &packet.meta) {
        Some(x) => x,
        None => {
          let derived_x = dpad_axis(packet, ButtonBit::DPadRight, ButtonBit::DPadLeft);
          resolve_stick_axis(packet.axes.ls_x, derived_x)
        }
      },
    };
    let deadzone = if packet.meta.tilt_dead.abs() > f32::EPSILON {
      packet.meta.tilt_dead
    } else {
      self.config.deadzone
    };
    apply_steering_curve(raw, deadzone, self.config.expo)
  }

  fn translate_ly(&self, packet: &InputPacket) -> f32 {
    let derived_y = dpad_axis(packet, ButtonBit::DPadDown, ButtonBit::DPadUp);
    resolve_stick_axis(packet.axes.ls_y, derived_y).clamp(-1.0, 1.0)
  }

  fn latch_buttons(&mut self, packet: &InputPacket) -> u16 {
    let now = self.clock.now_ms();
    let mut mask = 0u16;
    for bit in ButtonBit::ALL {
      let idx = bit as usize;
      let source = bit.read_from(&packet.buttons);
      let latch = &mut self.latches[idx];

      if source && !self.prev_source[idx] {
        latch.expires_at_ms = Some(now + self.config.latch_ms);
      }

      let held = match latch.expires_at_ms {
        Some(deadline) if now < deadline => true,
        _ => {
          latch.expires_at_ms = None;
          false
        }
      };

      let asserted = source || held;
      if asserted {
        mask |= bit.mask();
      }
      self.prev_source[idx] = source;
    }
    mask
  }
}

fn resolve_stick_axis(packet_value: Option<f32>, derived: f32) -> f32 {
  let packet_value = packet_value.unwrap_or(0.0);
  if packet_value != 0.0 {
    packet_value
  } else {
    derived
  }
}

fn dpad_axis(
  packet: &InputPacket,
  positive: ButtonBit,
  negative: ButtonBit,
) -> f32 {
  let pos = positive.read_from(&packet.buttons) as i32;
  let neg = negative.read_from(&packet.buttons) as i32;
  (pos - neg) as f32
}

/// Computes steering from raw gyro components when the phone hasn't
/// already lock-normalized it into `steering_x`. Returns `None` when no
/// gyro data was sent (both components exactly zero), so callers fall
/// through to the D-pad/`ls_x` derivation instead of reporting a bogus
/// zero angle.
fn tilt_from_gyro(axes: &RawAxes, meta: &RawMeta) -> Option<f32> {
  if axes.gy == 0.0 && axes.gz == 0.0 {
    return None;
  }
  let theta_deg = axes.gy.atan2(axes.gz).to_degrees();
  let lock_deg = if meta.tilt_lock_deg.abs() > f32::EPSILON {
    meta.tilt_lock_deg
  } else {
    45.0
  };
  let mut normalized = theta_deg / lock_deg;
  // screen held in landscape-reverse orientation mirrors the tilt axis.
  if (meta.screen_deg - 270.0).abs() < 1.0 {
    normalized = -normalized;
  }
  Some(normalized.clamp(-1.0, 1.0))
}

/// `x' = sign(x)((1-e)|x| + e|x|^3)`, deadzoned and clamped.
fn apply_steering_curve(x: f32, deadzone: f32, expo: f32) -> f32 {
  if x.abs() < deadzone {
    return 0.0;
  }
  let magnitude = x.abs();
  let curved = (1.0 - expo) * magnitude + expo * magnitude.powi(3);
  curved.copysign(x).clamp(-1.0, 1.0)
}

fn to_trigger_value(axis: f32) -> u8 {
  (axis.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;
  use std::sync::Arc;
  use test_case::test_case;
  use wheelbridge_core::TestClock;
  use wheelbridge_protocol::{RawAxes, RawButtons, RawMeta};

  fn packet_with_steering(x: f32) -> InputPacket {
    InputPacket {
      seq: 1,
      timestamp_ms: 0,
      axes: RawAxes {
        steering_x: Some(x),
        ..RawAxes::default()
      },
      buttons: RawButtons::default(),
      meta: RawMeta::default(),
    }
  }

  fn translator() -> InputTranslator {
    let clock: SharedClock = Arc::new(TestClock::new());
    InputTranslator::new(TranslatorConfig::default(), clock)
  }

  #[test_case(1.0 => 255; "full throttle")]
  #[test_case(0.0 => 0; "no throttle")]
  #[test_case(0.5 => 128; "half throttle rounds")]
  fn trigger_mapping_matches_spec(throttle: f32) -> u8 {
    to_trigger_value(throttle)
  }

  #[test]
  fn deadzone_below_threshold_yields_zero() {
    let out = apply_steering_curve(0.05, 0.06, 0.22);
    assert_eq!(out, 0.0);
  }

  #[test]
  fn steering_is_exact_at_extremes() {
    assert_eq!(apply_steering_curve(1.0, 0.06, 0.22), 1.0);
    assert_eq!(apply_steering_curve(-1.0, 0.06, 0.22), -1.0);
  }

  proptest! {
    #[test]
    fn steering_curve_is_odd_symmetric(x in -1.0f32..=1.0f32) {
      let pos = apply_steering_curve(x, 0.06, 0.22);
      let neg = apply_steering_curve(-x, 0.06, 0.22);
      prop_assert!((pos + neg).abs() < 1e-5);
    }
  }

  #[test]
  fn button_latch_survives_one_dropped_release() {
    let clock = Arc::new(TestClock::new());
    let mut translator = InputTranslator::new(
      TranslatorConfig {
        latch_ms: 48,
        ..TranslatorConfig::default()
      },
      clock.clone() as SharedClock,
    );

    let mut pressed = packet_with_steering(0.0);
    pressed.buttons.a = true;
    let state = translator.translate(&pressed);
    assert!(state.is_button_set(ButtonBit::A));

    let mut released = packet_with_steering(0.0);
    released.seq = 2;
    released.buttons.a = false;
    clock.advance(16);
    let state = translator.translate(&released);
    assert!(state.is_button_set(ButtonBit::A), "latch should still hold");

    clock.advance(48);
    released.seq = 3;
    let state = translator.translate(&released);
    assert!(!state.is_button_set(ButtonBit::A), "latch should have expired");
  }

  #[test]
  fn dpad_derives_left_stick_when_no_steering_reported() {
    let mut packet = InputPacket {
      seq: 1,
      timestamp_ms: 0,
      axes: RawAxes::default(),
      buttons: RawButtons::default(),
      meta: RawMeta::default(),
    };
    packet.buttons.dpad_right = true;
    let mut translator = translator();
    let state = translator.translate(&packet);
    assert!(state.lx > 0.0);
  }

  #[test]
  fn gyro_tilt_is_used_when_steering_x_absent() {
    let packet = InputPacket {
      seq: 1,
      timestamp_ms: 0,
      axes: RawAxes {
        gy: 1.0,
        gz: 1.0,
        ..RawAxes::default()
      },
      buttons: RawButtons::default(),
      meta: RawMeta {
        tilt_lock_deg: 45.0,
        ..RawMeta::default()
      },
    };
    let mut translator = translator();
    let state = translator.translate(&packet);
    // atan2(1,1) = 45 degrees, normalized by a 45 degree lock = 1.0.
    assert!(state.lx > 0.9);
  }

  #[test]
  fn gyro_tilt_is_mirrored_in_reversed_landscape() {
    let packet = InputPacket {
      seq: 1,
      timestamp_ms: 0,
      axes: RawAxes {
        gy: 1.0,
        gz: 1.0,
        ..RawAxes::default()
      },
      buttons: RawButtons::default(),
      meta: RawMeta {
        tilt_lock_deg: 45.0,
        screen_deg: 270.0,
        ..RawMeta::default()
      },
    };
    let mut translator = translator();
    let state = translator.translate(&packet);
    assert!(state.lx < -0.9);
  }

  #[test]
  fn absent_gyro_and_steering_falls_back_to_dpad() {
    let mut packet = InputPacket {
      seq: 1,
      timestamp_ms: 0,
      axes: RawAxes::default(),
      buttons: RawButtons::default(),
      meta: RawMeta::default(),
    };
    packet.buttons.dpad_left = true;
    let mut translator = translator();
    let state = translator.translate(&packet);
    assert!(state.lx < 0.0);
  }

  #[test]
  fn per_packet_tilt_dead_overrides_configured_deadzone() {
    let packet = InputPacket {
      seq: 1,
      timestamp_ms: 0,
      axes: RawAxes {
        steering_x: Some(0.2),
        ..RawAxes::default()
      },
      buttons: RawButtons::default(),
      meta: RawMeta {
        tilt_dead: 0.3,
        ..RawMeta::default()
      },
    };
    let mut translator = translator();
    let state = translator.translate(&packet);
    assert_eq!(state.lx, 0.0, "0.2 is inside the phone's reported 0.3 deadzone");
  }

  #[test]
  fn zero_tilt_dead_falls_back_to_configured_deadzone() {
    let packet = packet_with_steering(0.2);
    let mut translator = InputTranslator::new(
      TranslatorConfig {
        deadzone: 0.5,
        ..TranslatorConfig::default()
      },
      Arc::new(TestClock::new()) as SharedClock,
    );
    let state = translator.translate(&packet);
    assert_eq!(
      state.lx, 0.0,
      "an unset tiltDead (0.0) should not disable the deadzone entirely"
    );
  }

  #[test]
  fn reported_ls_y_wins_over_dpad_when_nonzero() {
    let mut packet = InputPacket {
      seq: 1,
      timestamp_ms: 0,
      axes: RawAxes {
        ls_y: Some(-0.5),
        ..RawAxes::default()
      },
      buttons: RawButtons::default(),
      meta: RawMeta::default(),
    };
    packet.buttons.dpad_down = true;
    let mut translator = translator();
    let state = translator.translate(&packet);
    assert_eq!(state.ly, -0.5);
  }
}
