// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use serde::{Deserialize, Serialize};

/// The literal signature every phone packet must carry, unless `type` is
/// one of the out-of-band control messages.
pub const WHEEL_SIGNATURE: &str = "WHEEL1";

/// Raw axis block of an [`InputPacket`], as sent by the phone. Field names
/// match the wire format's `axis.*` keys, which are a mix of snake_case and
/// a lone camelCase holdover (`latG`).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct RawAxes {
  #[serde(default)]
  pub steering_x: Option<f32>,
  #[serde(default)]
  pub throttle: f32,
  #[serde(default)]
  pub brake: f32,
  #[serde(default, rename = "latG")]
  pub lat_g: f32,
  /// Raw gyro component used to derive tilt on-host when the phone omits
  /// `steering_x` (older app builds send only raw gyro, not the
  /// lock-normalized angle).
  #[serde(default)]
  pub gy: f32,
  #[serde(default)]
  pub gz: f32,
  #[serde(default)]
  pub ls_x: Option<f32>,
  #[serde(default)]
  pub ls_y: Option<f32>,
}

/// Boolean map of the 13 logical buttons the phone can report, keyed on
/// the wire by their display names (`A`, `LB`, `DPadUp`, ...).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawButtons {
  #[serde(default, rename = "A")]
  pub a: bool,
  #[serde(default, rename = "B")]
  pub b: bool,
  #[serde(default, rename = "X")]
  pub x: bool,
  #[serde(default, rename = "Y")]
  pub y: bool,
  #[serde(default, rename = "LB")]
  pub lb: bool,
  #[serde(default, rename = "RB")]
  pub rb: bool,
  #[serde(default, rename = "Start")]
  pub start: bool,
  #[serde(default, rename = "Back")]
  pub back: bool,
  #[serde(default, rename = "HB")]
  pub hb: bool,
  #[serde(default, rename = "DPadUp")]
  pub dpad_up: bool,
  #[serde(default, rename = "DPadDown")]
  pub dpad_down: bool,
  #[serde(default, rename = "DPadLeft")]
  pub dpad_left: bool,
  #[serde(default, rename = "DPadRight")]
  pub dpad_right: bool,
}

/// Tilt/lock tuning metadata the phone reports alongside its axes.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct RawMeta {
  #[serde(default)]
  pub hello: bool,
  #[serde(default)]
  pub screen_deg: f32,
  #[serde(default, rename = "tiltLockDeg")]
  pub tilt_lock_deg: f32,
  #[serde(default, rename = "tiltDead")]
  pub tilt_dead: f32,
}

/// A validated, sequenced telemetry datagram from the phone. Produced only
/// by `ProtocolCodec::decode`, which enforces the signature, sequence and
/// axis-range invariants described in the protocol section of the spec.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputPacket {
  pub seq: u32,
  pub timestamp_ms: u64,
  pub axes: RawAxes,
  pub buttons: RawButtons,
  pub meta: RawMeta,
}

/// The 13 logical buttons, in their fixed bitmask order (bit 0 = `A` …
/// bit 11 = `DPadRight`, bit 12 = `HB`). `HB` (handbrake) is bound to a
/// button bit, never stretched into a trigger — the button-bit
/// interpretation resolving the corresponding open question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ButtonBit {
  A = 0,
  B = 1,
  X = 2,
  Y = 3,
  Lb = 4,
  Rb = 5,
  Start = 6,
  Back = 7,
  DPadUp = 8,
  DPadDown = 9,
  DPadLeft = 10,
  DPadRight = 11,
  Hb = 12,
}

impl ButtonBit {
  pub const ALL: [ButtonBit; 13] = [
    ButtonBit::A,
    ButtonBit::B,
    ButtonBit::X,
    ButtonBit::Y,
    ButtonBit::Lb,
    ButtonBit::Rb,
    ButtonBit::Start,
    ButtonBit::Back,
    ButtonBit::DPadUp,
    ButtonBit::DPadDown,
    ButtonBit::DPadLeft,
    ButtonBit::DPadRight,
    ButtonBit::Hb,
  ];

  pub fn mask(self) -> u16 {
    1u16 << (self as u8)
  }

  /// Reads this button's current state out of the phone's raw button map.
  pub fn read_from(self, buttons: &RawButtons) -> bool {
    match self {
      ButtonBit::A => buttons.a,
      ButtonBit::B => buttons.b,
      ButtonBit::X => buttons.x,
      ButtonBit::Y => buttons.y,
      ButtonBit::Lb => buttons.lb,
      ButtonBit::Rb => buttons.rb,
      ButtonBit::Start => buttons.start,
      ButtonBit::Back => buttons.back,
      ButtonBit::DPadUp => buttons.dpad_up,
      ButtonBit::DPadDown => buttons.dpad_down,
      ButtonBit::DPadLeft => buttons.dpad_left,
      ButtonBit::DPadRight => buttons.dpad_right,
      ButtonBit::Hb => buttons.hb,
    }
  }
}

/// Normalized gamepad state pushed to the sidecar. Every field is kept in
/// its documented range by construction; nothing downstream needs to
/// re-validate it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GamepadState {
  pub lx: f32,
  pub ly: f32,
  pub rt: u8,
  pub lt: u8,
  pub buttons: u16,
}

impl GamepadState {
  pub const NEUTRAL: GamepadState = GamepadState {
    lx: 0.0,
    ly: 0.0,
    rt: 0,
    lt: 0,
    buttons: 0,
  };

  pub fn is_button_set(&self, bit: ButtonBit) -> bool {
    self.buttons & bit.mask() != 0
  }

  /// True if any field differs from `other` by at least the rate-limit
  /// thresholds the supervisor uses to decide whether to push a new
  /// state line: axes by >= 0.006, triggers by >= 1 LSB, any button bit
  /// change.
  pub fn differs_meaningfully_from(&self, other: &GamepadState) -> bool {
    (self.lx - other.lx).abs() >= 0.006
      || (self.ly - other.ly).abs() >= 0.006
      || self.rt != other.rt
      || self.lt != other.lt
      || self.buttons != other.buttons
  }
}

/// FFB telemetry mode, selectable at runtime via the config channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FfbMode {
  Passthrough,
  Synthetic,
  #[default]
  Hybrid,
}

/// Reply sent back to the phone: native or synthesized rumble plus the
/// optional expanded channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeedbackState {
  pub ack: u32,
  pub rumble_l: f32,
  pub rumble_r: f32,
  pub trig_l: f32,
  pub trig_r: f32,
  pub impact: f32,
  pub center: bool,
}

/// Latest audio-derived haptic features, fed by the `AudioIngestor`. Wire
/// keys are `bodyL`/`bodyR`, a camelCase holdover matching the rest of the
/// helper protocol.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AudioFeatures {
  #[serde(default, rename = "bodyL")]
  pub body_l: f32,
  #[serde(default, rename = "bodyR")]
  pub body_r: f32,
  #[serde(default)]
  pub impact: f32,
  #[serde(default)]
  pub engine: f32,
  #[serde(default)]
  pub device: String,
}

/// The native FFB values reported by the sidecar, with the timestamp they
/// were received at (used for passthrough staleness).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NativeFfb {
  pub rumble_l: f32,
  pub rumble_r: f32,
  pub received_at_ms: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn button_bit_layout_matches_spec() {
    assert_eq!(ButtonBit::A.mask(), 0b1);
    assert_eq!(ButtonBit::DPadRight.mask(), 1 << 11);
    assert_eq!(ButtonBit::Hb.mask(), 1 << 12);
  }

  #[test]
  fn neutral_state_has_all_fields_zeroed() {
    let neutral = GamepadState::NEUTRAL;
    assert_eq!(neutral.lx, 0.0);
    assert_eq!(neutral.buttons, 0);
    assert_eq!(neutral.rt, 0);
  }

  #[test]
  fn differs_meaningfully_detects_button_change_only() {
    let a = GamepadState::NEUTRAL;
    let b = GamepadState {
      buttons: ButtonBit::A.mask(),
      ..GamepadState::NEUTRAL
    };
    assert!(a.differs_meaningfully_from(&b));
    assert!(!a.differs_meaningfully_from(&a));
  }

  #[test]
  fn differs_meaningfully_respects_axis_threshold() {
    let a = GamepadState::NEUTRAL;
    let barely = GamepadState {
      lx: 0.005,
      ..GamepadState::NEUTRAL
    };
    let enough = GamepadState {
      lx: 0.006,
      ..GamepadState::NEUTRAL
    };
    assert!(!a.differs_meaningfully_from(&barely));
    assert!(a.differs_meaningfully_from(&enough));
  }
}
