// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Line-delimited JSON duplex protocol between the supervisor and the
//! sidecar process.

use serde::{Deserialize, Serialize};
use wheelbridge_protocol::GamepadState;

/// One state push on the sidecar's stdin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatePush {
  pub lx: f32,
  pub ly: f32,
  pub rt: u8,
  pub lt: u8,
  pub buttons: u32,
}

impl From<GamepadState> for StatePush {
  fn from(state: GamepadState) -> Self {
    Self {
      lx: state.lx,
      ly: state.ly,
      rt: state.rt,
      lt: state.lt,
      buttons: state.buttons as u32,
    }
  }
}

impl StatePush {
  pub const NEUTRAL: StatePush = StatePush {
    lx: 0.0,
    ly: 0.0,
    rt: 0,
    lt: 0,
    buttons: 0,
  };

  pub fn to_line(self) -> String {
    serde_json::to_string(&self).expect("StatePush serializes infallibly")
  }
}

/// The `{"type":"target",...}` control line sent to reconfigure the
/// emulated controller class.
#[derive(Debug, Clone, Serialize)]
pub struct TargetControl<'a> {
  #[serde(rename = "type")]
  pub kind: &'static str,
  pub value: &'a str,
}

impl<'a> TargetControl<'a> {
  pub fn new(value: &'a str) -> Self {
    Self {
      kind: "target",
      value,
    }
  }

  pub fn to_line(&self) -> String {
    serde_json::to_string(self).expect("TargetControl serializes infallibly")
  }
}

/// Messages the sidecar emits on its stdout.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SidecarMessage {
  Ready,
  Ffb {
    #[serde(rename = "rumbleL")]
    rumble_l: f32,
    #[serde(rename = "rumbleR")]
    rumble_r: f32,
  },
}

pub fn parse_sidecar_line(line: &str) -> Option<SidecarMessage> {
  serde_json::from_str(line).ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn state_push_serializes_to_expected_shape() {
    let push = StatePush {
      lx: 0.5,
      ly: -0.25,
      rt: 255,
      lt: 0,
      buttons: 1,
    };
    let line = push.to_line();
    assert_eq!(line, r#"{"lx":0.5,"ly":-0.25,"rt":255,"lt":0,"buttons":1}"#);
  }

  #[test]
  fn parses_ready_message() {
    let msg = parse_sidecar_line(r#"{"type":"ready"}"#);
    assert_eq!(msg, Some(SidecarMessage::Ready));
  }

  #[test]
  fn parses_ffb_message() {
    let msg = parse_sidecar_line(r#"{"type":"ffb","rumbleL":0.5,"rumbleR":0.2}"#);
    assert_eq!(
      msg,
      Some(SidecarMessage::Ffb {
        rumble_l: 0.5,
        rumble_r: 0.2
      })
    );
  }

  #[test]
  fn garbage_line_fails_to_parse() {
    assert_eq!(parse_sidecar_line("not json"), None);
  }
}
