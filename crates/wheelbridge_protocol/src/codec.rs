// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Parses phone datagrams into [`DecodedDatagram`] and serializes
//! [`FeedbackState`] replies. Stateless: sequence bookkeeping belongs to
//! the session that owns `last_seq`, not to the codec.

use serde::Deserialize;

use crate::types::{FeedbackState, InputPacket, RawAxes, RawButtons, RawMeta, WHEEL_SIGNATURE};

#[derive(Debug, Deserialize)]
struct RawEnvelope {
  #[serde(default)]
  sig: Option<String>,
  #[serde(default)]
  seq: Option<u32>,
  #[serde(default)]
  t: u64,
  #[serde(default)]
  axis: RawAxes,
  #[serde(default)]
  buttons: RawButtons,
  #[serde(default)]
  meta: RawMeta,
  #[serde(default, rename = "type")]
  kind: Option<String>,
}

/// Outcome of decoding one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedDatagram {
  HelloOrInput(InputPacket),
  Disconnect,
  Background,
  Ignore,
  /// A `type: "finetune"` message: ignored like any other, but counted
  /// separately in diagnostics since it's a recognized message the phone
  /// intentionally sent, not protocol drift.
  FineTuneIgnored,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolCodec;

impl ProtocolCodec {
  pub fn new() -> Self {
    Self
  }

  /// Decodes one raw UDP payload. `last_seq` is the last accepted
  /// sequence number of the active session, or `None` if no session is
  /// established yet.
  pub fn decode(&self, payload: &[u8], last_seq: Option<u32>) -> DecodedDatagram {
    if payload.first() != Some(&b'{') {
      return DecodedDatagram::Ignore;
    }
    let envelope: RawEnvelope = match serde_json::from_slice(payload) {
      Ok(env) => env,
      Err(_) => return DecodedDatagram::Ignore,
    };

    if let Some(kind) = envelope.kind.as_deref() {
      return match kind {
        "disconnect" => DecodedDatagram::Disconnect,
        "inbackground" => DecodedDatagram::Background,
        "finetune" => DecodedDatagram::FineTuneIgnored,
        _ => DecodedDatagram::Ignore,
      };
    }

    if envelope.sig.as_deref() != Some(WHEEL_SIGNATURE) {
      return DecodedDatagram::Ignore;
    }
    let seq = match envelope.seq {
      Some(seq) => seq,
      None => return DecodedDatagram::Ignore,
    };
    if let Some(last) = last_seq {
      if seq <= last {
        return DecodedDatagram::Ignore;
      }
    }

    let mut axes = envelope.axis;
    axes.steering_x = axes.steering_x.map(|v| v.clamp(-1.0, 1.0));
    axes.throttle = axes.throttle.clamp(0.0, 1.0);
    axes.brake = axes.brake.clamp(0.0, 1.0);
    axes.ls_x = axes.ls_x.map(|v| v.clamp(-1.0, 1.0));
    axes.ls_y = axes.ls_y.map(|v| v.clamp(-1.0, 1.0));

    DecodedDatagram::HelloOrInput(InputPacket {
      seq,
      timestamp_ms: envelope.t,
      axes,
      buttons: envelope.buttons,
      meta: envelope.meta,
    })
  }

  /// Serializes a reply as one compact JSON line, rounded to three
  /// decimals, with no trailing newline.
  pub fn encode_reply(&self, state: &FeedbackState) -> String {
    format!(
      "{{\"ack\":{},\"rumbleL\":{},\"rumbleR\":{},\"trigL\":{},\"trigR\":{},\"impact\":{},\"center\":{}}}",
      state.ack,
      round3(state.rumble_l),
      round3(state.rumble_r),
      round3(state.trig_l),
      round3(state.trig_r),
      round3(state.impact),
      state.center,
    )
  }
}

fn round3(value: f32) -> f32 {
  (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  fn codec() -> ProtocolCodec {
    ProtocolCodec::new()
  }

  #[test]
  fn non_brace_prefix_is_ignored() {
    let decoded = codec().decode(b"garbage", None);
    assert_eq!(decoded, DecodedDatagram::Ignore);
  }

  #[test]
  fn malformed_json_is_ignored() {
    let decoded = codec().decode(b"{not json", None);
    assert_eq!(decoded, DecodedDatagram::Ignore);
  }

  #[test]
  fn missing_signature_is_ignored() {
    let payload = br#"{"seq":1,"axis":{"throttle":1.0}}"#;
    let decoded = codec().decode(payload, None);
    assert_eq!(decoded, DecodedDatagram::Ignore);
  }

  #[test]
  fn valid_hello_is_accepted() {
    let payload = br#"{"sig":"WHEEL1","seq":1,"axis":{"steering_x":0.0,"throttle":1.0,"brake":0.0},"buttons":{"A":true},"meta":{"hello":true}}"#;
    match codec().decode(payload, None) {
      DecodedDatagram::HelloOrInput(packet) => {
        assert_eq!(packet.seq, 1);
        assert_eq!(packet.axes.throttle, 1.0);
        assert!(packet.buttons.a);
        assert!(packet.meta.hello);
      }
      other => panic!("expected HelloOrInput, got {other:?}"),
    }
  }

  #[test_case(1, Some(1) => DecodedDatagram::Ignore; "equal seq is dropped")]
  #[test_case(1, Some(2) => DecodedDatagram::Ignore; "older seq is dropped")]
  fn seq_regression_is_ignored(seq: u32, last_seq: Option<u32>) -> DecodedDatagram {
    let payload = format!(r#"{{"sig":"WHEEL1","seq":{seq}}}"#);
    codec().decode(payload.as_bytes(), last_seq)
  }

  #[test]
  fn disconnect_type_short_circuits_signature_check() {
    let payload = br#"{"type":"disconnect"}"#;
    assert_eq!(codec().decode(payload, Some(5)), DecodedDatagram::Disconnect);
  }

  #[test]
  fn inbackground_type_is_recognized() {
    let payload = br#"{"type":"inbackground"}"#;
    assert_eq!(codec().decode(payload, Some(5)), DecodedDatagram::Background);
  }

  #[test]
  fn finetune_type_is_counted_separately_from_drift() {
    let payload = br#"{"type":"finetune","value":1.0}"#;
    assert_eq!(
      codec().decode(payload, Some(5)),
      DecodedDatagram::FineTuneIgnored
    );
  }

  #[test]
  fn axes_are_clamped_to_declared_ranges() {
    let payload = br#"{"sig":"WHEEL1","seq":1,"axis":{"steering_x":5.0,"throttle":9.0,"brake":-3.0}}"#;
    match codec().decode(payload, None) {
      DecodedDatagram::HelloOrInput(packet) => {
        assert_eq!(packet.axes.steering_x, Some(1.0));
        assert_eq!(packet.axes.throttle, 1.0);
        assert_eq!(packet.axes.brake, 0.0);
      }
      other => panic!("expected HelloOrInput, got {other:?}"),
    }
  }

  #[test]
  fn reply_is_rounded_to_three_decimals() {
    let state = FeedbackState {
      ack: 7,
      rumble_l: 0.123456,
      rumble_r: 0.0,
      trig_l: 0.0,
      trig_r: 0.0,
      impact: 0.999999,
      center: true,
    };
    let line = codec().encode_reply(&state);
    assert_eq!(
      line,
      "{\"ack\":7,\"rumbleL\":0.123,\"rumbleR\":0,\"trigL\":0,\"trigR\":0,\"impact\":1,\"center\":true}"
    );
  }
}
