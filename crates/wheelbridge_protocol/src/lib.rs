// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Wire types and codec for the phone <-> host UDP protocol: parsing and
//! validating inbound telemetry datagrams, and serializing FFB replies.

pub mod codec;
pub mod types;

pub use codec::{DecodedDatagram, ProtocolCodec};
pub use types::{
  AudioFeatures,
  ButtonBit,
  FeedbackState,
  FfbMode,
  GamepadState,
  InputPacket,
  NativeFfb,
  RawAxes,
  RawButtons,
  RawMeta,
  WHEEL_SIGNATURE,
};
