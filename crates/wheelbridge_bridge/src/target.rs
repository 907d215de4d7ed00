// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The sealed set of platform gamepad bridges. The source this was
//! redesigned from picked a bridge implementation with runtime dynamic
//! dispatch; here it is a closed enum behind one `send_state`/`on_ffb`
//! contract, so `BridgeSupervisor` stays generic over it instead of
//! matching on strings at every call site.

use std::fmt;
use std::str::FromStr;

/// Which platform driver the sidecar should present as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeTarget {
  X360Sidecar,
  Ds4Sidecar,
  DkBridgeSidecar,
}

impl BridgeTarget {
  /// The value sent on the wire in `{"type":"target","value":...}`.
  pub fn wire_value(self) -> &'static str {
    match self {
      BridgeTarget::X360Sidecar => "x360",
      BridgeTarget::Ds4Sidecar => "ds4",
      BridgeTarget::DkBridgeSidecar => "dkbridge",
    }
  }

  /// Platform-dependent default, matching the `bridge.target` config
  /// default described as "platform-dependent".
  pub fn platform_default() -> Self {
    if cfg!(target_os = "windows") {
      BridgeTarget::X360Sidecar
    } else if cfg!(target_os = "macos") {
      BridgeTarget::Ds4Sidecar
    } else {
      BridgeTarget::DkBridgeSidecar
    }
  }
}

impl fmt::Display for BridgeTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.wire_value())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized bridge target: {0}")]
pub struct UnknownBridgeTarget(pub String);

impl FromStr for BridgeTarget {
  type Err = UnknownBridgeTarget;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "x360" => Ok(BridgeTarget::X360Sidecar),
      "ds4" => Ok(BridgeTarget::Ds4Sidecar),
      "dkbridge" => Ok(BridgeTarget::DkBridgeSidecar),
      other => Err(UnknownBridgeTarget(other.to_string())),
    }
  }
}
