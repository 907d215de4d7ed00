// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Sidecar gamepad driver process supervision: spawn, line-delimited JSON
//! duplex, exponential backoff, and FFB event forwarding.

#[macro_use]
extern crate tracing;

pub mod protocol;
pub mod supervisor;
pub mod target;

pub use protocol::{SidecarMessage, StatePush, TargetControl};
pub use supervisor::{BridgeEvent, BridgeSupervisorConfig, BridgeSupervisorHandle};
pub use target::BridgeTarget;
