// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Shared clock, error taxonomy, diagnostics counters, and async helpers
//! for the wheel bridge crates.

#[macro_use]
extern crate tracing;

pub mod clock;
pub mod diagnostics;
pub mod errors;
pub mod util;

pub use clock::{Clock, SharedClock, SystemClock, TestClock};
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot};
pub use errors::{
  BridgeError,
  ConfigError,
  FeedbackError,
  SessionError,
  WheelBridgeError,
  WheelBridgeResult,
};
