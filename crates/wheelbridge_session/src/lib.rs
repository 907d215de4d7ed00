// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Layered config, UDP endpoint, and the 60 Hz session loop that wires the
//! protocol, translator, bridge supervisor, and feedback mixer together.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod session_loop;
pub mod udp;

pub use config::{Config, ConfigLayer};
pub use session_loop::SessionLoop;
pub use udp::UdpEndpoint;
