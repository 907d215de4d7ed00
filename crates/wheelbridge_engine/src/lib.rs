// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! CLI argument parsing and logging setup for the `wheelbridge` binary.
//! The binary itself (`src/bin/main.rs`) owns the tokio runtime and process
//! exit code; this crate only builds the pieces it wires together.

#[macro_use]
extern crate tracing;

pub mod logging;
pub mod options;

pub use options::CliOptions;
