// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Audio-derived haptic ingestion and FFB mixing: merges native sidecar
//! rumble with synthetic road/impact haptics into the phone reply.

#[macro_use]
extern crate tracing;

pub mod audio;
pub mod mixer;

pub use audio::AudioIngestor;
pub use mixer::{FeedbackMixer, FeedbackMixerConfig};
