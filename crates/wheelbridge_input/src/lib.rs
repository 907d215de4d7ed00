// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Phone telemetry to normalized `GamepadState` translation: steering
//! curve, trigger mapping, D-pad derivation, and button latching.

pub mod translator;

pub use translator::{InputTranslator, TranslatorConfig};
