// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Sets up the global `tracing` subscriber. Text output goes to stdout by
//! default; `log_json` switches to line-delimited JSON for log shippers.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. Idempotent only in the sense that a
/// second call will fail loudly (`try_init` returns `Err`); the CLI entry
/// point calls this exactly once.
pub fn init(log_level: &str, json: bool) {
  let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

  if json {
    let registry = tracing_subscriber::registry()
      .with(filter)
      .with(fmt::layer().json().with_current_span(false));
    if registry.try_init().is_err() {
      eprintln!("logging already initialized");
    }
  } else {
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());
    if registry.try_init().is_err() {
      eprintln!("logging already initialized");
    }
  }
}
