// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

pub mod async_manager;

use std::time::Duration;

/// Thin wrapper around `tokio::time::sleep`, kept as a free function so
/// call sites don't need to know which runtime backs the sleep.
pub async fn sleep(duration: Duration) {
  tokio::time::sleep(duration).await;
}
