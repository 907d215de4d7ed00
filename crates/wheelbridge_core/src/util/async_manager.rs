// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Single point of task spawning. Keeping all `tokio::spawn` calls behind
//! one function makes it possible to swap the runtime (or add
//! instrumentation) without touching every call site.

use std::future::Future;

pub fn spawn<Fut>(future: Fut)
where
  Fut: Future<Output = ()> + Send + 'static,
{
  tokio::spawn(future);
}
