// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

use std::sync::Arc;

use clap::Parser;
use tokio::signal::ctrl_c;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use wheelbridge_core::{Diagnostics, SharedClock, SystemClock, WheelBridgeError};
use wheelbridge_engine::{logging, CliOptions};
use wheelbridge_session::{Config, ConfigLayer, SessionLoop};

#[tokio::main]
async fn main() {
  let args = CliOptions::parse();

  let file_layer = match &args.config_file {
    Some(path) => match std::fs::read_to_string(path) {
      Ok(contents) => match ConfigLayer::from_toml_str(&contents, path) {
        Ok(layer) => Some(layer),
        Err(err) => {
          eprintln!("wheelbridge: {err}");
          std::process::exit(WheelBridgeError::from(err).exit_code());
        }
      },
      Err(err) => {
        eprintln!("wheelbridge: failed to read config file {path}: {err}");
        std::process::exit(2);
      }
    },
    None => None,
  };

  let env_layer = ConfigLayer::from_env();
  let cli_layer = ConfigLayer::from(args);

  let config = match Config::resolve(file_layer, env_layer, cli_layer) {
    Ok(config) => config,
    Err(err) => {
      eprintln!("wheelbridge: {err}");
      std::process::exit(WheelBridgeError::from(err).exit_code());
    }
  };

  logging::init(config.log_level(), config.log_json());

  let exit_code = run(config).await;
  std::process::exit(exit_code);
}

async fn run(config: Config) -> i32 {
  let clock: SharedClock = Arc::new(SystemClock::new());
  let diagnostics = Arc::new(Diagnostics::new());
  let cancellation = CancellationToken::new();

  let session = match SessionLoop::bind(config, clock, diagnostics, cancellation.clone()).await {
    Ok(session) => session,
    Err(err) => {
      error!("failed to start session: {err}");
      return err.exit_code();
    }
  };

  let ctrl_c_token = cancellation.clone();
  tokio::spawn(async move {
    if ctrl_c().await.is_ok() {
      info!("control-c received, shutting down");
      ctrl_c_token.cancel();
    }
  });

  match session.run().await {
    Ok(()) => 0,
    Err(err) => {
      error!("wheel bridge exited with error: {err}");
      err.exit_code()
    }
  }
}
