// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Exercises the `wheelbridge` binary's argument handling end to end,
//! asserting the exit codes documented for the configuration-failure
//! paths.

use std::process::Command;

fn binary() -> Command {
  Command::new(env!("CARGO_BIN_EXE_wheelbridge"))
}

#[test]
fn version_flag_exits_successfully() {
  let output = binary().arg("--version").output().unwrap();
  assert!(output.status.success());
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("wheelbridge"));
}

#[test]
fn missing_config_file_exits_with_code_two() {
  let output = binary()
    .args(["--config-file", "/nonexistent/wheelbridge.toml"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unrecognized_ffb_mode_exits_with_code_two() {
  let output = binary().args(["--ffb-mode", "bogus"]).output().unwrap();
  assert_eq!(output.status.code(), Some(2));
}
