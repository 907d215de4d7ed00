// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Owns exactly one sidecar process. Spawns it, feeds it state pushes and
//! target changes, respawns it with exponential backoff on crash, and
//! forwards its `ready`/`ffb` lines as typed [`BridgeEvent`]s — no
//! back-reference into the session loop, only a queue it owns.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use wheelbridge_core::errors::{BridgeError, WheelBridgeResult};
use wheelbridge_core::{util::async_manager, Diagnostics, SharedClock};
use wheelbridge_protocol::GamepadState;

use crate::protocol::{parse_sidecar_line, SidecarMessage, StatePush, TargetControl};
use crate::target::BridgeTarget;

const BACKOFF_INITIAL_MS: u64 = 100;
const BACKOFF_CAP_MS: u64 = 5_000;
const RESPAWN_QUEUE_TTL_MS: u64 = 250;
const PARSE_FAILURE_TOLERANCE: u32 = 10;
const READER_QUEUE_CAPACITY: usize = 256;
const SHUTDOWN_GRACE_MS: u64 = 500;

/// Typed events the supervisor forwards out of the sidecar's stdout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeEvent {
  Ready,
  Ffb {
    rumble_l: f32,
    rumble_r: f32,
    received_at_ms: u64,
  },
}

enum SupervisorCommand {
  Push(GamepadState),
  Retarget(BridgeTarget),
  Shutdown,
}

enum ReaderMessage {
  Line(String),
  Eof,
}

/// Handle held by the session loop to talk to a running supervisor task.
#[derive(Clone)]
pub struct BridgeSupervisorHandle {
  commands: mpsc::Sender<SupervisorCommand>,
}

impl BridgeSupervisorHandle {
  pub async fn push(&self, state: GamepadState) {
    let _ = self.commands.send(SupervisorCommand::Push(state)).await;
  }

  pub async fn retarget(&self, target: BridgeTarget) {
    let _ = self.commands.send(SupervisorCommand::Retarget(target)).await;
  }

  pub async fn shutdown(&self) {
    let _ = self.commands.send(SupervisorCommand::Shutdown).await;
  }
}

#[derive(Debug, Clone)]
pub struct BridgeSupervisorConfig {
  pub exe: String,
  pub target: BridgeTarget,
  pub keepalive_ms: u64,
}

impl BridgeSupervisorConfig {
  pub fn new(exe: impl Into<String>, target: BridgeTarget, keepalive_ms: u64) -> Self {
    Self {
      exe: exe.into(),
      target,
      keepalive_ms,
    }
  }
}

/// Spawns the supervisor task. Returns a handle to push state, the event
/// stream, and a join handle whose `Err` is fatal (backoff ceiling reached
/// before the sidecar ever came up) and should propagate to exit code 4.
pub fn spawn(
  config: BridgeSupervisorConfig,
  clock: SharedClock,
  diagnostics: Arc<Diagnostics>,
  cancellation: CancellationToken,
) -> (
  BridgeSupervisorHandle,
  mpsc::Receiver<BridgeEvent>,
  JoinHandle<WheelBridgeResult<()>>,
) {
  let (command_tx, command_rx) = mpsc::channel(32);
  let (event_tx, event_rx) = mpsc::channel(64);

  let join = tokio::spawn(run_supervisor(
    config,
    clock,
    diagnostics,
    cancellation,
    command_rx,
    event_tx,
  ));

  (BridgeSupervisorHandle { commands: command_tx }, event_rx, join)
}

async fn run_supervisor(
  config: BridgeSupervisorConfig,
  clock: SharedClock,
  diagnostics: Arc<Diagnostics>,
  cancellation: CancellationToken,
  mut commands: mpsc::Receiver<SupervisorCommand>,
  events: mpsc::Sender<BridgeEvent>,
) -> WheelBridgeResult<()> {
  let mut target = config.target;
  let mut backoff_ms = BACKOFF_INITIAL_MS;
  let mut ever_connected = false;
  let mut desired = GamepadState::NEUTRAL;
  let mut desired_enqueued_ms = clock.now_ms();

  loop {
    if cancellation.is_cancelled() {
      return Ok(());
    }

    let spawned = spawn_child(&config.exe).await;
    let (mut child, mut stdin, mut reader_rx) = match spawned {
      Ok(parts) => parts,
      Err(err) => {
        diagnostics.record_transient_io_error();
        warn!(target: "wheelbridge.bridge", "sidecar spawn failed: {err}");
        if !ever_connected && backoff_ms >= BACKOFF_CAP_MS {
          return Err(BridgeError::NoSidecarAvailable.into());
        }
        tokio::select! {
          _ = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
          _ = cancellation.cancelled() => return Ok(()),
        }
        backoff_ms = (backoff_ms * 2).min(BACKOFF_CAP_MS);
        continue;
      }
    };

    let _ = send_line(&mut stdin, &TargetControl::new(target.wire_value()).to_line()).await;

    let outcome = run_connected(
      &mut stdin,
      &mut reader_rx,
      &mut target,
      &clock,
      &diagnostics,
      &cancellation,
      &mut commands,
      &events,
      &mut desired,
      &mut desired_enqueued_ms,
      config.keepalive_ms,
    )
    .await;

    shutdown_child(&mut child, &mut stdin).await;

    match outcome {
      ConnectedOutcome::Shutdown => return Ok(()),
      ConnectedOutcome::ChildLost => {
        ever_connected = true;
        diagnostics.record_sidecar_restart();
        backoff_ms = BACKOFF_INITIAL_MS;
      }
    }
  }
}

enum ConnectedOutcome {
  Shutdown,
  ChildLost,
}

#[allow(clippy::too_many_arguments)]
async fn run_connected(
  stdin: &mut ChildStdin,
  reader_rx: &mut mpsc::Receiver<ReaderMessage>,
  target: &mut BridgeTarget,
  clock: &SharedClock,
  diagnostics: &Arc<Diagnostics>,
  cancellation: &CancellationToken,
  commands: &mut mpsc::Receiver<SupervisorCommand>,
  events: &mpsc::Sender<BridgeEvent>,
  desired: &mut GamepadState,
  desired_enqueued_ms: &mut u64,
  keepalive_ms: u64,
) -> ConnectedOutcome {
  let mut last_sent = GamepadState::NEUTRAL;
  let mut last_sent_ms = clock.now_ms();
  let mut parse_failures: u32 = 0;

  loop {
    let now = clock.now_ms();
    let keepalive_wait = (last_sent_ms + keepalive_ms).saturating_sub(now);

    tokio::select! {
      biased;

      cmd = commands.recv() => {
        match cmd {
          Some(SupervisorCommand::Push(state)) => {
            *desired = state;
            *desired_enqueued_ms = clock.now_ms();
          }
          Some(SupervisorCommand::Retarget(new_target)) => {
            if new_target != *target {
              *target = new_target;
              let _ = send_line(stdin, &TargetControl::new(target.wire_value()).to_line()).await;
            }
          }
          Some(SupervisorCommand::Shutdown) | None => {
            let _ = send_line(stdin, &StatePush::NEUTRAL.to_line()).await;
            return ConnectedOutcome::Shutdown;
          }
        }
      }

      reader_msg = reader_rx.recv() => {
        match reader_msg {
          Some(ReaderMessage::Line(line)) => {
            match parse_sidecar_line(&line) {
              Some(SidecarMessage::Ready) => {
                parse_failures = 0;
                let _ = events.send(BridgeEvent::Ready).await;
              }
              Some(SidecarMessage::Ffb { rumble_l, rumble_r }) => {
                parse_failures = 0;
                let _ = events
                  .send(BridgeEvent::Ffb {
                    rumble_l,
                    rumble_r,
                    received_at_ms: clock.now_ms(),
                  })
                  .await;
              }
              None => {
                parse_failures += 1;
                diagnostics.record_transient_io_error();
                if parse_failures >= PARSE_FAILURE_TOLERANCE {
                  warn!(target: "wheelbridge.bridge", "sidecar sent {parse_failures} unparseable lines, restarting");
                  return ConnectedOutcome::ChildLost;
                }
              }
            }
          }
          Some(ReaderMessage::Eof) | None => {
            return ConnectedOutcome::ChildLost;
          }
        }
      }

      _ = tokio::time::sleep(Duration::from_millis(keepalive_wait)) => {}

      _ = cancellation.cancelled() => {
        let _ = send_line(stdin, &StatePush::NEUTRAL.to_line()).await;
        return ConnectedOutcome::Shutdown;
      }
    }

    let now = clock.now_ms();
    let stale = now.saturating_sub(*desired_enqueued_ms) > RESPAWN_QUEUE_TTL_MS;
    let changed = desired.differs_meaningfully_from(&last_sent);
    let keepalive_due = now >= last_sent_ms + keepalive_ms;

    if !stale && (changed || keepalive_due) {
      let push = StatePush::from(*desired);
      if send_line(stdin, &push.to_line()).await.is_err() {
        return ConnectedOutcome::ChildLost;
      }
      last_sent = *desired;
      last_sent_ms = now;
    }
  }
}

async fn spawn_child(
  exe: &str,
) -> Result<(Child, ChildStdin, mpsc::Receiver<ReaderMessage>), BridgeError> {
  let mut cmd = Command::new(exe);
  cmd
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

  let mut child = cmd
    .spawn()
    .map_err(|e| BridgeError::Spawn(exe.to_string(), e))?;

  let stdin = child.stdin.take().ok_or(BridgeError::StdinUnavailable)?;
  let stdout = child.stdout.take().ok_or(BridgeError::StdoutUnavailable)?;
  let stderr = child.stderr.take();

  if let Some(stderr) = stderr {
    async_manager::spawn(async move {
      let mut reader = BufReader::new(stderr);
      let mut line = String::new();
      loop {
        line.clear();
        match reader.read_line(&mut line).await {
          Ok(0) | Err(_) => break,
          Ok(_) => {
            let trimmed = line.trim_end();
            if !trimmed.is_empty() {
              warn!(target: "wheelbridge.bridge.stderr", "{trimmed}");
            }
          }
        }
      }
    });
  }

  let (reader_tx, reader_rx) = mpsc::channel(READER_QUEUE_CAPACITY);
  async_manager::spawn(async move {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
      line.clear();
      match reader.read_line(&mut line).await {
        Ok(0) => {
          let _ = reader_tx.send(ReaderMessage::Eof).await;
          break;
        }
        Ok(_) => {
          let trimmed = line.trim_end().to_string();
          if !trimmed.is_empty() && reader_tx.try_send(ReaderMessage::Line(trimmed)).is_err() {
            trace!(target: "wheelbridge.bridge", "sidecar reader queue full, dropping line");
          }
        }
        Err(_) => {
          let _ = reader_tx.send(ReaderMessage::Eof).await;
          break;
        }
      }
    }
  });

  Ok((child, stdin, reader_rx))
}

async fn send_line(stdin: &mut ChildStdin, line: &str) -> std::io::Result<()> {
  stdin.write_all(line.as_bytes()).await?;
  stdin.write_all(b"\n").await?;
  stdin.flush().await
}

/// Closes the sidecar's stdin and gives it `SHUTDOWN_GRACE_MS` to exit on
/// its own before hard-killing it. The sidecar's contract is to exit when
/// it sees stdin close; a stuck or hung process still gets reaped.
async fn shutdown_child(child: &mut Child, stdin: &mut ChildStdin) {
  let _ = stdin.shutdown().await;
  let exited = tokio::time::timeout(Duration::from_millis(SHUTDOWN_GRACE_MS), child.wait()).await;
  if exited.is_err() {
    let _ = child.kill().await;
    let _ = child.wait().await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backoff_doubles_and_caps() {
    let mut backoff = BACKOFF_INITIAL_MS;
    let mut seen = vec![backoff];
    for _ in 0..8 {
      backoff = (backoff * 2).min(BACKOFF_CAP_MS);
      seen.push(backoff);
    }
    assert_eq!(seen.last(), Some(&BACKOFF_CAP_MS));
    assert!(seen.windows(2).all(|w| w[1] >= w[0]));
  }
}
