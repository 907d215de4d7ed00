// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The single-threaded cooperative core: ties `UdpEndpoint`,
//! `ProtocolCodec`, `InputTranslator`, `BridgeSupervisor`, `FeedbackMixer`
//! and `AudioIngestor` together at a fixed tick rate. Depends on all of
//! them explicitly — there is no global state besides this loop itself.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use wheelbridge_bridge::supervisor::BridgeSupervisorHandle;
use wheelbridge_bridge::{BridgeEvent, BridgeSupervisorConfig};
use wheelbridge_core::errors::WheelBridgeResult;
use wheelbridge_core::{Diagnostics, SharedClock};
use wheelbridge_feedback::{AudioIngestor, FeedbackMixer, FeedbackMixerConfig};
use wheelbridge_input::{InputTranslator, TranslatorConfig};
use wheelbridge_protocol::{DecodedDatagram, GamepadState, InputPacket, ProtocolCodec};

use crate::config::Config;
use crate::udp::UdpEndpoint;

struct SessionState {
  peer: SocketAddr,
  last_seq: Option<u32>,
  last_datagram_ms: u64,
  background: bool,
}

pub struct SessionLoop {
  endpoint: UdpEndpoint,
  codec: ProtocolCodec,
  translator: InputTranslator,
  mixer: FeedbackMixer,
  audio: AudioIngestor,
  bridge: BridgeSupervisorHandle,
  bridge_events: tokio::sync::mpsc::Receiver<BridgeEvent>,
  bridge_join: JoinHandle<WheelBridgeResult<()>>,
  clock: SharedClock,
  diagnostics: Arc<Diagnostics>,
  config: Config,
  session: Option<SessionState>,
  staged_state: GamepadState,
  cancellation: CancellationToken,
}

impl SessionLoop {
  pub async fn bind(
    config: Config,
    clock: SharedClock,
    diagnostics: Arc<Diagnostics>,
    cancellation: CancellationToken,
  ) -> WheelBridgeResult<Self> {
    let endpoint = UdpEndpoint::bind(config.udp_port()).await?;

    let translator = InputTranslator::new(
      TranslatorConfig {
        deadzone: config.deadzone(),
        expo: config.expo(),
        latch_ms: config.latch_ms(),
      },
      clock.clone(),
    );

    let mixer = FeedbackMixer::new(FeedbackMixerConfig {
      mode: config.ffb_mode(),
      stale_ms: config.ffb_stale_ms(),
      gain_l: config.ffb_gain_l(),
      gain_r: config.ffb_gain_r(),
    });

    let audio = match config.audio_helper() {
      Some(path) if !path.is_empty() => AudioIngestor::spawn(path)?,
      _ => AudioIngestor::disabled(),
    };

    let bridge_exe = config
      .bridge_exe()
      .clone()
      .unwrap_or_else(|| format!("wheelbridge-sidecar-{}", config.bridge_target()));
    let bridge_config =
      BridgeSupervisorConfig::new(bridge_exe, config.bridge_target(), config.keepalive_ms());
    let (bridge, bridge_events, bridge_join) = wheelbridge_bridge::supervisor::spawn(
      bridge_config,
      clock.clone(),
      diagnostics.clone(),
      cancellation.child_token(),
    );

    Ok(Self {
      endpoint,
      codec: ProtocolCodec::new(),
      translator,
      mixer,
      audio,
      bridge,
      bridge_events,
      bridge_join,
      clock,
      diagnostics,
      config,
      session: None,
      staged_state: GamepadState::NEUTRAL,
      cancellation,
    })
  }

  /// Runs until cancellation fires, then tears down in the documented
  /// order and returns. A sidecar-supervisor fatal error (backoff ceiling
  /// reached before it ever connected) short-circuits the loop.
  pub async fn run(mut self) -> WheelBridgeResult<()> {
    let tick_duration = Duration::from_millis(1000 / self.config.tick_hz() as u64);
    let mut ticker = tokio::time::interval(tick_duration);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;

        _ = self.cancellation.cancelled() => {
          self.teardown().await;
          return Ok(());
        }

        bridge_result = &mut self.bridge_join => {
          // The supervisor task only exits on its own for two reasons:
          // a cooperative shutdown (Ok) or exhausting the backoff
          // ceiling before ever connecting (Err), which is fatal.
          self.teardown().await;
          return match bridge_result {
            Ok(result) => result,
            Err(_join_error) => Ok(()),
          };
        }

        _ = ticker.tick() => {
          self.tick().await;
        }
      }
    }
  }

  async fn tick(&mut self) {
    let now = self.clock.now_ms();
    self.drain_udp(now).await;
    self.drain_bridge_events();
    self.check_idle_timeout(now).await;
    self.publish(now).await;
  }

  async fn drain_udp(&mut self, now: u64) {
    while let Some((payload, from)) = self.endpoint.try_recv() {
      if let Some(session) = &self.session {
        if from != session.peer {
          self.diagnostics.record_rejected_foreign_peer();
          debug!(target: "wheelbridge.session", "dropped datagram from foreign peer {from}");
          continue;
        }
      }

      let last_seq = self.session.as_ref().and_then(|s| s.last_seq);
      match self.codec.decode(&payload, last_seq) {
        DecodedDatagram::HelloOrInput(packet) => self.handle_input(packet, from, now),
        DecodedDatagram::Disconnect => self.handle_disconnect().await,
        DecodedDatagram::Background => self.handle_background(now),
        DecodedDatagram::FineTuneIgnored => self.diagnostics.record_finetune(),
        DecodedDatagram::Ignore => self.diagnostics.record_protocol_drift(),
      }
    }
  }

  fn handle_input(&mut self, packet: InputPacket, from: SocketAddr, now: u64) {
    if self.session.is_none() {
      self.session = Some(SessionState {
        peer: from,
        last_seq: None,
        last_datagram_ms: now,
        background: false,
      });
      self.translator.reset();
      self.mixer.reset_for_new_session();
      info!(target: "wheelbridge.session", "session established with {from}");
    }

    self.diagnostics.record_lat_g(packet.axes.lat_g);
    self.staged_state = self.translator.translate(&packet);

    if let Some(session) = &mut self.session {
      session.last_seq = Some(packet.seq);
      session.last_datagram_ms = now;
      session.background = false;
    }
  }

  fn handle_background(&mut self, now: u64) {
    self.staged_state = GamepadState::NEUTRAL;
    if let Some(session) = &mut self.session {
      session.last_datagram_ms = now;
      session.background = true;
    }
  }

  async fn handle_disconnect(&mut self) {
    if self.session.take().is_some() {
      info!(target: "wheelbridge.session", "session disconnected by phone");
    }
    self.staged_state = GamepadState::NEUTRAL;
    self.bridge.push(GamepadState::NEUTRAL).await;
  }

  fn drain_bridge_events(&mut self) {
    while let Ok(event) = self.bridge_events.try_recv() {
      match event {
        BridgeEvent::Ready => info!(target: "wheelbridge.bridge", "sidecar ready"),
        BridgeEvent::Ffb {
          rumble_l,
          rumble_r,
          received_at_ms,
        } => self.mixer.on_native_ffb(rumble_l, rumble_r, received_at_ms),
      }
    }
  }

  async fn check_idle_timeout(&mut self, now: u64) {
    let expired = self
      .session
      .as_ref()
      .map(|s| now.saturating_sub(s.last_datagram_ms) > self.config.idle_timeout_ms())
      .unwrap_or(false);
    if expired {
      info!(target: "wheelbridge.session", "session idle timeout");
      self.handle_disconnect().await;
    }
  }

  async fn publish(&mut self, now: u64) {
    let Some(session) = &self.session else {
      return;
    };
    let peer = session.peer;
    let ack = session.last_seq.unwrap_or(0);

    self.bridge.push(self.staged_state).await;

    let audio_features = self.audio.latest();
    let reply = self
      .mixer
      .compose(ack, self.staged_state.lx, &audio_features, now);
    let line = self.codec.encode_reply(&reply);
    let _ = self.endpoint.send(line.as_bytes(), peer).await;
  }

  /// Teardown order: stop accepting packets (implicit, loop is exiting),
  /// flush a neutral state, send one final reply, then let the bridge
  /// supervisor's own cancellation-triggered flush close the pipe.
  async fn teardown(&mut self) {
    if let Some(session) = self.session.take() {
      self.bridge.push(GamepadState::NEUTRAL).await;
      let audio_features = self.audio.latest();
      let reply = self.mixer.compose(
        session.last_seq.unwrap_or(0),
        0.0,
        &audio_features,
        self.clock.now_ms(),
      );
      let line = self.codec.encode_reply(&reply);
      let _ = self.endpoint.send(line.as_bytes(), session.peer).await;
    }
    self.bridge.shutdown().await;
  }
}
