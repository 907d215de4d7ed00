// Wheel Bridge Source Code File.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! A bound, non-blocking UDP socket. Peer admission is not this type's
//! concern: it hands every datagram it receives to the caller along with
//! the sender's address, and the session loop decides whether that sender
//! is the pinned peer, a candidate for a brand new session (once
//! `ProtocolCodec` has validated the payload), or a stray to drop and
//! count.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use wheelbridge_core::errors::SessionError;

const MAX_DATAGRAM_BYTES: usize = 2048;

pub struct UdpEndpoint {
  socket: UdpSocket,
}

impl UdpEndpoint {
  pub async fn bind(port: u16) -> Result<Self, SessionError> {
    let addr = format!("0.0.0.0:{port}");
    let socket = UdpSocket::bind(&addr)
      .await
      .map_err(|e| SessionError::UdpBind(addr, e))?;
    Ok(Self { socket })
  }

  /// The address the socket actually bound to; useful when `port` was 0
  /// and the OS picked an ephemeral one.
  pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
    self.socket.local_addr()
  }

  /// Pulls the next queued datagram off the socket, if any. Does not
  /// retry or buffer — losses are handled by the protocol's idempotent,
  /// state-push design — and does no peer filtering of its own.
  pub fn try_recv(&self) -> Option<(Vec<u8>, SocketAddr)> {
    let mut buf = [0u8; MAX_DATAGRAM_BYTES];
    match self.socket.try_recv_from(&mut buf) {
      Ok((len, from)) => Some((buf[..len].to_vec(), from)),
      Err(_) => None,
    }
  }

  pub async fn send(&self, payload: &[u8], peer: SocketAddr) -> Result<(), SessionError> {
    self
      .socket
      .send_to(payload, peer)
      .await
      .map(|_| ())
      .map_err(SessionError::UdpSend)
  }
}
