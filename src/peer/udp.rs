//! Plaintext/symmetric-encrypted UDP peer transport (§4.6).

use super::replication::PeerEvent;
use super::transport::PeerTransport;
use crate::error::DawnError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

/// Encrypts an outbound envelope. Symmetric peer encryption (§4.6) is
/// delegated here; `Identity` performs no transformation and is only
/// suitable for trusted networks.
pub trait PeerCipher: Send + Sync {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8>;
}

pub struct Identity;
impl PeerCipher for Identity {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        plaintext.to_vec()
    }
}

pub struct UdpPeerTransport<C: PeerCipher> {
    socket: Arc<UdpSocket>,
    peers: Arc<Mutex<Vec<SocketAddr>>>,
    cipher: C,
}

impl<C: PeerCipher> UdpPeerTransport<C> {
    pub async fn bind(addr: SocketAddr, cipher: C) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        socket.set_broadcast(true)?;
        Ok(UdpPeerTransport { socket: Arc::new(socket), peers: Arc::new(Mutex::new(Vec::new())), cipher })
    }

    pub async fn add_peer(&self, addr: SocketAddr) {
        let mut peers = self.peers.lock().await;
        if !peers.contains(&addr) {
            peers.push(addr);
        }
    }

    /// A clone of the underlying socket handle, for spawning
    /// `serve_inbound` before or after the transport itself is moved
    /// into the orchestrator.
    pub fn socket_handle(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }
}

/// Read and decode datagrams arriving on `socket`, forwarding each to
/// `tx`. Symmetric decryption matching whatever `PeerCipher::seal`
/// applied on the way out is an external collaborator's concern.
pub async fn serve_inbound(socket: Arc<UdpSocket>, tx: mpsc::Sender<PeerEvent>) -> std::io::Result<()> {
    let mut buf = vec![0u8; 65536];
    loop {
        let (n, peer) = socket.recv_from(&mut buf).await?;
        match postcard::from_bytes::<PeerEvent>(&buf[..n]) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    return Ok(());
                }
            }
            Err(e) => warn!(%peer, error = %e, "dropped malformed peer datagram"),
        }
    }
}

impl<C: PeerCipher> PeerTransport for UdpPeerTransport<C> {
    async fn broadcast(&self, event: &PeerEvent) -> Result<(), DawnError> {
        let bytes = postcard::to_allocvec(event)
            .map_err(|e| DawnError::InvalidArgument(format!("failed to encode peer event: {e}")))?;
        let sealed = self.cipher.seal(&bytes);
        let peers = self.peers.lock().await.clone();
        for addr in peers {
            if let Err(e) = self.socket.send_to(&sealed, addr).await {
                warn!(%addr, error = %e, "udp peer send failed");
            }
        }
        Ok(())
    }
}
