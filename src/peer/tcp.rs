//! TCP peer transport and umdns-backed peer discovery (§4.6, §6).

use super::replication::PeerEvent;
use super::transport::{PeerDiscovery, PeerTransport};
use crate::error::DawnError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

/// Accept inbound replication connections and forward decoded events
/// into `tx`, for as long as the listener is bound.
pub async fn serve(bind_addr: SocketAddr, tx: mpsc::Sender<PeerEvent>) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    loop {
        let (mut stream, peer) = listener.accept().await?;
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                let mut len_buf = [0u8; 4];
                if stream.read_exact(&mut len_buf).await.is_err() {
                    return;
                }
                let len = u32::from_be_bytes(len_buf) as usize;
                let mut body = vec![0u8; len];
                if stream.read_exact(&mut body).await.is_err() {
                    return;
                }
                match postcard::from_bytes::<PeerEvent>(&body) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!(%peer, error = %e, "dropped malformed peer event"),
                }
            }
        });
    }
}

pub struct TcpPeerTransport {
    peers: Arc<Mutex<Vec<SocketAddr>>>,
}

impl TcpPeerTransport {
    pub fn new() -> Self {
        TcpPeerTransport { peers: Arc::new(Mutex::new(Vec::new())) }
    }

    pub async fn add_peer(&self, addr: SocketAddr) {
        let mut peers = self.peers.lock().await;
        if !peers.contains(&addr) {
            peers.push(addr);
        }
    }

    pub async fn peers(&self) -> Vec<SocketAddr> {
        self.peers.lock().await.clone()
    }
}

impl Default for TcpPeerTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerTransport for TcpPeerTransport {
    async fn broadcast(&self, event: &PeerEvent) -> Result<(), DawnError> {
        let bytes = postcard::to_allocvec(event)
            .map_err(|e| DawnError::InvalidArgument(format!("failed to encode peer event: {e}")))?;
        let peers = self.peers.lock().await.clone();
        for addr in peers {
            match TcpStream::connect(addr).await {
                Ok(mut stream) => {
                    let len = (bytes.len() as u32).to_be_bytes();
                    if let Err(e) = stream.write_all(&len).await.and(stream.write_all(&bytes).await) {
                        warn!(%addr, error = %e, "tcp peer send failed");
                    }
                }
                Err(e) => warn!(%addr, error = %e, "tcp peer connect failed"),
            }
        }
        Ok(())
    }
}

/// Peers discovered via the umdns `_dawn._tcp` service. A live umdns
/// client speaks to the local mDNS daemon over its own ubus object;
/// that RPC surface is an external collaborator, so this
/// implementation only specifies the shape `discover()` returns.
pub struct UmdnsDiscovery {
    known: Arc<Mutex<Vec<SocketAddr>>>,
}

impl UmdnsDiscovery {
    pub fn new() -> Self {
        UmdnsDiscovery { known: Arc::new(Mutex::new(Vec::new())) }
    }

    pub async fn seed(&self, addrs: Vec<SocketAddr>) {
        *self.known.lock().await = addrs;
    }
}

impl Default for UmdnsDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerDiscovery for UmdnsDiscovery {
    async fn discover(&self) -> Result<Vec<SocketAddr>, DawnError> {
        Ok(self.known.lock().await.clone())
    }
}
