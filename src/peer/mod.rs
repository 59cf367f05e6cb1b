//! Peer replication (C6): wire envelope, idempotent apply, and the
//! transport/discovery traits external collaborators fulfill.

pub mod replication;
pub mod tcp;
pub mod transport;
pub mod udp;

pub use replication::{apply, PeerEvent, ReplicationSink};
pub use tcp::{TcpPeerTransport, UmdnsDiscovery};
pub use transport::{PeerDiscovery, PeerTransport};
pub use udp::{Identity, PeerCipher, UdpPeerTransport};

pub mod inbound {
    pub use super::tcp::serve as serve_tcp;
    pub use super::udp::serve_inbound as serve_udp;
}
