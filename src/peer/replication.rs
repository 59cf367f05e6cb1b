//! Replication envelope and idempotent apply (C6).

use crate::config::DawnConfig;
use crate::store::{APEntry, ClientEntry, DeniedStore, InsertPolicy, ProbeEntry};
use crate::store::{ApStore, ClientStore, MacAllowList, ProbeStore};
use crate::types::MacAddr;
use serde::{Deserialize, Serialize};

/// A single replicated mutation, tagged by the `method` the original
/// radio-manager notification or control call carried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeerEvent {
    Probe(ProbeEntry),
    /// Pre-create a probe entry ahead of an auth/assoc the sender
    /// expects to see replicated first (source's "setprobe" method).
    SetProbe(ProbeEntry),
    Client(ClientEntry),
    Ap(APEntry),
    AddMac(Vec<MacAddr>),
    Deauth { bssid: MacAddr, client: MacAddr },
    Uci(Box<DawnConfig>),
}

/// All four mutable stores an incoming peer event might touch.
pub struct ReplicationSink<'a> {
    pub probe: &'a ProbeStore,
    pub client: &'a ClientStore,
    pub ap: &'a ApStore,
    pub denied: &'a DeniedStore,
    pub maclist: &'a MacAllowList,
}

/// Apply an event received from a peer with replication suppressed,
/// so it is never bounced back out. Every apply here must be
/// idempotent (P5): re-applying the same event leaves the store in
/// the same observable state.
pub async fn apply(sink: &ReplicationSink<'_>, event: PeerEvent) {
    match event {
        PeerEvent::Probe(entry) | PeerEvent::SetProbe(entry) => {
            sink.probe.insert(entry, InsertPolicy::FROM_PEER).await;
        }
        PeerEvent::Client(entry) => {
            sink.client.insert(entry, InsertPolicy::FROM_PEER).await;
        }
        PeerEvent::Ap(entry) => {
            sink.ap.insert(entry, InsertPolicy::FROM_PEER).await;
        }
        PeerEvent::AddMac(macs) => {
            let _ = sink.maclist.add_all(&macs).await;
        }
        PeerEvent::Deauth { bssid: _, client } => {
            sink.client.delete(client).await;
        }
        PeerEvent::Uci(_config) => {
            // Config convergence is handled by the orchestrator, which
            // owns the single `DawnConfig` instance; the replication
            // layer only hands the parsed event up.
        }
    }
}
