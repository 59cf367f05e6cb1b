//! Control surface (C7): the four externally invokable operations,
//! carried over an async command queue rather than raw ubus framing
//! (§4.7) — ubus's wire format is an external collaborator.

use crate::metric::score;
use crate::store::{ApStore, ProbeStore};
use crate::types::MacAddr;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Serialize)]
pub struct HearingEntry {
    pub signal: i32,
    pub rcpi: i16,
    pub rsni: i16,
    pub freq: i32,
    pub ht: bool,
    pub vht: bool,
    pub channel_utilization: u8,
    pub num_sta: u32,
    pub ht_support: bool,
    pub vht_support: bool,
    pub score: i32,
}

pub type HearingMap = BTreeMap<String, BTreeMap<MacAddr, BTreeMap<MacAddr, HearingEntry>>>;

#[derive(Debug, Clone, Serialize)]
pub struct ClientOverview {
    pub signature: Option<String>,
    pub ht: bool,
    pub vht: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApOverview {
    pub freq: i32,
    pub ht_support: bool,
    pub vht_support: bool,
    pub channel_utilization: u8,
    pub station_count: u32,
    pub local: bool,
    pub clients: BTreeMap<MacAddr, ClientOverview>,
}

pub type NetworkOverview = BTreeMap<String, BTreeMap<MacAddr, ApOverview>>;

/// Requests the control surface accepts. Each carries a `oneshot`
/// sender so the orchestrator's single-threaded loop can answer
/// without blocking on the asker.
pub enum ControlCommand {
    AddMac { addrs: Vec<MacAddr>, respond_to: oneshot::Sender<bool> },
    GetHearingMap { respond_to: oneshot::Sender<HearingMap> },
    GetNetwork { respond_to: oneshot::Sender<NetworkOverview> },
    ReloadConfig { respond_to: oneshot::Sender<()> },
}

/// Grouped per-client scan of the probe and AP stores, built under
/// the probe lock so no aging sweep can interleave (§4.7).
pub async fn build_hearing_map(
    ap_store: &ApStore,
    probe_store: &ProbeStore,
    cfg: &crate::config::MetricConfig,
) -> HearingMap {
    let mut map: HearingMap = BTreeMap::new();
    let aps = ap_store.all().await;
    let probes = probe_store.all().await;

    for probe in &probes {
        let Some(ap) = aps.iter().find(|a| a.bssid == probe.bssid) else {
            continue;
        };
        let entry = HearingEntry {
            signal: probe.signal,
            rcpi: probe.rcpi,
            rsni: probe.rsni,
            freq: probe.freq,
            ht: probe.ht_capabilities,
            vht: probe.vht_capabilities,
            channel_utilization: ap.channel_utilization,
            num_sta: ap.station_count,
            ht_support: ap.ht_support,
            vht_support: ap.vht_support,
            score: score(probe, ap.ht_support, ap.vht_support, ap.channel_utilization, cfg),
        };
        map.entry(ap.ssid.clone())
            .or_default()
            .entry(probe.client)
            .or_default()
            .insert(probe.bssid, entry);
    }
    map
}

/// Nested SSID/BSSID overview with each AP's associated clients
/// (§4.7), `local` set for any AP matching one of this instance's own
/// radios.
pub async fn build_network_overview(
    ap_store: &ApStore,
    client_store: &crate::store::ClientStore,
    local_bssids: &HashSet<MacAddr>,
) -> NetworkOverview {
    let mut overview: NetworkOverview = BTreeMap::new();
    let aps = ap_store.all().await;
    let clients = client_store.all().await;

    for ap in &aps {
        let mut client_map = BTreeMap::new();
        for c in clients.iter().filter(|c| c.bssid == ap.bssid) {
            client_map.insert(
                c.client,
                ClientOverview {
                    signature: if c.signature.is_empty() { None } else { Some(c.signature.clone()) },
                    ht: c.ht,
                    vht: c.vht,
                },
            );
        }
        overview.entry(ap.ssid.clone()).or_default().insert(
            ap.bssid,
            ApOverview {
                freq: ap.freq,
                ht_support: ap.ht_support,
                vht_support: ap.vht_support,
                channel_utilization: ap.channel_utilization,
                station_count: ap.station_count,
                local: local_bssids.contains(&ap.bssid),
                clients: client_map,
            },
        );
    }
    overview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{APEntry, InsertPolicy, ProbeEntry};
    use crate::types::now;

    #[tokio::test]
    async fn hearing_map_groups_by_ssid_then_client() {
        let ap_store = ApStore::new();
        let probe_store = ProbeStore::new();
        let cfg = crate::config::MetricConfig::default();

        ap_store
            .insert(
                APEntry {
                    bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
                    ssid: "home".into(),
                    freq: 2412000,
                    ht_support: true,
                    vht_support: false,
                    channel_utilization: 10,
                    station_count: 1,
                    collision_domain: -1,
                    bandwidth: -1,
                    ap_weight: 0,
                    neighbor_report: String::new(),
                    iface: "wlan0".into(),
                    hostname: "ap1".into(),
                    time: now(),
                },
                InsertPolicy::LOCAL,
            )
            .await;
        probe_store
            .insert(
                ProbeEntry {
                    bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
                    client: MacAddr([0xaa, 0, 0, 0, 0, 1]),
                    target: MacAddr([0x11, 0, 0, 0, 0, 1]),
                    signal: -60,
                    freq: 2412000,
                    ht_capabilities: true,
                    vht_capabilities: false,
                    rcpi: 0,
                    rsni: 0,
                    counter: 1,
                    time: now(),
                },
                InsertPolicy::LOCAL,
            )
            .await;

        let map = build_hearing_map(&ap_store, &probe_store, &cfg).await;
        let client_row = &map["home"][&MacAddr([0xaa, 0, 0, 0, 0, 1])];
        assert!(client_row.contains_key(&MacAddr([0x11, 0, 0, 0, 0, 1])));
    }
}
