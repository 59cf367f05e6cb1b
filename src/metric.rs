//! Metric evaluator (C3): scores a (probe, AP) pair and decides
//! whether a better AP than the current one is available to a client.

use crate::config::MetricConfig;
use crate::store::{ApStore, ProbeEntry, ProbeStore};
use crate::types::MacAddr;

/// 5 GHz and above, in kHz, per the upstream frequency-band weight.
const FIVE_GHZ_KHZ: i32 = 5_000_000;

/// Weighted score of a single (probe, AP) observation. Higher is
/// better. All inputs to the weighted terms come straight from the
/// probe's own observation and the AP's latest published fields, so
/// this never needs a lock beyond the caller already holding one.
pub fn score(probe: &ProbeEntry, ap_ht: bool, ap_vht: bool, ap_chan_util: u8, cfg: &MetricConfig) -> i32 {
    let mut total = 0i32;

    if ap_ht && probe.ht_capabilities {
        total += cfg.ht_support;
    }
    if ap_ht && !probe.ht_capabilities {
        total -= cfg.no_ht_support;
    }
    if ap_vht && probe.vht_capabilities {
        total += cfg.vht_support;
    }
    if ap_vht && !probe.vht_capabilities {
        total -= cfg.no_vht_support;
    }

    if probe.signal > cfg.rssi_val {
        total += cfg.rssi;
    }
    if probe.signal < cfg.low_rssi_val {
        total -= cfg.low_rssi;
    }

    if probe.freq >= FIVE_GHZ_KHZ {
        total += cfg.freq;
    }

    if ap_chan_util > cfg.chan_util_val {
        total -= cfg.chan_util;
    }
    if ap_chan_util > cfg.max_chan_util_val {
        total -= cfg.max_chan_util;
    }

    total
}

/// The winning candidate when a better AP is found.
pub struct BetterAp {
    pub bssid: MacAddr,
    pub neighbor_report: String,
}

/// Enumerate every AP sharing `bssid`'s SSID, score the best probe
/// observation the client has against each, and report whether one
/// beats the current AP by more than `bandwidth_threshold`. Ties
/// favour the current `bssid`.
pub async fn better_ap_available(
    ap_store: &ApStore,
    probe_store: &ProbeStore,
    bssid: MacAddr,
    client: MacAddr,
    cfg: &MetricConfig,
) -> Option<BetterAp> {
    let current_ap = ap_store.get(bssid).await?;
    let candidates = ap_store.same_ssid(&current_ap.ssid).await;
    let probes = probe_store.for_client(client).await;

    let current_probe = probes.iter().find(|p| p.bssid == bssid);
    let current_score = current_probe.map(|p| {
        score(p, current_ap.ht_support, current_ap.vht_support, current_ap.channel_utilization, cfg)
    });

    let mut best: Option<(i32, &crate::store::APEntry)> = None;
    for candidate in &candidates {
        if candidate.bssid == bssid {
            continue;
        }
        let Some(probe) = probes.iter().find(|p| p.bssid == candidate.bssid) else {
            continue;
        };
        if cfg.use_station_count {
            let current_count = current_ap.station_count as i32;
            if candidate.station_count as i32 > current_count + cfg.max_station_diff {
                continue;
            }
        }
        let candidate_score = score(
            probe,
            candidate.ht_support,
            candidate.vht_support,
            candidate.channel_utilization,
            cfg,
        );
        if best.map(|(s, _)| candidate_score > s).unwrap_or(true) {
            best = Some((candidate_score, candidate));
        }
    }

    let (best_score, best_ap) = best?;
    let baseline = current_score.unwrap_or(0);
    if best_score > baseline + cfg.bandwidth_threshold {
        Some(BetterAp { bssid: best_ap.bssid, neighbor_report: best_ap.neighbor_report.clone() })
    } else {
        None
    }
}
