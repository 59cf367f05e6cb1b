//! AP entry store: every access point known on the logical network,
//! kept in (ssid, bssid) order so SSID-adjacency grouping during
//! overview/hearing-map construction (invariant I4) is a contiguous
//! scan rather than a fresh grouping pass.

use super::InsertPolicy;
use crate::types::{now, MacAddr, MAX_NEIGHBOR_REPORT_LEN};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct APEntry {
    pub bssid: MacAddr,
    pub ssid: String,
    pub freq: i32,
    pub ht_support: bool,
    pub vht_support: bool,
    pub channel_utilization: u8,
    pub station_count: u32,
    pub collision_domain: i32,
    pub bandwidth: i32,
    pub ap_weight: i32,
    pub neighbor_report: String,
    pub iface: String,
    pub hostname: String,
    pub time: u64,
}

impl APEntry {
    pub fn neighbor_report_truncated(&self) -> &str {
        let end = self.neighbor_report.len().min(MAX_NEIGHBOR_REPORT_LEN);
        &self.neighbor_report[..end]
    }
}

fn order_key(e: &APEntry) -> (String, MacAddr) {
    (e.ssid.clone(), e.bssid)
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<APEntry>,
}

pub struct ApStore {
    inner: Mutex<Inner>,
}

impl ApStore {
    pub fn new() -> Self {
        ApStore { inner: Mutex::new(Inner::default()) }
    }

    pub async fn insert(&self, entry: APEntry, policy: InsertPolicy) {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.rows.iter_mut().find(|r| r.bssid == entry.bssid) {
            *existing = entry;
        } else {
            inner.rows.push(entry);
        }
        if policy.sort_after_insert {
            inner.rows.sort_by_key(order_key);
        }
    }

    pub async fn get(&self, bssid: MacAddr) -> Option<APEntry> {
        self.inner.lock().await.rows.iter().find(|r| r.bssid == bssid).cloned()
    }

    /// Feed a freshly computed channel-utilisation average back into
    /// the local AP entry before it is published or scored against.
    pub async fn set_channel_utilization(&self, bssid: MacAddr, value: u8) {
        let mut inner = self.inner.lock().await;
        if let Some(row) = inner.rows.iter_mut().find(|r| r.bssid == bssid) {
            row.channel_utilization = value;
            row.time = now();
        }
    }

    /// All APs sharing `ssid`, in (ssid, bssid) order.
    pub async fn same_ssid(&self, ssid: &str) -> Vec<APEntry> {
        self.inner.lock().await.rows.iter().filter(|r| r.ssid == ssid).cloned().collect()
    }

    pub async fn all(&self) -> Vec<APEntry> {
        self.inner.lock().await.rows.clone()
    }

    pub async fn delete(&self, bssid: MacAddr) -> bool {
        let mut inner = self.inner.lock().await;
        let before = inner.rows.len();
        inner.rows.retain(|r| r.bssid != bssid);
        inner.rows.len() != before
    }

    pub async fn age(&self, ttl_secs: u64) -> usize {
        let cutoff = now().saturating_sub(ttl_secs);
        let mut inner = self.inner.lock().await;
        let before = inner.rows.len();
        inner.rows.retain(|r| r.time >= cutoff);
        before - inner.rows.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }
}

impl Default for ApStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(bssid: u8, ssid: &str) -> APEntry {
        APEntry {
            bssid: MacAddr([0x11, 0, 0, 0, 0, bssid]),
            ssid: ssid.to_string(),
            freq: 2412000,
            ht_support: true,
            vht_support: false,
            channel_utilization: 0,
            station_count: 0,
            collision_domain: -1,
            bandwidth: -1,
            ap_weight: 0,
            neighbor_report: String::new(),
            iface: "wlan0".to_string(),
            hostname: "ap1".to_string(),
            time: now(),
        }
    }

    #[tokio::test]
    async fn rows_stay_ordered_by_ssid_then_bssid() {
        let store = ApStore::new();
        store.insert(sample(2, "zeta"), InsertPolicy::LOCAL).await;
        store.insert(sample(1, "alpha"), InsertPolicy::LOCAL).await;
        store.insert(sample(3, "alpha"), InsertPolicy::LOCAL).await;

        let all = store.all().await;
        let ssids: Vec<_> = all.iter().map(|a| a.ssid.clone()).collect();
        assert_eq!(ssids, vec!["alpha", "alpha", "zeta"]);
    }

    #[tokio::test]
    async fn channel_utilization_feedback_is_visible_to_readers() {
        let store = ApStore::new();
        store.insert(sample(1, "alpha"), InsertPolicy::LOCAL).await;
        store.set_channel_utilization(MacAddr([0x11, 0, 0, 0, 0, 1]), 200).await;
        let row = store.get(MacAddr([0x11, 0, 0, 0, 0, 1])).await.unwrap();
        assert_eq!(row.channel_utilization, 200);
    }
}
