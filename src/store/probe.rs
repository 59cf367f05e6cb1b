//! Probe entry store (observations of a client hearing an AP).

use super::InsertPolicy;
use crate::types::{now, MacAddr};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeEntry {
    pub bssid: MacAddr,
    pub client: MacAddr,
    pub target: MacAddr,
    pub signal: i32,
    pub freq: i32,
    pub ht_capabilities: bool,
    pub vht_capabilities: bool,
    pub rcpi: i16,
    pub rsni: i16,
    pub counter: u32,
    pub time: u64,
}

impl ProbeEntry {
    fn identity(&self) -> (MacAddr, MacAddr) {
        (self.bssid, self.client)
    }
}

/// Ordered primarily by client then bssid, so grouped iteration by
/// client (used when building a hearing map row) is a contiguous
/// sub-slice.
fn order_key(e: &ProbeEntry) -> (MacAddr, MacAddr) {
    (e.client, e.bssid)
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<ProbeEntry>,
}

pub struct ProbeStore {
    inner: Mutex<Inner>,
}

impl ProbeStore {
    pub fn new() -> Self {
        ProbeStore { inner: Mutex::new(Inner::default()) }
    }

    pub async fn insert(&self, mut entry: ProbeEntry, policy: InsertPolicy) {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner
            .rows
            .iter_mut()
            .find(|r| r.identity() == entry.identity())
        {
            if !policy.trust_incoming_counter {
                entry.counter = existing.counter + 1;
            }
            *existing = entry;
        } else {
            inner.rows.push(entry);
        }
        if policy.sort_after_insert {
            inner.rows.sort_by_key(order_key);
        }
    }

    pub async fn get(&self, bssid: MacAddr, client: MacAddr) -> Option<ProbeEntry> {
        let inner = self.inner.lock().await;
        inner
            .rows
            .iter()
            .find(|r| r.bssid == bssid && r.client == client)
            .cloned()
    }

    /// Update RCPI/RSNI for an existing probe (used by beacon-report
    /// ingest). Returns `false` if no matching entry exists, so the
    /// caller can decide to synthesize one.
    pub async fn update_rcpi_rsni(
        &self,
        bssid: MacAddr,
        client: MacAddr,
        rcpi: i16,
        rsni: i16,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner
            .rows
            .iter_mut()
            .find(|r| r.bssid == bssid && r.client == client)
        {
            entry.rcpi = rcpi;
            entry.rsni = rsni;
            entry.time = now();
            true
        } else {
            false
        }
    }

    pub async fn for_client(&self, client: MacAddr) -> Vec<ProbeEntry> {
        let inner = self.inner.lock().await;
        inner.rows.iter().filter(|r| r.client == client).cloned().collect()
    }

    pub async fn all(&self) -> Vec<ProbeEntry> {
        self.inner.lock().await.rows.clone()
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

impl Default for ProbeStore {
    fn default() -> Self {
        Self::new()
    }
}
