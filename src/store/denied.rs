//! Denied-request store: probes/auths/assocs this instance refused,
//! swept periodically to detect clients whose driver never retried
//! elsewhere (see the decision engine's driver-recognition path).

use super::InsertPolicy;
use crate::types::{now, MacAddr};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeniedReq {
    pub bssid: MacAddr,
    pub client: MacAddr,
    pub target: MacAddr,
    pub signal: i32,
    pub freq: i32,
    pub counter: u32,
    pub time: u64,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<DeniedReq>,
}

pub struct DeniedStore {
    inner: Mutex<Inner>,
}

impl DeniedStore {
    pub fn new() -> Self {
        DeniedStore { inner: Mutex::new(Inner::default()) }
    }

    pub async fn insert(&self, mut entry: DeniedReq, policy: InsertPolicy) {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner
            .rows
            .iter_mut()
            .find(|r| r.bssid == entry.bssid && r.client == entry.client)
        {
            if policy.bump_counter_if_present {
                entry.counter = existing.counter + 1;
            }
            *existing = entry;
        } else {
            inner.rows.push(entry);
        }
    }

    pub async fn delete(&self, bssid: MacAddr, client: MacAddr) {
        let mut inner = self.inner.lock().await;
        inner.rows.retain(|r| !(r.bssid == bssid && r.client == client));
    }

    pub async fn all(&self) -> Vec<DeniedReq> {
        self.inner.lock().await.rows.clone()
    }

    /// Remove and return every row older than `threshold_secs`, for
    /// the sweep in the decision engine's `process_denied` pass.
    pub async fn drain_older_than(&self, threshold_secs: u64) -> Vec<DeniedReq> {
        let cutoff = now().saturating_sub(threshold_secs);
        let mut inner = self.inner.lock().await;
        let (old, fresh): (Vec<_>, Vec<_>) =
            inner.rows.drain(..).partition(|r| r.time < cutoff);
        inner.rows = fresh;
        old
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }
}

impl Default for DeniedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(client: u8, time: u64) -> DeniedReq {
        DeniedReq {
            bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
            client: MacAddr([0xaa, 0, 0, 0, 0, client]),
            target: MacAddr([0x11, 0, 0, 0, 0, 1]),
            signal: -70,
            freq: 2412000,
            counter: 1,
            time,
        }
    }

    #[tokio::test]
    async fn drain_only_takes_rows_past_threshold() {
        let store = DeniedStore::new();
        store.insert(sample(1, now().saturating_sub(100)), InsertPolicy::LOCAL).await;
        store.insert(sample(2, now()), InsertPolicy::LOCAL).await;

        let drained = store.drain_older_than(30).await;
        assert_eq!(drained.len(), 1);
        assert_eq!(store.len().await, 1);
    }
}
