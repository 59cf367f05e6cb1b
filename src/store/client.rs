//! Client entry store (stations currently associated to a local AP).

use super::InsertPolicy;
use crate::types::{now, MacAddr};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub bssid: MacAddr,
    pub client: MacAddr,
    pub ht: bool,
    pub vht: bool,
    pub kick_count: u32,
    pub signature: String,
    pub time: u64,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<ClientEntry>,
}

pub struct ClientStore {
    inner: Mutex<Inner>,
}

impl ClientStore {
    pub fn new() -> Self {
        ClientStore { inner: Mutex::new(Inner::default()) }
    }

    pub async fn insert(&self, mut entry: ClientEntry, policy: InsertPolicy) {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.rows.iter_mut().find(|r| r.client == entry.client) {
            if policy.bump_counter_if_present {
                entry.kick_count = existing.kick_count;
            }
            *existing = entry;
        } else {
            inner.rows.push(entry);
        }
    }

    pub async fn get(&self, client: MacAddr) -> Option<ClientEntry> {
        self.inner.lock().await.rows.iter().find(|r| r.client == client).cloned()
    }

    pub async fn delete(&self, client: MacAddr) -> bool {
        let mut inner = self.inner.lock().await;
        let before = inner.rows.len();
        inner.rows.retain(|r| r.client != client);
        inner.rows.len() != before
    }

    pub async fn bump_kick_count(&self, client: MacAddr) -> Option<u32> {
        let mut inner = self.inner.lock().await;
        let row = inner.rows.iter_mut().find(|r| r.client == client)?;
        row.kick_count += 1;
        Some(row.kick_count)
    }

    pub async fn reset_kick_count(&self, client: MacAddr) {
        let mut inner = self.inner.lock().await;
        if let Some(row) = inner.rows.iter_mut().find(|r| r.client == client) {
            row.kick_count = 0;
        }
    }

    pub async fn for_bssid(&self, bssid: MacAddr) -> Vec<ClientEntry> {
        self.inner.lock().await.rows.iter().filter(|r| r.bssid == bssid).cloned().collect()
    }

    pub async fn all(&self) -> Vec<ClientEntry> {
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

impl Default for ClientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(client: u8) -> ClientEntry {
        ClientEntry {
            bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
            client: MacAddr([0xaa, 0, 0, 0, 0, client]),
            ht: true,
            vht: false,
            kick_count: 0,
            signature: String::new(),
            time: now(),
        }
    }

    #[tokio::test]
    async fn kick_count_survives_reinsert() {
        let store = ClientStore::new();
        store.insert(sample(1), InsertPolicy::LOCAL).await;
        store.bump_kick_count(MacAddr([0xaa, 0, 0, 0, 0, 1])).await;
        store.insert(sample(1), InsertPolicy::LOCAL).await;

        let row = store.get(MacAddr([0xaa, 0, 0, 0, 0, 1])).await.unwrap();
        assert_eq!(row.kick_count, 1);
    }

    #[tokio::test]
    async fn delete_removes_single_identity() {
        let store = ClientStore::new();
        store.insert(sample(1), InsertPolicy::LOCAL).await;
        store.insert(sample(2), InsertPolicy::LOCAL).await;
        assert!(store.delete(MacAddr([0xaa, 0, 0, 0, 0, 1])).await);
        assert_eq!(store.len().await, 1);
    }
}
