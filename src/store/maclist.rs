//! MAC allow-list: clients that always pass `decide()` regardless of
//! scoring, persisted as one hex MAC per line to a flat file.

use crate::types::MacAddr;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

pub struct MacAllowList {
    path: PathBuf,
    set: Mutex<HashSet<MacAddr>>,
}

impl MacAllowList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MacAllowList { path: path.into(), set: Mutex::new(HashSet::new()) }
    }

    /// Load the file into memory, ignoring malformed lines. A missing
    /// file is not an error — it means an empty list.
    pub async fn load(&self) -> std::io::Result<()> {
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || read_list(&path))
            .await
            .expect("mac list load task panicked")?;
        *self.set.lock().await = loaded;
        Ok(())
    }

    pub async fn contains(&self, mac: MacAddr) -> bool {
        self.set.lock().await.contains(&mac)
    }

    /// Insert `macs`, persist, and report whether the in-memory set
    /// changed. Invariant I5 requires the on-disk copy to be a
    /// superset-or-equal of the in-memory set once this returns.
    pub async fn add_all(&self, macs: &[MacAddr]) -> std::io::Result<bool> {
        let mut set = self.set.lock().await;
        let mut changed = false;
        for mac in macs {
            changed |= set.insert(*mac);
        }
        if changed {
            let snapshot: Vec<MacAddr> = set.iter().copied().collect();
            let path = self.path.clone();
            let write_result = tokio::task::spawn_blocking(move || write_list(&path, &snapshot))
                .await
                .expect("mac list save task panicked");
            if let Err(e) = write_result {
                warn!("failed to persist mac allow-list to {:?}: {e}", self.path);
                return Err(e);
            }
        }
        Ok(changed)
    }

    pub async fn snapshot(&self) -> Vec<MacAddr> {
        self.set.lock().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.set.lock().await.len()
    }
}

fn read_list(path: &Path) -> std::io::Result<HashSet<MacAddr>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    None
                } else {
                    MacAddr::parse(line).ok()
                }
            })
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e),
    }
}

fn write_list(path: &Path, macs: &[MacAddr]) -> std::io::Result<()> {
    let mut body = String::with_capacity(macs.len() * 18);
    for mac in macs {
        body.push_str(&mac.to_string());
        body.push('\n');
    }
    std::fs::write(path, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_all_persists_and_reloads() {
        let path = std::env::temp_dir().join(format!("dawn_mac_list_test_{}", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let list = MacAllowList::new(&path);
        list.load().await.unwrap();
        let mac = MacAddr::parse("aa:bb:cc:00:00:42").unwrap();
        assert!(list.add_all(&[mac]).await.unwrap());
        assert!(list.contains(mac).await);

        let reloaded = MacAllowList::new(&path);
        reloaded.load().await.unwrap();
        assert!(reloaded.contains(mac).await);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn add_all_reports_no_change_for_duplicates() {
        let path = std::env::temp_dir().join(format!("dawn_mac_list_test2_{}", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let list = MacAllowList::new(&path);
        list.load().await.unwrap();
        let mac = MacAddr::parse("aa:bb:cc:00:00:42").unwrap();
        assert!(list.add_all(&[mac]).await.unwrap());
        assert!(!list.add_all(&[mac]).await.unwrap());

        std::fs::remove_file(&path).ok();
    }
}
