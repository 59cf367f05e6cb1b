//! Per-radio session (C5): subscription lifecycle, channel-utilisation
//! averaging, beacon-report ingest and outbound RPC, all bounded by
//! the 1s deadline §5 mandates for anything a handler waits on.

use super::link::{NeighborRow, RadioManagerLink};
use super::notify::BeaconReportNotify;
use crate::decision::{DecisionContext, KickAction};
use crate::error::DawnError;
use crate::store::{ApStore, ClientEntry, ClientStore, InsertPolicy, ProbeEntry};
use crate::types::{now, MacAddr};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

const RPC_DEADLINE: Duration = Duration::from_secs(1);

async fn with_deadline<T>(
    fut: impl std::future::Future<Output = Result<T, DawnError>>,
) -> Result<T, DawnError> {
    match timeout(RPC_DEADLINE, fut).await {
        Ok(result) => result,
        Err(_) => Err(DawnError::Transient("radio manager RPC exceeded 1s deadline".into())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unsubscribed,
    WaitingForObject,
    Subscribed,
}

struct ChanUtilTracker {
    busy_sum: u64,
    total_sum: u64,
    samples: u32,
    period: u32,
}

impl ChanUtilTracker {
    fn new(period: u32) -> Self {
        ChanUtilTracker { busy_sum: 0, total_sum: 0, samples: 0, period: period.max(1) }
    }

    /// Accumulate one `(busy, total)` delta; once `period` samples
    /// have been collected, return the averaged 0-255 utilisation and
    /// reset the accumulator.
    fn add_sample(&mut self, busy_delta: u64, total_delta: u64) -> Option<u8> {
        self.busy_sum += busy_delta;
        self.total_sum += total_delta;
        self.samples += 1;
        if self.samples < self.period {
            return None;
        }
        let avg = if self.total_sum == 0 {
            0
        } else {
            ((self.busy_sum * 255) / self.total_sum).min(255) as u8
        };
        self.busy_sum = 0;
        self.total_sum = 0;
        self.samples = 0;
        Some(avg)
    }
}

pub struct Session<L: RadioManagerLink> {
    pub iface: String,
    pub hostname: String,
    pub bssid: MacAddr,
    pub ssid: String,
    pub ht_support: bool,
    pub vht_support: bool,
    pub neighbor_report: String,
    state: SessionState,
    chan_util: ChanUtilTracker,
    link: L,
}

impl<L: RadioManagerLink> Session<L> {
    pub fn new(
        iface: impl Into<String>,
        hostname: impl Into<String>,
        bssid: MacAddr,
        ssid: impl Into<String>,
        ht_support: bool,
        vht_support: bool,
        chan_util_avg_period: u32,
        link: L,
    ) -> Self {
        Session {
            iface: iface.into(),
            hostname: hostname.into(),
            bssid,
            ssid: ssid.into(),
            ht_support,
            vht_support,
            neighbor_report: String::new(),
            state: SessionState::WaitingForObject,
            chan_util: ChanUtilTracker::new(chan_util_avg_period),
            link,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_subscribed(&self) -> bool {
        self.state == SessionState::Subscribed
    }

    /// A matching object-add notification arrived; attempt to enable
    /// BSS transition/neighbor/beacon reporting. Failure leaves the
    /// session waiting so the next object-add retries.
    pub async fn try_subscribe(&mut self) {
        match with_deadline(self.link.bss_mgmt_enable(&self.iface)).await {
            Ok(()) => {
                self.state = SessionState::Subscribed;
                info!(iface = %self.iface, "session subscribed");
            }
            Err(e) => {
                warn!(iface = %self.iface, error = %e, "bss_mgmt_enable failed, will retry on next object-add");
                self.state = SessionState::WaitingForObject;
            }
        }
    }

    /// A remove notification for our object arrived; go back to
    /// waiting and let the orchestrator's subscribe-to-new-interfaces
    /// pass re-arm us.
    pub fn on_object_remove(&mut self) {
        self.state = SessionState::WaitingForObject;
    }

    pub async fn refresh_clients(&self, store: &ClientStore) -> Result<(), DawnError> {
        let clients = with_deadline(self.link.get_clients(&self.iface)).await?;
        for c in clients {
            store
                .insert(
                    ClientEntry {
                        bssid: self.bssid,
                        client: c.client,
                        ht: c.ht,
                        vht: c.vht,
                        kick_count: 0,
                        signature: c.signature,
                        time: now(),
                    },
                    InsertPolicy::LOCAL,
                )
                .await;
        }
        Ok(())
    }

    pub async fn sample_channel_utilization(&mut self, ap_store: &ApStore) -> Result<(), DawnError> {
        let (busy, total) = with_deadline(self.link.channel_utilization_sample(&self.iface)).await?;
        if let Some(avg) = self.chan_util.add_sample(busy, total) {
            ap_store.set_channel_utilization(self.bssid, avg).await;
        }
        Ok(())
    }

    pub async fn refresh_own_neighbor_report(&mut self) -> Result<(), DawnError> {
        self.neighbor_report = with_deadline(self.link.rrm_nr_get_own(&self.iface)).await?;
        Ok(())
    }

    pub async fn publish_neighbor_reports(&self, rows: Vec<NeighborRow>) -> Result<(), DawnError> {
        with_deadline(self.link.rrm_nr_set(&self.iface, rows)).await
    }

    pub async fn request_beacon_report(
        &self,
        client: MacAddr,
        op_class: i16,
        channel: i64,
        duration: i16,
        mode: i16,
    ) -> Result<(), DawnError> {
        with_deadline(self.link.rrm_beacon_req(&self.iface, client, op_class, channel, duration, mode)).await
    }

    /// Beacon-report ingest. `target` is populated straight from the
    /// notification's `address` field rather than the reported
    /// neighbor's bssid — this keeps the upstream source's
    /// `parse_to_beacon_rep` behavior intentionally (see the design
    /// ledger's open-question entry), it is not a bug introduced here.
    pub async fn on_beacon_report(&self, probe_store: &crate::store::ProbeStore, min_probe_count: u32, n: BeaconReportNotify) {
        let updated = probe_store
            .update_rcpi_rsni(n.bssid, n.address, n.rcpi, n.rsni)
            .await;
        if !updated {
            let synthetic = ProbeEntry {
                bssid: n.bssid,
                client: n.address,
                target: n.address,
                signal: 0,
                freq: 0,
                ht_capabilities: false,
                vht_capabilities: false,
                rcpi: n.rcpi,
                rsni: n.rsni,
                counter: min_probe_count,
                time: now(),
            };
            probe_store.insert(synthetic, InsertPolicy::LOCAL).await;
        }
    }

    pub async fn apply_kick(&self, action: &KickAction, deny_reason: u16) -> Result<(), DawnError> {
        with_deadline(self.link.wnm_disassoc_imminent(
            &self.iface,
            action.client,
            0,
            vec![action.target_neighbor_report.clone()],
        ))
        .await?;
        if action.force_deauth {
            with_deadline(self.link.del_client(&self.iface, action.client, deny_reason, true, 60)).await?;
        }
        Ok(())
    }

    pub async fn reply(&self, ctx: &DecisionContext<'_>, allow: bool) -> Result<(), DawnError> {
        let _ = ctx;
        with_deadline(self.link.notify_response(&self.iface, allow)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::link::ClientInfo;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FakeLink {
        enable_calls: Arc<AtomicU32>,
        fail_enable: bool,
    }

    impl RadioManagerLink for FakeLink {
        async fn get_clients(&self, _iface: &str) -> Result<Vec<ClientInfo>, DawnError> {
            Ok(vec![ClientInfo {
                client: MacAddr([0xaa, 0, 0, 0, 0, 1]),
                ht: true,
                vht: false,
                signature: String::new(),
            }])
        }
        async fn rrm_nr_get_own(&self, _iface: &str) -> Result<String, DawnError> {
            Ok("nr".into())
        }
        async fn rrm_nr_set(&self, _iface: &str, _rows: Vec<NeighborRow>) -> Result<(), DawnError> {
            Ok(())
        }
        async fn rrm_beacon_req(
            &self,
            _iface: &str,
            _addr: MacAddr,
            _op_class: i16,
            _channel: i64,
            _duration: i16,
            _mode: i16,
        ) -> Result<(), DawnError> {
            Ok(())
        }
        async fn bss_mgmt_enable(&self, _iface: &str) -> Result<(), DawnError> {
            self.enable_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_enable {
                Err(DawnError::Transient("nope".into()))
            } else {
                Ok(())
            }
        }
        async fn del_client(
            &self,
            _iface: &str,
            _addr: MacAddr,
            _reason: u16,
            _deauth: bool,
            _ban_time: u32,
        ) -> Result<(), DawnError> {
            Ok(())
        }
        async fn wnm_disassoc_imminent(
            &self,
            _iface: &str,
            _addr: MacAddr,
            _duration: u32,
            _neighbors: Vec<String>,
        ) -> Result<(), DawnError> {
            Ok(())
        }
        async fn notify_response(&self, _iface: &str, _allow: bool) -> Result<(), DawnError> {
            Ok(())
        }
        async fn channel_utilization_sample(&self, _iface: &str) -> Result<(u64, u64), DawnError> {
            Ok((50, 100))
        }
    }

    #[tokio::test]
    async fn failed_subscribe_keeps_waiting() {
        let link = FakeLink { enable_calls: Arc::new(AtomicU32::new(0)), fail_enable: true };
        let mut session = Session::new("wlan0", "ap1", MacAddr([0x11, 0, 0, 0, 0, 1]), "home", true, false, 2, link);
        session.try_subscribe().await;
        assert_eq!(session.state(), SessionState::WaitingForObject);
    }

    #[tokio::test]
    async fn successful_subscribe_transitions_to_subscribed() {
        let link = FakeLink { enable_calls: Arc::new(AtomicU32::new(0)), fail_enable: false };
        let mut session = Session::new("wlan0", "ap1", MacAddr([0x11, 0, 0, 0, 0, 1]), "home", true, false, 2, link);
        session.try_subscribe().await;
        assert!(session.is_subscribed());
    }

    #[tokio::test]
    async fn channel_utilization_averages_over_period() {
        let link = FakeLink { enable_calls: Arc::new(AtomicU32::new(0)), fail_enable: false };
        let mut session = Session::new("wlan0", "ap1", MacAddr([0x11, 0, 0, 0, 0, 1]), "home", true, false, 2, link);
        let ap_store = ApStore::new();
        ap_store
            .insert(
                crate::store::APEntry {
                    bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
                    ssid: "home".into(),
                    freq: 2412000,
                    ht_support: true,
                    vht_support: false,
                    channel_utilization: 0,
                    station_count: 0,
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

        session.sample_channel_utilization(&ap_store).await.unwrap();
        assert_eq!(ap_store.get(MacAddr([0x11, 0, 0, 0, 0, 1])).await.unwrap().channel_utilization, 0);
        session.sample_channel_utilization(&ap_store).await.unwrap();
        let row = ap_store.get(MacAddr([0x11, 0, 0, 0, 0, 1])).await.unwrap();
        assert!(row.channel_utilization > 0);
    }
}
