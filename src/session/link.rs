//! The radio-manager RPC surface (§6), modeled as a trait so the
//! session layer is testable without a live control socket. A
//! concrete `UnixSocketRadioManagerLink` fulfills it in production.

use crate::error::DawnError;
use crate::types::MacAddr;

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client: MacAddr,
    pub ht: bool,
    pub vht: bool,
    pub signature: String,
}

/// One neighbor report row as `rrm_nr_set` expects it.
#[derive(Debug, Clone)]
pub struct NeighborRow {
    pub bssid_hex: String,
    pub ssid: String,
    pub neighbor_report: String,
}

/// Outbound calls a session issues to its local radio manager. Every
/// call has a 1s deadline enforced by the caller via
/// `tokio::time::timeout` (§5) rather than by the trait itself, so a
/// fake implementation used in tests never needs to simulate timing.
pub trait RadioManagerLink: Send + Sync {
    async fn get_clients(&self, iface: &str) -> Result<Vec<ClientInfo>, DawnError>;

    async fn rrm_nr_get_own(&self, iface: &str) -> Result<String, DawnError>;

    async fn rrm_nr_set(&self, iface: &str, rows: Vec<NeighborRow>) -> Result<(), DawnError>;

    async fn rrm_beacon_req(
        &self,
        iface: &str,
        addr: MacAddr,
        op_class: i16,
        channel: i64,
        duration: i16,
        mode: i16,
    ) -> Result<(), DawnError>;

    async fn bss_mgmt_enable(&self, iface: &str) -> Result<(), DawnError>;

    async fn del_client(
        &self,
        iface: &str,
        addr: MacAddr,
        reason: u16,
        deauth: bool,
        ban_time: u32,
    ) -> Result<(), DawnError>;

    async fn wnm_disassoc_imminent(
        &self,
        iface: &str,
        addr: MacAddr,
        duration: u32,
        neighbors: Vec<String>,
    ) -> Result<(), DawnError>;

    async fn notify_response(&self, iface: &str, allow: bool) -> Result<(), DawnError>;

    /// Returns `(busy_time_delta, total_time_delta)` since the last
    /// sample, used to feed the running channel-utilisation average.
    async fn channel_utilization_sample(&self, iface: &str) -> Result<(u64, u64), DawnError>;
}
