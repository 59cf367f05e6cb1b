//! Configuration: metric weights, timer periods, network options.
//!
//! Field names mirror the `metric` and `times` UCI sub-tables the
//! upstream radio manager exposes, so that `reload_config` can
//! round-trip the same shape over peer replication's `uci` method.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    pub ht_support: i32,
    pub vht_support: i32,
    pub no_ht_support: i32,
    pub no_vht_support: i32,
    pub rssi: i32,
    pub low_rssi: i32,
    pub freq: i32,
    pub chan_util: i32,
    pub max_chan_util: i32,
    pub rssi_val: i32,
    pub low_rssi_val: i32,
    pub chan_util_val: u8,
    pub max_chan_util_val: u8,
    pub min_probe_count: u32,
    pub bandwidth_threshold: i32,
    pub use_station_count: bool,
    pub max_station_diff: i32,
    pub eval_probe_req: bool,
    pub eval_auth_req: bool,
    pub eval_assoc_req: bool,
    pub kicking: bool,
    pub deny_auth_reason: u16,
    pub deny_assoc_reason: u16,
    pub use_driver_recog: bool,
    pub min_kick_count: u32,
    pub chan_util_avg_period: u32,
    pub set_hostapd_nr: bool,
    pub op_class: i16,
    pub duration: i16,
    pub mode: i16,
    pub scan_channel: i64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        MetricConfig {
            ht_support: 5,
            vht_support: 5,
            no_ht_support: 0,
            no_vht_support: 0,
            rssi: 15,
            low_rssi: 15,
            freq: 10,
            chan_util: 10,
            max_chan_util: 20,
            rssi_val: -60,
            low_rssi_val: -80,
            chan_util_val: 170,
            max_chan_util_val: 220,
            min_probe_count: 3,
            bandwidth_threshold: 6,
            use_station_count: true,
            max_station_diff: 1,
            eval_probe_req: true,
            eval_auth_req: true,
            eval_assoc_req: true,
            kicking: true,
            deny_auth_reason: 1,
            deny_assoc_reason: 17,
            use_driver_recog: true,
            min_kick_count: 5,
            chan_util_avg_period: 5,
            set_hostapd_nr: true,
            op_class: 0,
            duration: 0,
            mode: 0,
            scan_channel: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub update_client: u64,
    pub denied_req_threshold: u64,
    pub remove_client: u64,
    pub remove_probe: u64,
    pub remove_ap: u64,
    pub update_hostapd: u64,
    pub update_tcp_con: u64,
    pub update_chan_util: u64,
    pub update_beacon_reports: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            update_client: 10,
            denied_req_threshold: 30,
            remove_client: 15 * 60,
            remove_probe: 5 * 60,
            remove_ap: 5 * 60,
            update_hostapd: 10,
            update_tcp_con: 10,
            update_chan_util: 5,
            update_beacon_reports: 20,
        }
    }
}

/// One locally managed radio, statically declared in configuration.
/// Radios that appear after startup are picked up by the
/// `update_hostapd` timer rather than requiring a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioConfig {
    pub iface: String,
    pub hostname: String,
    pub bssid: String,
    pub ssid: String,
    pub ht_support: bool,
    pub vht_support: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Directory holding each radio's control and notification sockets.
    pub hostapd_dir: PathBuf,
    /// Path to the persisted MAC allow-list.
    pub mac_list_path: PathBuf,
    /// Statically declared local radios.
    pub radios: Vec<RadioConfig>,
    /// Enable umdns-discovered TCP peer replication.
    pub use_tcp: bool,
    /// Enable plaintext/encrypted UDP peer replication.
    pub use_udp: bool,
    /// UDP bind/broadcast address, when `use_udp` is set.
    pub broadcast_addr: Option<String>,
    /// TCP listen port for peer replication, when `use_tcp` is set.
    pub tcp_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hostapd_dir: PathBuf::from("/var/run/hostapd"),
            mac_list_path: PathBuf::from("/tmp/dawn_mac_list"),
            radios: Vec::new(),
            use_tcp: true,
            use_udp: false,
            broadcast_addr: None,
            tcp_port: 1030,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DawnConfig {
    pub metric: MetricConfig,
    pub times: TimeoutConfig,
    pub network: NetworkConfig,
}

impl DawnConfig {
    /// Load from a TOML file, falling back to defaults if the file is
    /// absent. A malformed file is an error the caller should log and
    /// ignore, keeping whatever configuration it already has.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text).map_err(ConfigError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DawnConfig::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Re-read `path`; on any error, log and keep `self` unchanged.
    /// Matches the spec's "malformed config falls back to last good
    /// values" rule — `reload_config` always returns successfully to
    /// its caller.
    pub fn reload(&mut self, path: &Path) {
        match DawnConfig::load(path) {
            Ok(fresh) => *self = fresh,
            Err(e) => warn!("config reload from {path:?} failed, keeping previous values: {e}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
