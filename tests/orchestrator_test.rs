//! End-to-end exercise of the orchestrator's event loop against fake
//! radio-manager, transport and discovery implementations.

use dawn::config::DawnConfig;
use dawn::error::DawnError;
use dawn::peer::{PeerDiscovery, PeerEvent, PeerTransport};
use dawn::session::link::{ClientInfo, NeighborRow, RadioManagerLink};
use dawn::session::notify::{AssocNotify, AuthNotify, Notification, ProbeNotify};
use dawn::session::Session;
use dawn::types::MacAddr;
use dawn::Orchestrator;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout, Duration};

struct FakeLink {
    last_allow: Arc<Mutex<Option<bool>>>,
}

impl RadioManagerLink for FakeLink {
    async fn get_clients(&self, _iface: &str) -> Result<Vec<ClientInfo>, DawnError> {
        Ok(Vec::new())
    }
    async fn rrm_nr_get_own(&self, _iface: &str) -> Result<String, DawnError> {
        Ok(String::new())
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
        Ok(())
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
    async fn notify_response(&self, _iface: &str, allow: bool) -> Result<(), DawnError> {
        *self.last_allow.lock().await = Some(allow);
        Ok(())
    }
    async fn channel_utilization_sample(&self, _iface: &str) -> Result<(u64, u64), DawnError> {
        Ok((0, 0))
    }
}

#[derive(Default)]
struct RecordingTransport {
    events: Arc<Mutex<Vec<PeerEvent>>>,
}

impl PeerTransport for RecordingTransport {
    async fn broadcast(&self, event: &PeerEvent) -> Result<(), DawnError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

struct NoDiscovery;
impl PeerDiscovery for NoDiscovery {
    async fn discover(&self) -> Result<Vec<SocketAddr>, DawnError> {
        Ok(Vec::new())
    }
}

fn bssid() -> MacAddr {
    MacAddr([0x11, 0x00, 0x00, 0x00, 0x00, 0x01])
}

fn client_mac() -> MacAddr {
    MacAddr([0xaa, 0x00, 0x00, 0x00, 0x00, 0x01])
}

#[tokio::test]
async fn probe_then_assoc_is_admitted_and_replicated() {
    let last_allow = Arc::new(Mutex::new(None));
    let link = FakeLink { last_allow: last_allow.clone() };
    let session = Session::new("wlan0", "ap1", bssid(), "home", true, false, 5, link);

    let events = Arc::new(Mutex::new(Vec::new()));
    let transport = RecordingTransport { events: events.clone() };

    let (notify_tx, notify_rx) = mpsc::channel(16);
    let (_peer_tx, peer_rx) = mpsc::channel(16);
    let (_control_tx, control_rx) = mpsc::channel(16);

    let mut config = DawnConfig::default();
    config.metric.min_probe_count = 1;

    let mut orchestrator = Orchestrator::new(
        config,
        std::env::temp_dir().join("dawn_orch_test.toml"),
        transport,
        NoDiscovery,
        notify_rx,
        peer_rx,
        control_rx,
    );
    orchestrator.add_session(session);

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let handle = tokio::spawn(async move {
        let _ = orchestrator.run().await;
        running_clone.store(false, Ordering::SeqCst);
    });

    notify_tx
        .send((
            "wlan0".to_string(),
            Notification::Probe(ProbeNotify {
                address: client_mac(),
                target: bssid(),
                signal: -50,
                freq: 2412000,
                ht_capabilities: true,
                vht_capabilities: false,
                rcpi: 0,
                rsni: 0,
            }),
        ))
        .await
        .unwrap();

    notify_tx
        .send((
            "wlan0".to_string(),
            Notification::Auth(AuthNotify { address: client_mac(), target: bssid(), signal: -50, freq: 2412000 }),
        ))
        .await
        .unwrap();

    notify_tx
        .send((
            "wlan0".to_string(),
            Notification::Assoc(AssocNotify { address: client_mac(), target: bssid(), signal: -50, freq: 2412000 }),
        ))
        .await
        .unwrap();

    timeout(Duration::from_secs(1), async {
        loop {
            if last_allow.lock().await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("orchestrator did not reply in time");

    assert_eq!(*last_allow.lock().await, Some(true));
    assert!(!events.lock().await.is_empty(), "probe should have been replicated to peers");

    drop(notify_tx);
    handle.abort();
}

#[tokio::test]
async fn malformed_config_file_falls_back_to_defaults() {
    let dir = std::env::temp_dir().join("dawn_orchestrator_cfg_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("dawn.toml");
    std::fs::write(&path, "min_probe_count = \"not a number\"").unwrap();

    let loaded = DawnConfig::load(&path);
    assert!(loaded.is_err(), "a malformed file should be reported, not silently accepted");
    std::fs::remove_file(&path).ok();
}
