//! Inbound half of the radio-manager socket: accepts pushed
//! notifications (probe/auth/assoc/deauth/beacon-report) and forwards
//! them into the orchestrator's event loop, paired with the outbound
//! RPC calls `UnixSocketRadioManagerLink` issues over a separate
//! connection.

use super::notify::{AssocNotify, AuthNotify, BeaconReportNotify, DeauthNotify, Notification, ProbeNotify};
use crate::types::MacAddr;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Serialize, Deserialize)]
enum WireNotification {
    Probe { address: MacAddr, target: MacAddr, signal: i32, freq: i32, ht: bool, vht: bool, rcpi: i16, rsni: i16 },
    Auth { address: MacAddr, target: MacAddr, signal: i32, freq: i32 },
    Assoc { address: MacAddr, target: MacAddr, signal: i32, freq: i32 },
    Deauth { address: MacAddr, reason: u32 },
    BeaconReport {
        address: MacAddr,
        op_class: i16,
        channel: i64,
        start_time: i32,
        duration: i16,
        report_info: i16,
        rcpi: i16,
        rsni: i16,
        bssid: MacAddr,
        antenna_id: i16,
        parent_tsf: i16,
    },
}

impl From<WireNotification> for Notification {
    fn from(w: WireNotification) -> Self {
        match w {
            WireNotification::Probe { address, target, signal, freq, ht, vht, rcpi, rsni } => {
                Notification::Probe(ProbeNotify {
                    address,
                    target,
                    signal,
                    freq,
                    ht_capabilities: ht,
                    vht_capabilities: vht,
                    rcpi,
                    rsni,
                })
            }
            WireNotification::Auth { address, target, signal, freq } => {
                Notification::Auth(AuthNotify { address, target, signal, freq })
            }
            WireNotification::Assoc { address, target, signal, freq } => {
                Notification::Assoc(AssocNotify { address, target, signal, freq })
            }
            WireNotification::Deauth { address, reason } => Notification::Deauth(DeauthNotify { address, reason }),
            WireNotification::BeaconReport {
                address,
                op_class,
                channel,
                start_time,
                duration,
                report_info,
                rcpi,
                rsni,
                bssid,
                antenna_id,
                parent_tsf,
            } => Notification::BeaconReport(BeaconReportNotify {
                address,
                op_class,
                channel,
                start_time,
                duration,
                report_info,
                rcpi,
                rsni,
                bssid,
                antenna_id,
                parent_tsf,
            }),
        }
    }
}

/// Binds `path` and forwards `(iface, Notification)` pairs read from
/// every accepted connection until the socket is removed or the
/// process exits. `iface` is the socket's file stem.
pub async fn serve(path: PathBuf, tx: mpsc::Sender<(String, Notification)>) -> std::io::Result<()> {
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let iface = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown").to_string();

    loop {
        let (mut stream, _) = listener.accept().await?;
        let tx = tx.clone();
        let iface = iface.clone();
        tokio::spawn(async move {
            loop {
                let mut len_buf = [0u8; 4];
                if stream.read_exact(&mut len_buf).await.is_err() {
                    return;
                }
                let len = u32::from_be_bytes(len_buf) as usize;
                let mut body = vec![0u8; len];
                if stream.read_exact(&mut body).await.is_err() {
                    return;
                }
                match postcard::from_bytes::<WireNotification>(&body) {
                    Ok(w) => {
                        if tx.send((iface.clone(), w.into())).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!(%iface, error = %e, "dropped malformed notification"),
                }
            }
        });
    }
}
