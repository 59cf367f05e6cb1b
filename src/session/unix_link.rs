//! A concrete `RadioManagerLink` speaking a length-prefixed postcard
//! request/response framing over a Unix domain socket.
//!
//! Real hostapd control sockets (and ubus) have their own wire
//! formats; the socket framing here is a stand-in transport, not a
//! reimplementation of either, documented as such in the design
//! ledger. Anything that understands the same framing at the other
//! end satisfies this trait's contract.

use super::link::{ClientInfo, NeighborRow, RadioManagerLink};
use crate::error::DawnError;
use crate::types::MacAddr;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

#[derive(Serialize, Deserialize)]
enum Request {
    GetClients,
    RrmNrGetOwn,
    RrmNrSet(Vec<(String, String, String)>),
    RrmBeaconReq { addr: MacAddr, op_class: i16, channel: i64, duration: i16, mode: i16 },
    BssMgmtEnable,
    DelClient { addr: MacAddr, reason: u16, deauth: bool, ban_time: u32 },
    WnmDisassocImminent { addr: MacAddr, duration: u32, neighbors: Vec<String> },
    NotifyResponse { allow: bool },
    ChannelUtilizationSample,
}

#[derive(Serialize, Deserialize)]
enum Response {
    Ok,
    Clients(Vec<(MacAddr, bool, bool, String)>),
    NeighborReport(String),
    ChanUtil(u64, u64),
    Error(String),
}

pub struct UnixSocketRadioManagerLink {
    path: PathBuf,
    stream: Mutex<Option<UnixStream>>,
}

impl UnixSocketRadioManagerLink {
    pub fn new(path: PathBuf) -> Self {
        UnixSocketRadioManagerLink { path, stream: Mutex::new(None) }
    }

    async fn call(&self, req: &Request) -> Result<Response, DawnError> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            let stream = UnixStream::connect(&self.path)
                .await
                .map_err(|e| DawnError::Transient(format!("connect {}: {e}", self.path.display())))?;
            *guard = Some(stream);
        }
        let stream = guard.as_mut().expect("just populated");

        let body = postcard::to_allocvec(req)
            .map_err(|e| DawnError::InvalidArgument(format!("encode request: {e}")))?;
        let len = (body.len() as u32).to_be_bytes();
        if let Err(e) = stream.write_all(&len).await.and(stream.write_all(&body).await) {
            *guard = None;
            return Err(DawnError::Transient(format!("write: {e}")));
        }

        let mut len_buf = [0u8; 4];
        if let Err(e) = stream.read_exact(&mut len_buf).await {
            *guard = None;
            return Err(DawnError::Transient(format!("read len: {e}")));
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut resp_buf = vec![0u8; len];
        if let Err(e) = stream.read_exact(&mut resp_buf).await {
            *guard = None;
            return Err(DawnError::Transient(format!("read body: {e}")));
        }
        postcard::from_bytes(&resp_buf)
            .map_err(|e| DawnError::Transient(format!("decode response: {e}")))
    }
}

impl RadioManagerLink for UnixSocketRadioManagerLink {
    async fn get_clients(&self, _iface: &str) -> Result<Vec<ClientInfo>, DawnError> {
        match self.call(&Request::GetClients).await? {
            Response::Clients(rows) => Ok(rows
                .into_iter()
                .map(|(client, ht, vht, signature)| ClientInfo { client, ht, vht, signature })
                .collect()),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to get_clients".into())),
        }
    }

    async fn rrm_nr_get_own(&self, _iface: &str) -> Result<String, DawnError> {
        match self.call(&Request::RrmNrGetOwn).await? {
            Response::NeighborReport(s) => Ok(s),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to rrm_nr_get_own".into())),
        }
    }

    async fn rrm_nr_set(&self, _iface: &str, rows: Vec<NeighborRow>) -> Result<(), DawnError> {
        let wire = rows.into_iter().map(|r| (r.bssid_hex, r.ssid, r.neighbor_report)).collect();
        match self.call(&Request::RrmNrSet(wire)).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to rrm_nr_set".into())),
        }
    }

    async fn rrm_beacon_req(
        &self,
        _iface: &str,
        addr: MacAddr,
        op_class: i16,
        channel: i64,
        duration: i16,
        mode: i16,
    ) -> Result<(), DawnError> {
        match self.call(&Request::RrmBeaconReq { addr, op_class, channel, duration, mode }).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to rrm_beacon_req".into())),
        }
    }

    async fn bss_mgmt_enable(&self, _iface: &str) -> Result<(), DawnError> {
        match self.call(&Request::BssMgmtEnable).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to bss_mgmt_enable".into())),
        }
    }

    async fn del_client(
        &self,
        _iface: &str,
        addr: MacAddr,
        reason: u16,
        deauth: bool,
        ban_time: u32,
    ) -> Result<(), DawnError> {
        match self.call(&Request::DelClient { addr, reason, deauth, ban_time }).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to del_client".into())),
        }
    }

    async fn wnm_disassoc_imminent(
        &self,
        _iface: &str,
        addr: MacAddr,
        duration: u32,
        neighbors: Vec<String>,
    ) -> Result<(), DawnError> {
        match self.call(&Request::WnmDisassocImminent { addr, duration, neighbors }).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to wnm_disassoc_imminent".into())),
        }
    }

    async fn notify_response(&self, _iface: &str, allow: bool) -> Result<(), DawnError> {
        match self.call(&Request::NotifyResponse { allow }).await? {
            Response::Ok => Ok(()),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to notify_response".into())),
        }
    }

    async fn channel_utilization_sample(&self, _iface: &str) -> Result<(u64, u64), DawnError> {
        match self.call(&Request::ChannelUtilizationSample).await? {
            Response::ChanUtil(busy, total) => Ok((busy, total)),
            Response::Error(e) => Err(DawnError::Transient(e)),
            _ => Err(DawnError::Transient("unexpected response to channel_utilization_sample".into())),
        }
    }
}
