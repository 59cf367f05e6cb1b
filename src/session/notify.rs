//! Notification bodies the radio manager publishes (§6), already
//! normalised to the fields a session needs beyond `address`.

use crate::types::MacAddr;

pub struct ProbeNotify {
    pub address: MacAddr,
    pub target: MacAddr,
    pub signal: i32,
    pub freq: i32,
    pub ht_capabilities: bool,
    pub vht_capabilities: bool,
    pub rcpi: i16,
    pub rsni: i16,
}

pub struct AuthNotify {
    pub address: MacAddr,
    pub target: MacAddr,
    pub signal: i32,
    pub freq: i32,
}

pub struct AssocNotify {
    pub address: MacAddr,
    pub target: MacAddr,
    pub signal: i32,
    pub freq: i32,
}

pub struct DeauthNotify {
    pub address: MacAddr,
    pub reason: u32,
}

pub struct BeaconReportNotify {
    pub address: MacAddr,
    pub op_class: i16,
    pub channel: i64,
    pub start_time: i32,
    pub duration: i16,
    pub report_info: i16,
    pub rcpi: i16,
    pub rsni: i16,
    pub bssid: MacAddr,
    pub antenna_id: i16,
    pub parent_tsf: i16,
}

pub enum Notification {
    Probe(ProbeNotify),
    Auth(AuthNotify),
    Assoc(AssocNotify),
    Deauth(DeauthNotify),
    BeaconReport(BeaconReportNotify),
}
