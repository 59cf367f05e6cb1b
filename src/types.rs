//! Shared value types: MAC addresses, timestamps, request kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since an arbitrary but monotonically increasing origin.
///
/// Matches the source's use of `time(NULL)`: a coarse wall clock is
/// good enough for aging and averaging windows measured in seconds.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 6-byte EUI-48 station/AP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub fn parse(s: &str) -> Result<Self, ParseMacError> {
        let cleaned: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if cleaned.len() != 12 {
            return Err(ParseMacError(s.to_string()));
        }
        let bytes = hex::decode(&cleaned).map_err(|_| ParseMacError(s.to_string()))?;
        let mut out = [0u8; 6];
        out.copy_from_slice(&bytes);
        Ok(MacAddr(out))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[derive(Debug, Clone)]
pub struct ParseMacError(String);

impl fmt::Display for ParseMacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid MAC address: {}", self.0)
    }
}

impl std::error::Error for ParseMacError {}

/// SSID, at most 32 bytes per 802.11.
pub const MAX_SSID_LEN: usize = 32;

/// Opaque 802.11k neighbor report, hex-encoded on the wire.
pub const MAX_NEIGHBOR_REPORT_LEN: usize = 512;

/// The three management-frame kinds the decision engine evaluates.
/// Any other value observed on the wire is treated as `Other` and
/// allowed by `decide()` — see the source's `decide_function` default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Probe,
    Auth,
    Assoc,
    Other,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestKind::Probe => "probe",
            RequestKind::Auth => "auth",
            RequestKind::Assoc => "assoc",
            RequestKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_round_trips_through_display_and_parse() {
        let mac = MacAddr([0xaa, 0xbb, 0xcc, 0x00, 0x00, 0x01]);
        let text = mac.to_string();
        assert_eq!(text, "aa:bb:cc:00:00:01");
        assert_eq!(MacAddr::parse(&text).unwrap(), mac);
    }

    #[test]
    fn mac_parse_rejects_short_input() {
        assert!(MacAddr::parse("aa:bb:cc").is_err());
    }
}
