//! Error taxonomy shared by stores, sessions, replication and the
//! control surface.

use crate::types::MacAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DawnError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl DawnError {
    pub fn not_found_probe(bssid: MacAddr, client: MacAddr) -> Self {
        DawnError::NotFound(format!("no probe entry for client {client} at ap {bssid}"))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, DawnError::Fatal(_))
    }
}

impl From<std::io::Error> for DawnError {
    fn from(e: std::io::Error) -> Self {
        DawnError::Transient(e.to_string())
    }
}
