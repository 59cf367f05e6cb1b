//! In-memory entry stores (C2): probe, client, AP, denied-request and
//! MAC allow-list tables, each behind its own mutex so that an aging
//! sweep on one store never blocks traffic touching another.

pub mod ap;
pub mod client;
pub mod denied;
pub mod maclist;
pub mod probe;

pub use ap::{APEntry, ApStore};
pub use client::{ClientEntry, ClientStore};
pub use denied::{DeniedReq, DeniedStore};
pub use maclist::MacAllowList;
pub use probe::{ProbeEntry, ProbeStore};

/// Controls how `insert` behaves when an entry with the same identity
/// is already present, and whether the mutation should be replicated
/// to peers.
#[derive(Debug, Clone, Copy)]
pub struct InsertPolicy {
    /// Re-sort the backing vector after insertion to preserve the
    /// store's ordering invariant (needed by AP and probe stores).
    pub sort_after_insert: bool,
    /// If an entry with the same identity exists, bump its `counter`
    /// and refresh its mutable fields instead of creating a
    /// duplicate.
    pub bump_counter_if_present: bool,
    /// Whether a store's own counter-like field (`ProbeEntry::counter`)
    /// is authoritative on the incoming entry and should be taken
    /// verbatim. A local observation derives its counter from what is
    /// already stored (`LOCAL`); a replicated entry already carries
    /// the sender's counter and must not be re-derived from local
    /// state (`FROM_PEER`), or replaying the same event twice would
    /// silently advance it.
    pub trust_incoming_counter: bool,
    /// Skip broadcasting this mutation to peers — set when applying
    /// an event that itself arrived from a peer.
    pub suppress_replication: bool,
}

impl InsertPolicy {
    pub const LOCAL: InsertPolicy = InsertPolicy {
        sort_after_insert: true,
        bump_counter_if_present: true,
        trust_incoming_counter: false,
        suppress_replication: false,
    };

    pub const FROM_PEER: InsertPolicy = InsertPolicy {
        sort_after_insert: true,
        bump_counter_if_present: true,
        trust_incoming_counter: true,
        suppress_replication: true,
    };
}
