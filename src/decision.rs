//! Decision engine (C4): allow/deny verdicts for probe/auth/assoc
//! requests, the denied-request sweep, and the kick-candidate sweep.

use crate::config::MetricConfig;
use crate::error::DawnError;
use crate::metric::better_ap_available;
use crate::store::{ApStore, ClientStore, DeniedStore, MacAllowList, ProbeEntry, ProbeStore};
use crate::types::{now, MacAddr, RequestKind};
use tracing::debug;

/// Everything `decide()` and the sweeps need. Borrowed, never owned,
/// so the orchestrator can build one of these per call without
/// cloning its stores.
pub struct DecisionContext<'a> {
    pub probe: &'a ProbeStore,
    pub client: &'a ClientStore,
    pub ap: &'a ApStore,
    pub denied: &'a DeniedStore,
    pub maclist: &'a MacAllowList,
    pub cfg: &'a MetricConfig,
}

/// Mirrors the source's `decide_function`: allow-list short-circuit,
/// starvation defence, per-kind feature flag, then scoring. Unknown
/// request kinds fall through to allow, matching the source's default
/// `return 1` (see the open-question decision in the design ledger).
pub async fn decide(ctx: &DecisionContext<'_>, probe: &ProbeEntry, kind: RequestKind) -> bool {
    if ctx.maclist.contains(probe.client).await {
        return true;
    }
    if probe.counter < ctx.cfg.min_probe_count {
        return false;
    }
    let eval_enabled = match kind {
        RequestKind::Probe => ctx.cfg.eval_probe_req,
        RequestKind::Auth => ctx.cfg.eval_auth_req,
        RequestKind::Assoc => ctx.cfg.eval_assoc_req,
        RequestKind::Other => return true,
    };
    if !eval_enabled {
        return true;
    }
    better_ap_available(ctx.ap, ctx.probe, probe.bssid, probe.client, ctx.cfg)
        .await
        .is_none()
}

/// Incoming probe request, already carrying the augmented local
/// `bssid`/`ssid` the session layer stamps onto every notification.
pub struct ProbeRequest {
    pub bssid: MacAddr,
    pub client: MacAddr,
    pub target: MacAddr,
    pub signal: i32,
    pub freq: i32,
    pub ht_capabilities: bool,
    pub vht_capabilities: bool,
}

/// Insert/refresh the probe entry, then decide. Probe requests are
/// never denied for lack of a prior probe (they create the first
/// one), so there is no `NotFound` path here. A brand-new identity
/// starts its counter at 1 (the first probe already counts as one
/// observation); `ProbeStore::insert` bumps it further on every
/// reinsert for the same identity.
pub async fn handle_probe(ctx: &DecisionContext<'_>, req: ProbeRequest) -> (bool, ProbeEntry) {
    let entry = ProbeEntry {
        bssid: req.bssid,
        client: req.client,
        target: req.target,
        signal: req.signal,
        freq: req.freq,
        ht_capabilities: req.ht_capabilities,
        vht_capabilities: req.vht_capabilities,
        rcpi: 0,
        rsni: 0,
        counter: 1,
        time: now(),
    };
    ctx.probe.insert(entry.clone(), crate::store::InsertPolicy::LOCAL).await;
    let stored = ctx.probe.get(req.bssid, req.client).await.unwrap_or(entry);
    let allow = decide(ctx, &stored, RequestKind::Probe).await;
    (allow, stored)
}

/// Auth/assoc both require a pre-existing probe entry. Its absence is
/// a `NotFound` the caller turns into the configured deny reason.
pub async fn handle_auth_or_assoc(
    ctx: &DecisionContext<'_>,
    bssid: MacAddr,
    client: MacAddr,
    kind: RequestKind,
) -> Result<bool, DawnError> {
    debug_assert!(matches!(kind, RequestKind::Auth | RequestKind::Assoc));
    let probe = ctx
        .probe
        .get(bssid, client)
        .await
        .ok_or_else(|| DawnError::not_found_probe(bssid, client))?;
    let allow = decide(ctx, &probe, kind).await;
    if !allow && ctx.cfg.use_driver_recog {
        ctx.denied
            .insert(
                crate::store::DeniedReq {
                    bssid,
                    client,
                    target: probe.target,
                    signal: probe.signal,
                    freq: probe.freq,
                    counter: 0,
                    time: now(),
                },
                crate::store::InsertPolicy::LOCAL,
            )
            .await;
    }
    Ok(allow)
}

/// Sweep denied requests older than `denied_req_threshold`; any whose
/// client is not currently associated anywhere locally is assumed to
/// belong to a driver that never retried, and is allow-listed so it
/// isn't orphaned permanently.
pub async fn process_denied(ctx: &DecisionContext<'_>, threshold_secs: u64) -> Vec<MacAddr> {
    let stale = ctx.denied.drain_older_than(threshold_secs).await;
    let mut newly_allowed = Vec::new();
    for req in stale {
        if ctx.client.get(req.client).await.is_none() {
            newly_allowed.push(req.client);
        }
    }
    if !newly_allowed.is_empty() {
        let _ = ctx.maclist.add_all(&newly_allowed).await;
    }
    newly_allowed
}

/// A client the kick sweep wants steered off this AP.
pub struct KickAction {
    pub bssid: MacAddr,
    pub client: MacAddr,
    pub target_neighbor_report: String,
    /// `true` once the client has ignored enough consecutive BTM
    /// hints that `kicking` should forcibly deauthenticate it.
    pub force_deauth: bool,
}

/// Evaluate every locally associated client against `better_ap_available`.
/// A client needs `min_kick_count` consecutive positive sweeps before
/// a `KickAction` is emitted; any sweep where the verdict flips back
/// to "no better AP" resets its counter.
pub async fn run_kick_sweep(ctx: &DecisionContext<'_>) -> Vec<KickAction> {
    let mut actions = Vec::new();
    for client in ctx.client.all().await {
        match better_ap_available(ctx.ap, ctx.probe, client.bssid, client.client, ctx.cfg).await {
            Some(better) => {
                let count = ctx.client.bump_kick_count(client.client).await.unwrap_or(1);
                debug!(
                    client = %client.client,
                    bssid = %client.bssid,
                    target = %better.bssid,
                    consecutive = count,
                    "better ap available for associated client"
                );
                if count >= ctx.cfg.min_kick_count {
                    actions.push(KickAction {
                        bssid: client.bssid,
                        client: client.client,
                        target_neighbor_report: better.neighbor_report,
                        force_deauth: ctx.cfg.kicking,
                    });
                    ctx.client.reset_kick_count(client.client).await;
                }
            }
            None => ctx.client.reset_kick_count(client.client).await,
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{APEntry, ClientEntry, InsertPolicy};

    fn ctx_pieces() -> (ProbeStore, ClientStore, ApStore, DeniedStore, MacAllowList) {
        let path = std::env::temp_dir().join(format!("dawn_decision_test_{}", rand::random::<u64>()));
        (ProbeStore::new(), ClientStore::new(), ApStore::new(), DeniedStore::new(), MacAllowList::new(path))
    }

    #[tokio::test]
    async fn mac_allow_list_bypasses_starvation_and_scoring() {
        let (probe, client, ap, denied, maclist) = ctx_pieces();
        let cfg = MetricConfig::default();
        let allowed_mac = MacAddr([0xaa, 0, 0, 0, 0, 42]);
        maclist.add_all(&[allowed_mac]).await.unwrap();

        let ctx = DecisionContext { probe: &probe, client: &client, ap: &ap, denied: &denied, maclist: &maclist, cfg: &cfg };
        let entry = ProbeEntry {
            bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
            client: allowed_mac,
            target: MacAddr([0x11, 0, 0, 0, 0, 1]),
            signal: -90,
            freq: 2412000,
            ht_capabilities: false,
            vht_capabilities: false,
            rcpi: 0,
            rsni: 0,
            counter: 0,
            time: now(),
        };
        assert!(decide(&ctx, &entry, RequestKind::Probe).await);
    }

    #[tokio::test]
    async fn handle_probe_initializes_counter_to_one() {
        let (probe, client, ap, denied, maclist) = ctx_pieces();
        let cfg = MetricConfig::default();
        let ctx = DecisionContext { probe: &probe, client: &client, ap: &ap, denied: &denied, maclist: &maclist, cfg: &cfg };
        let (_, stored) = handle_probe(
            &ctx,
            ProbeRequest {
                bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
                client: MacAddr([0xaa, 0, 0, 0, 0, 1]),
                target: MacAddr([0x11, 0, 0, 0, 0, 1]),
                signal: -60,
                freq: 2412000,
                ht_capabilities: true,
                vht_capabilities: false,
            },
        )
        .await;
        assert_eq!(stored.counter, 1);

        let (_, stored_again) = handle_probe(
            &ctx,
            ProbeRequest {
                bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
                client: MacAddr([0xaa, 0, 0, 0, 0, 1]),
                target: MacAddr([0x11, 0, 0, 0, 0, 1]),
                signal: -58,
                freq: 2412000,
                ht_capabilities: true,
                vht_capabilities: false,
            },
        )
        .await;
        assert_eq!(stored_again.counter, 2);
    }

    #[tokio::test]
    async fn below_min_probe_count_denies() {
        let (probe, client, ap, denied, maclist) = ctx_pieces();
        let mut cfg = MetricConfig::default();
        cfg.min_probe_count = 3;
        let ctx = DecisionContext { probe: &probe, client: &client, ap: &ap, denied: &denied, maclist: &maclist, cfg: &cfg };
        let entry = ProbeEntry {
            bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
            client: MacAddr([0xaa, 0, 0, 0, 0, 1]),
            target: MacAddr([0x11, 0, 0, 0, 0, 1]),
            signal: -60,
            freq: 2412000,
            ht_capabilities: true,
            vht_capabilities: false,
            rcpi: 0,
            rsni: 0,
            counter: 1,
            time: now(),
        };
        assert!(!decide(&ctx, &entry, RequestKind::Probe).await);
    }

    #[tokio::test]
    async fn unknown_request_kind_is_always_allowed() {
        let (probe, client, ap, denied, maclist) = ctx_pieces();
        let cfg = MetricConfig::default();
        let ctx = DecisionContext { probe: &probe, client: &client, ap: &ap, denied: &denied, maclist: &maclist, cfg: &cfg };
        let entry = ProbeEntry {
            bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
            client: MacAddr([0xaa, 0, 0, 0, 0, 1]),
            target: MacAddr([0x11, 0, 0, 0, 0, 1]),
            signal: -90,
            freq: 2412000,
            ht_capabilities: false,
            vht_capabilities: false,
            rcpi: 0,
            rsni: 0,
            counter: 0,
            time: now(),
        };
        assert!(decide(&ctx, &entry, RequestKind::Other).await);
    }

    #[tokio::test]
    async fn auth_without_prior_probe_is_not_found() {
        let (probe, client, ap, denied, maclist) = ctx_pieces();
        let cfg = MetricConfig::default();
        let ctx = DecisionContext { probe: &probe, client: &client, ap: &ap, denied: &denied, maclist: &maclist, cfg: &cfg };
        let result = handle_auth_or_assoc(
            &ctx,
            MacAddr([0x11, 0, 0, 0, 0, 1]),
            MacAddr([0xaa, 0, 0, 0, 0, 1]),
            RequestKind::Auth,
        )
        .await;
        assert!(matches!(result, Err(DawnError::NotFound(_))));
    }

    #[tokio::test]
    async fn kick_sweep_resets_counter_when_no_better_ap() {
        let (probe, client, ap, denied, maclist) = ctx_pieces();
        let cfg = MetricConfig::default();
        let ctx = DecisionContext { probe: &probe, client: &client, ap: &ap, denied: &denied, maclist: &maclist, cfg: &cfg };

        ap.insert(
            APEntry {
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
        client
            .insert(
                ClientEntry {
                    bssid: MacAddr([0x11, 0, 0, 0, 0, 1]),
                    client: MacAddr([0xaa, 0, 0, 0, 0, 1]),
                    ht: true,
                    vht: false,
                    kick_count: 4,
                    signature: String::new(),
                    time: now(),
                },
                InsertPolicy::LOCAL,
            )
            .await;

        let actions = run_kick_sweep(&ctx).await;
        assert!(actions.is_empty());
        let row = client.get(MacAddr([0xaa, 0, 0, 0, 0, 1])).await.unwrap();
        assert_eq!(row.kick_count, 0);
    }
}
