//! Orchestrator (C8): owns every store, the timer wheel, the session
//! map, and drives the single cooperative event loop (§5) that
//! multiplexes radio-manager notifications, peer traffic, control
//! commands and periodic maintenance.

use crate::clock::{Timer, TimerWheel};
use crate::config::DawnConfig;
use crate::control::{build_hearing_map, build_network_overview, ControlCommand};
use crate::decision::{self, DecisionContext};
use crate::peer::{self, PeerDiscovery, PeerEvent, PeerTransport, ReplicationSink};
use crate::session::link::RadioManagerLink;
use crate::session::notify::Notification;
use crate::session::Session;
use crate::store::{ApStore, ClientStore, DeniedStore, MacAllowList, ProbeStore};
use crate::types::{MacAddr, RequestKind};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct Orchestrator<L: RadioManagerLink, T: PeerTransport, D: PeerDiscovery> {
    probe: ProbeStore,
    client: ClientStore,
    ap: ApStore,
    denied: DeniedStore,
    maclist: MacAllowList,

    sessions: Vec<Session<L>>,
    transport: T,
    discovery: D,

    config: DawnConfig,
    config_path: PathBuf,
    timers: TimerWheel,

    notifications: mpsc::Receiver<(String, Notification)>,
    peer_inbound: mpsc::Receiver<PeerEvent>,
    control: mpsc::Receiver<ControlCommand>,
}

impl<L: RadioManagerLink, T: PeerTransport, D: PeerDiscovery> Orchestrator<L, T, D> {
    pub fn new(
        config: DawnConfig,
        config_path: PathBuf,
        transport: T,
        discovery: D,
        notifications: mpsc::Receiver<(String, Notification)>,
        peer_inbound: mpsc::Receiver<PeerEvent>,
        control: mpsc::Receiver<ControlCommand>,
    ) -> Self {
        Orchestrator {
            probe: ProbeStore::new(),
            client: ClientStore::new(),
            ap: ApStore::new(),
            denied: DeniedStore::new(),
            maclist: MacAllowList::new(config.network.mac_list_path.clone()),
            sessions: Vec::new(),
            transport,
            discovery,
            timers: TimerWheel::new(),
            config,
            config_path,
            notifications,
            peer_inbound,
            control,
        }
    }

    pub fn add_session(&mut self, session: Session<L>) {
        self.sessions.push(session);
    }

    fn local_bssids(&self) -> HashSet<MacAddr> {
        self.sessions.iter().map(|s| s.bssid).collect()
    }

    fn ctx(&self) -> DecisionContext<'_> {
        DecisionContext {
            probe: &self.probe,
            client: &self.client,
            ap: &self.ap,
            denied: &self.denied,
            maclist: &self.maclist,
            cfg: &self.config.metric,
        }
    }

    /// Arm every periodic timer at startup, matching the upstream
    /// orchestrator's conditional timer registration order.
    fn arm_all_timers(&mut self) {
        let t = &self.config.times;
        self.timers.arm(Timer::UpdateClient, Duration::from_secs(t.update_client));
        self.timers.arm(Timer::RemoveClient, Duration::from_secs(t.remove_client));
        self.timers.arm(Timer::RemoveProbe, Duration::from_secs(t.remove_probe));
        self.timers.arm(Timer::RemoveAp, Duration::from_secs(t.remove_ap));
        self.timers.arm(Timer::UpdateHostapd, Duration::from_secs(t.update_hostapd));
        self.timers.arm(Timer::UpdateChanUtil, Duration::from_secs(t.update_chan_util));
        if self.config.network.use_tcp {
            self.timers.arm(Timer::UpdateTcpCon, Duration::from_secs(t.update_tcp_con));
        }
        if self.config.metric.use_driver_recog {
            self.timers.arm(Timer::DeniedReqThreshold, Duration::from_secs(t.denied_req_threshold));
        }
        if t.update_beacon_reports > 0 {
            self.timers.arm(Timer::UpdateBeaconReports, Duration::from_secs(t.update_beacon_reports));
        }
    }

    pub async fn run(mut self) -> Result<(), crate::error::DawnError> {
        self.maclist.load().await?;
        self.arm_all_timers();
        info!("dawn orchestrator starting with {} session(s)", self.sessions.len());

        loop {
            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    return Ok(());
                }

                Some((iface, notification)) = self.notifications.recv() => {
                    self.handle_notification(&iface, notification).await;
                }

                Some(event) = self.peer_inbound.recv() => {
                    self.handle_peer_event(event).await;
                }

                Some(cmd) = self.control.recv() => {
                    self.handle_control(cmd).await;
                }

                Some(timer) = self.timers.next() => {
                    self.handle_timer(timer).await;
                }
            }
        }
    }

    async fn handle_notification(&mut self, iface: &str, notification: Notification) {
        let Some(session_index) = self.sessions.iter().position(|s| s.iface == iface) else {
            warn!(iface, "notification for unknown session dropped");
            return;
        };

        match notification {
            Notification::Probe(n) => {
                let bssid = self.sessions[session_index].bssid;
                let (allow, entry) = decision::handle_probe(
                    &self.ctx(),
                    decision::ProbeRequest {
                        bssid,
                        client: n.address,
                        target: n.target,
                        signal: n.signal,
                        freq: n.freq,
                        ht_capabilities: n.ht_capabilities,
                        vht_capabilities: n.vht_capabilities,
                    },
                )
                .await;
                let _ = self.sessions[session_index].reply(&self.ctx(), allow).await;
                let _ = self.transport.broadcast(&PeerEvent::Probe(entry)).await;
            }
            Notification::Auth(n) => {
                self.handle_auth_or_assoc(session_index, n.address, RequestKind::Auth).await;
            }
            Notification::Assoc(n) => {
                self.handle_auth_or_assoc(session_index, n.address, RequestKind::Assoc).await;
            }
            Notification::Deauth(n) => {
                let bssid = self.sessions[session_index].bssid;
                let _ = self.transport.broadcast(&PeerEvent::Deauth { bssid, client: n.address }).await;
                self.client.delete(n.address).await;
            }
            Notification::BeaconReport(n) => {
                self.sessions[session_index]
                    .on_beacon_report(&self.probe, self.config.metric.min_probe_count, n)
                    .await;
            }
        }
    }

    async fn handle_auth_or_assoc(&mut self, session_index: usize, client: MacAddr, kind: RequestKind) {
        let bssid = self.sessions[session_index].bssid;
        let allow = match decision::handle_auth_or_assoc(&self.ctx(), bssid, client, kind).await {
            Ok(allow) => allow,
            Err(e) => {
                warn!(%client, %bssid, error = %e, "auth/assoc denied: no probe entry");
                false
            }
        };
        let _ = self.sessions[session_index].reply(&self.ctx(), allow).await;
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        let sink = ReplicationSink {
            probe: &self.probe,
            client: &self.client,
            ap: &self.ap,
            denied: &self.denied,
            maclist: &self.maclist,
        };
        if let PeerEvent::Uci(ref config) = event {
            self.config = (**config).clone();
        }
        peer::apply(&sink, event).await;
    }

    async fn handle_control(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::AddMac { addrs, respond_to } => {
                let changed = self.maclist.add_all(&addrs).await.unwrap_or(false);
                if changed {
                    let _ = self.transport.broadcast(&PeerEvent::AddMac(addrs)).await;
                }
                let _ = respond_to.send(changed);
            }
            ControlCommand::GetHearingMap { respond_to } => {
                let map = build_hearing_map(&self.ap, &self.probe, &self.config.metric).await;
                let _ = respond_to.send(map);
            }
            ControlCommand::GetNetwork { respond_to } => {
                let overview = build_network_overview(&self.ap, &self.client, &self.local_bssids()).await;
                let _ = respond_to.send(overview);
            }
            ControlCommand::ReloadConfig { respond_to } => {
                self.config.reload(&self.config_path);
                let _ = self.transport.broadcast(&PeerEvent::Uci(Box::new(self.config.clone()))).await;
                let _ = respond_to.send(());
            }
        }
    }

    async fn handle_timer(&mut self, timer: Timer) {
        let t = self.config.times.clone();
        match timer {
            Timer::UpdateClient => {
                for session in &self.sessions {
                    let _ = session.refresh_clients(&self.client).await;
                }
                let actions = decision::run_kick_sweep(&self.ctx()).await;
                for action in actions {
                    if let Some(session) = self.sessions.iter().find(|s| s.bssid == action.bssid) {
                        let _ = session.apply_kick(&action, self.config.metric.deny_assoc_reason).await;
                    }
                }
                self.timers.arm(Timer::UpdateClient, Duration::from_secs(t.update_client));
            }
            Timer::DeniedReqThreshold => {
                let newly_allowed = decision::process_denied(&self.ctx(), t.denied_req_threshold).await;
                if !newly_allowed.is_empty() {
                    let _ = self.transport.broadcast(&PeerEvent::AddMac(newly_allowed)).await;
                }
                if self.config.metric.use_driver_recog {
                    self.timers.arm(Timer::DeniedReqThreshold, Duration::from_secs(t.denied_req_threshold));
                }
            }
            Timer::RemoveClient => {
                self.client.age(t.remove_client).await;
                self.timers.arm(Timer::RemoveClient, Duration::from_secs(t.remove_client));
            }
            Timer::RemoveProbe => {
                self.probe.age(t.remove_probe).await;
                self.timers.arm(Timer::RemoveProbe, Duration::from_secs(t.remove_probe));
            }
            Timer::RemoveAp => {
                self.ap.age(t.remove_ap).await;
                self.timers.arm(Timer::RemoveAp, Duration::from_secs(t.remove_ap));
            }
            Timer::UpdateHostapd => {
                // Socket-directory rescanning for newly appeared radios
                // is an external collaborator concern (§6); sessions
                // are added via `add_session` by the caller that owns
                // the socket listener.
                self.timers.arm(Timer::UpdateHostapd, Duration::from_secs(t.update_hostapd));
            }
            Timer::UpdateTcpCon => {
                if let Ok(_peers) = self.discovery.discover().await {
                    // New peer addresses are handed to the transport by
                    // the caller that owns the TCP connection pool.
                }
                self.timers.arm(Timer::UpdateTcpCon, Duration::from_secs(t.update_tcp_con));
            }
            Timer::UpdateChanUtil => {
                for session in &mut self.sessions {
                    let _ = session.sample_channel_utilization(&self.ap).await;
                }
                self.timers.arm(Timer::UpdateChanUtil, Duration::from_secs(t.update_chan_util));
            }
            Timer::UpdateBeaconReports => {
                if t.update_beacon_reports > 0 {
                    self.timers.arm(Timer::UpdateBeaconReports, Duration::from_secs(t.update_beacon_reports));
                }
            }
        }
    }
}
