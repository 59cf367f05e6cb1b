//! dawn — distributed Wi-Fi client-steering decision engine.

use clap::Parser;
use dawn::config::DawnConfig;
use dawn::peer::{inbound, Identity, PeerDiscovery, TcpPeerTransport, UdpPeerTransport, UmdnsDiscovery};
use dawn::session::{Session, UnixSocketRadioManagerLink};
use dawn::types::MacAddr;
use dawn::Orchestrator;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const CHANNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "dawn", version, about = "Distributed Wi-Fi client-steering decision engine")]
struct Args {
    /// Path to the UCI-style TOML configuration file.
    #[arg(short, long, default_value = "/etc/dawn/dawn.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("dawn=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let config = match DawnConfig::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("failed to load config from {:?}: {e}", args.config);
            std::process::exit(1);
        }
    };

    info!("dawn v{VERSION} starting with {} configured radio(s)", config.network.radios.len());

    let (notify_tx, notify_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (peer_tx, peer_rx) = mpsc::channel(CHANNEL_CAPACITY);
    // No ubus control listener is wired up here (§6's RPC framing is an
    // external collaborator); kept alive so the orchestrator's control
    // branch never sees a closed channel and busy-spins.
    let (_control_tx, control_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let discovery = UmdnsDiscovery::new();

    let tcp_bind: SocketAddr = format!("0.0.0.0:{}", config.network.tcp_port)
        .parse()
        .expect("tcp_port always yields a valid socket address");

    let exit_code = if config.network.use_udp {
        let bind_addr: SocketAddr = config
            .network
            .broadcast_addr
            .as_deref()
            .unwrap_or("0.0.0.0:1030")
            .parse()
            .unwrap_or_else(|_| "0.0.0.0:1030".parse().unwrap());
        match UdpPeerTransport::bind(bind_addr, Identity).await {
            Ok(transport) => {
                let socket = transport.socket_handle();
                let tx = peer_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = inbound::serve_udp(socket, tx).await {
                        error!("udp peer listener on {bind_addr} exited: {e}");
                    }
                });
                run(args.config, config, transport, discovery, notify_tx, notify_rx, peer_rx, control_rx).await
            }
            Err(e) => {
                error!("failed to bind udp peer transport on {bind_addr}: {e}");
                1
            }
        }
    } else {
        if config.network.use_tcp {
            let tx = peer_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = inbound::serve_tcp(tcp_bind, tx).await {
                    error!("tcp peer listener on {tcp_bind} exited: {e}");
                }
            });
        }
        run(args.config, config, TcpPeerTransport::new(), discovery, notify_tx, notify_rx, peer_rx, control_rx).await
    };

    std::process::exit(exit_code);
}

async fn run<T: dawn::peer::PeerTransport>(
    config_path: PathBuf,
    config: DawnConfig,
    transport: T,
    discovery: UmdnsDiscovery,
    notify_tx: mpsc::Sender<(String, dawn::session::Notification)>,
    notify_rx: mpsc::Receiver<(String, dawn::session::Notification)>,
    peer_rx: mpsc::Receiver<dawn::peer::PeerEvent>,
    control_rx: mpsc::Receiver<dawn::control::ControlCommand>,
) -> i32 {
    let mut orchestrator =
        Orchestrator::new(config.clone(), config_path, transport, discovery, notify_rx, peer_rx, control_rx);

    for radio in &config.network.radios {
        let bssid = match MacAddr::parse(&radio.bssid) {
            Ok(m) => m,
            Err(e) => {
                warn!("skipping radio {}: invalid bssid {}: {e}", radio.iface, radio.bssid);
                continue;
            }
        };
        let socket_path = config.network.hostapd_dir.join(format!("{}.sock", radio.iface));
        let notify_path = config.network.hostapd_dir.join(format!("{}.notify.sock", radio.iface));
        let link = UnixSocketRadioManagerLink::new(socket_path);
        let mut session = Session::new(
            radio.iface.clone(),
            radio.hostname.clone(),
            bssid,
            radio.ssid.clone(),
            radio.ht_support,
            radio.vht_support,
            config.metric.chan_util_avg_period,
            link,
        );
        session.try_subscribe().await;
        orchestrator.add_session(session);

        let tx = notify_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = dawn::session::notify_listener::serve(notify_path.clone(), tx).await {
                error!("notification listener for {notify_path:?} exited: {e}");
            }
        });
    }

    match orchestrator.run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("orchestrator exited with error: {e}");
            if e.is_fatal() { 1 } else { 0 }
        }
    }
}
