//! The per-client session supervisor (spec §4.5): drives one PPPoE dial
//! through LCP, authentication, and the enabled NCPs to Open, publishing
//! exactly one [`SessionResult`] regardless of which stage fails.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::RngCore;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zpkt::ether::EtherAddr;
use zpkt::ppp::options::LcpOptionType;
use zpkt::ppp::PppProtocol;
use zpkt::pppoe::{PppoeCode, PppoeSession, PPPOE_SESSION_HEADER_TEMPLATE};
use zpkt::{Buf, Cursor, CursorMut, PktBufMut};

use crate::auth;
use crate::config::AuthProto;
use crate::datapath::{DatapathAdapter, DatapathContext};
use crate::discovery::{self, DiscoveryTag};
use crate::fsm::{ipcp, ipv6cp, lcp, Event, Fsm, FsmParams, LayerEvent, OwnOptionRule, PeerOptionRule};
use crate::mux::{EgressHandle, PppMux, RingReceiver};
use crate::relay::PacketRelay;

const ETHERTYPE_PPPOE_SESSION: u16 = 0x8864;

/// Default RFC 1661 Restart-Timer: how long each NCP/LCP waits for a reply to
/// a Configure-Request before retransmitting, independent of the per-attempt
/// discovery/auth timeout configured for the session.
const DEFAULT_RESTART_TIMER: Duration = Duration::from_secs(10);

/// Default LCP Keepalive-Interval (Echo-Request cadence).
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// What a session produced: success carries what was negotiated, failure
/// carries the reason it stopped.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success {
        ipv4: Option<Ipv4Addr>,
        ipv6_ifid: Option<[u8; 8]>,
    },
    Failure {
        reason: String,
    },
}

/// Published at most once per session (spec §4.5: "idempotent (at-most-once),
/// keyed by a per-session once-latch").
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub client_index: u32,
    pub outcome: Outcome,
    pub started_at: Instant,
    pub finished_at: Instant,
}

/// Per-client parameters the supervisor needs; everything else (MAC/VLAN
/// striding, `@ID` substitution) is the fleet runner's job.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_index: u32,
    pub service_name: String,
    pub cid: String,
    pub rid: String,
    pub auth_proto: AuthProto,
    pub username: String,
    pub password: String,
    pub ipv4: bool,
    pub ipv6: bool,
    pub ifname: String,
    pub retry: u32,
    pub timeout: Duration,
}

/// Build the BBF Vendor-Specific discovery tag carrying Circuit-ID/Remote-ID,
/// if either field is non-empty.
fn bbf_discovery_tags(cid: &str, rid: &str) -> Vec<DiscoveryTag> {
    if cid.is_empty() && rid.is_empty() {
        return Vec::new();
    }
    let circuit_id = (!cid.is_empty()).then(|| cid.as_bytes());
    let remote_id = (!rid.is_empty()).then(|| rid.as_bytes());
    let mut buf = vec![0u8; 4 + cid.len() + 2 + rid.len() + 2];
    let n = zpkt::pppoe::vendor::build_bbf_subtags(&mut buf, circuit_id, remote_id);
    buf.truncate(n);
    vec![DiscoveryTag {
        tag_type: zpkt::pppoe::PppoeTagType::VENDOR,
        value: buf,
    }]
}

fn spawn_fsm<O, P>(
    params: FsmParams,
    own: Arc<RwLock<O>>,
    peer: Arc<RwLock<P>>,
    egress: EgressHandle,
    protocol_reject_router: Option<Arc<RwLock<HashMap<u16, mpsc::Sender<Event>>>>>,
    ingress: RingReceiver<Vec<u8>>,
    cancel: CancellationToken,
) -> (mpsc::Sender<Event>, mpsc::Receiver<LayerEvent>)
where
    O: OwnOptionRule + 'static,
    P: PeerOptionRule + 'static,
{
    let (control_tx, control_rx) = mpsc::channel(8);
    let (layer_tx, layer_rx) = mpsc::channel(8);
    let fsm = Fsm::new(params, own, peer, egress, layer_tx, protocol_reject_router);
    tokio::spawn(fsm.run(control_rx, ingress, cancel));
    (control_tx, layer_rx)
}

/// Pump inbound PPPoE session frames for this session into the mux, and
/// outbound mux frames back out as PPPoE session frames. Runs until `cancel`
/// fires or the relay is no longer usable.
async fn run_session_framing(
    relay: Arc<dyn PacketRelay>,
    mux: Arc<PppMux>,
    mut egress_rx: mpsc::Receiver<Vec<u8>>,
    peer_mac: EtherAddr,
    session_id: u16,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            maybe_frame = relay.read(Duration::from_secs(3600)) => {
                let Ok(frame) = maybe_frame else { continue };
                if frame.ethertype != ETHERTYPE_PPPOE_SESSION || frame.remote_mac != peer_mac {
                    continue;
                }
                let Ok(pkt) = PppoeSession::parse(Cursor::new(&frame.payload[..])) else {
                    warn!("dropping malformed PPPoE session frame");
                    continue;
                };
                if pkt.code() != PppoeCode::SESSION || pkt.session_id() != session_id {
                    continue;
                }
                mux.dispatch_ingress(pkt.payload().chunk()).await;
            }
            Some(ppp_frame) = egress_rx.recv() => {
                let total = PPPOE_SESSION_HEADER_TEMPLATE.len() + ppp_frame.len();
                let mut bytes = vec![0u8; total];
                {
                    let mut buf = CursorMut::new(&mut bytes[..]);
                    buf.advance(total);
                    buf.chunk_mut()[..ppp_frame.len()].copy_from_slice(&ppp_frame);
                    let mut pkt = PppoeSession::prepend_header(buf, &PPPOE_SESSION_HEADER_TEMPLATE);
                    pkt.set_code(PppoeCode::SESSION);
                    pkt.set_session_id(session_id);
                }
                if relay.write(&bytes, ETHERTYPE_PPPOE_SESSION, peer_mac).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Drive one client from PPPoE dial through Open, per spec §4.5.
pub async fn run_session(
    relay: Arc<dyn PacketRelay>,
    cfg: SessionConfig,
    datapath: Arc<dyn DatapathAdapter>,
    cancel: CancellationToken,
) -> SessionResult {
    let started_at = Instant::now();

    macro_rules! fail {
        ($reason:expr) => {{
            return SessionResult {
                client_index: cfg.client_index,
                outcome: Outcome::Failure { reason: $reason },
                started_at,
                finished_at: Instant::now(),
            };
        }};
    }

    let tags = bbf_discovery_tags(&cfg.cid, &cfg.rid);
    let session = match discovery::dial(&*relay, &cfg.service_name, &tags, cfg.timeout, cfg.retry).await {
        Ok(s) => s,
        Err(e) => fail!(format!("discovery: {e}")),
    };
    info!(client = cfg.client_index, peer_mac = ?session.peer_mac, session_id = session.session_id, "dialed PPPoE session");

    let (egress_tx, egress_rx) = mpsc::channel(1024);
    let mux = Arc::new(PppMux::new(egress_tx));
    let framing = tokio::spawn(run_session_framing(
        relay.clone(),
        mux.clone(),
        egress_rx,
        session.peer_mac,
        session.session_id,
        cancel.clone(),
    ));

    let protocol_reject_router: Arc<RwLock<HashMap<u16, mpsc::Sender<Event>>>> =
        Arc::new(RwLock::new(HashMap::new()));

    let magic = rand::thread_rng().next_u32();
    let lcp_own = Arc::new(RwLock::new(lcp::LcpOwnRule::new(magic)));
    let lcp_peer = Arc::new(RwLock::new(lcp::LcpPeerRule::new(cfg.auth_proto)));
    let (lcp_egress, lcp_ingress) = mux.register(PppProtocol::LCP).await;
    let (lcp_control, mut lcp_layer) = spawn_fsm(
        FsmParams {
            protocol_name: "LCP",
            protocol_number: PppProtocol::LCP,
            max_restart: cfg.retry.max(1),
            restart_timer: DEFAULT_RESTART_TIMER,
            keepalive_interval: Some(DEFAULT_KEEPALIVE_INTERVAL),
        },
        lcp_own.clone(),
        lcp_peer.clone(),
        lcp_egress,
        Some(protocol_reject_router.clone()),
        lcp_ingress,
        cancel.child_token(),
    );

    let _ = lcp_control.send(Event::Open).await;
    let _ = lcp_control.send(Event::Up).await;

    loop {
        match lcp_layer.recv().await {
            Some(LayerEvent::Up) => break,
            Some(LayerEvent::Finished) => {
                cancel.cancel();
                let _ = framing.await;
                fail!("LCP negotiation finished without reaching Opened".to_string());
            }
            Some(_) => continue,
            None => {
                cancel.cancel();
                let _ = framing.await;
                fail!("LCP layer channel closed unexpectedly".to_string());
            }
        }
    }
    info!(client = cfg.client_index, "LCP opened");

    let negotiated_auth = lcp_peer
        .read()
        .await
        .last_seen_options()
        .iter()
        .any(|opt| opt.option_type == u8::from(LcpOptionType::AUTH_PROTOCOL));
    if !negotiated_auth {
        cancel.cancel();
        let _ = framing.await;
        fail!("no authentication protocol negotiated".to_string());
    }

    let auth_protocol = match cfg.auth_proto {
        AuthProto::Pap => PppProtocol::PAP,
        AuthProto::Chap => PppProtocol::CHAP,
    };
    let (auth_egress, mut auth_ingress) = mux.register(auth_protocol).await;
    let auth_result = auth::authenticate(
        cfg.auth_proto,
        &auth_egress,
        &mut auth_ingress,
        &cfg.username,
        &cfg.password,
        cfg.timeout,
        cfg.retry,
    )
    .await;
    mux.unregister(auth_protocol).await;
    if let Err(e) = auth_result {
        cancel.cancel();
        let _ = framing.await;
        fail!(format!("authentication: {e}"));
    }
    info!(client = cfg.client_index, "authentication succeeded");

    let mut ipcp_own = None;
    let mut ipcp_layer = None;
    if cfg.ipv4 {
        let own = Arc::new(RwLock::new(ipcp::IpcpOwnRule::new()));
        let peer = Arc::new(RwLock::new(ipcp::IpcpPeerRule::new()));
        let (egress, ingress) = mux.register(PppProtocol::IPCP).await;
        let (control, layer) = spawn_fsm(
            FsmParams {
                protocol_name: "IPCP",
                protocol_number: PppProtocol::IPCP,
                max_restart: cfg.retry.max(1),
                restart_timer: DEFAULT_RESTART_TIMER,
                keepalive_interval: None,
            },
            own.clone(),
            peer,
            egress,
            None,
            ingress,
            cancel.child_token(),
        );
        protocol_reject_router
            .write()
            .await
            .insert(u16::from(PppProtocol::IPCP), control.clone());
        let _ = control.send(Event::Open).await;
        let _ = control.send(Event::Up).await;
        ipcp_own = Some(own);
        ipcp_layer = Some(layer);
    }

    let mut ipv6cp_own = None;
    let mut ipv6cp_layer = None;
    if cfg.ipv6 {
        let mut secret_key = vec![0u8; 16];
        rand::thread_rng().fill_bytes(&mut secret_key);
        let own = Arc::new(RwLock::new(ipv6cp::Ipv6cpOwnRule::new(session.peer_mac, secret_key.clone())));
        let own_identifier = own.read().await.identifier();
        let peer = Arc::new(RwLock::new(ipv6cp::Ipv6cpPeerRule::new(
            own_identifier,
            session.peer_mac,
            secret_key,
        )));
        let (egress, ingress) = mux.register(PppProtocol::IPV6CP).await;
        let (control, layer) = spawn_fsm(
            FsmParams {
                protocol_name: "IPv6CP",
                protocol_number: PppProtocol::IPV6CP,
                max_restart: cfg.retry.max(1),
                restart_timer: DEFAULT_RESTART_TIMER,
                keepalive_interval: None,
            },
            own.clone(),
            peer,
            egress,
            None,
            ingress,
            cancel.child_token(),
        );
        protocol_reject_router
            .write()
            .await
            .insert(u16::from(PppProtocol::IPV6CP), control.clone());
        let _ = control.send(Event::Open).await;
        let _ = control.send(Event::Up).await;
        ipv6cp_own = Some(own);
        ipv6cp_layer = Some(layer);
    }

    let mut ipv4_up = !cfg.ipv4;
    let mut ipv6_up = !cfg.ipv6;
    while !ipv4_up || !ipv6_up {
        tokio::select! {
            Some(ev) = async { match ipcp_layer.as_mut() { Some(rx) => rx.recv().await, None => std::future::pending().await } }, if !ipv4_up => {
                match ev {
                    LayerEvent::Up => ipv4_up = true,
                    LayerEvent::Finished => {
                        cancel.cancel();
                        let _ = framing.await;
                        fail!("IPCP negotiation finished without reaching Opened".to_string());
                    }
                    _ => {}
                }
            }
            Some(ev) = async { match ipv6cp_layer.as_mut() { Some(rx) => rx.recv().await, None => std::future::pending().await } }, if !ipv6_up => {
                match ev {
                    LayerEvent::Up => ipv6_up = true,
                    LayerEvent::Finished => {
                        cancel.cancel();
                        let _ = framing.await;
                        fail!("IPv6CP negotiation finished without reaching Opened".to_string());
                    }
                    _ => {}
                }
            }
        }
    }
    info!(client = cfg.client_index, "all enabled NCPs opened");

    let mru = lcp_own.read().await.mru();
    let ipv4_addr = match &ipcp_own {
        Some(own) => {
            let addr = own.read().await.address();
            if addr.is_unspecified() {
                None
            } else {
                Some(addr)
            }
        }
        None => None,
    };
    let ipv6_ifid = match &ipv6cp_own {
        Some(own) => Some(own.read().await.identifier()),
        None => None,
    };

    datapath.on_session_up(&DatapathContext {
        ifname: cfg.ifname.clone(),
        mru,
        ipv4: ipv4_addr,
        ipv6_ifid,
    });

    SessionResult {
        client_index: cfg.client_index,
        outcome: Outcome::Success {
            ipv4: ipv4_addr,
            ipv6_ifid,
        },
        started_at,
        finished_at: Instant::now(),
    }
}

/// Close an open session: PADT best-effort, then cancel every task the
/// supervisor spawned (spec §4.5 step 8).
pub async fn close_session(
    relay: &dyn PacketRelay,
    peer_mac: EtherAddr,
    session_id: u16,
    datapath: &dyn DatapathAdapter,
    cancel: &CancellationToken,
) {
    if let Err(e) = discovery::send_padt(relay, peer_mac, session_id).await {
        warn!(error = %e, "failed to send PADT during teardown");
    }
    cancel.cancel();
    datapath.on_session_down();
}
