//! The RFC 1661 §4 Option-Negotiation automaton, instantiated once each for
//! LCP, IPCP, and IPv6CP (spec §4.3). The automaton itself is protocol-agnostic;
//! [`lcp`], [`ipcp`], and [`ipv6cp`] supply the option tables and the
//! own-option / peer-option rules that give each instance its protocol-specific
//! behavior.
//!
//! States and events are RFC 1661 §4.1 verbatim. The ten core states plus the
//! internal LCP-only Echo-Req-Sent keepalive sub-state (tracked as a flag
//! rather than an eleventh state, since RFC 1661 treats it as "logically
//! still Opened"). The transition table below was written directly from
//! RFC 1661's state/event/action description rather than transcribed from any
//! single reference implementation — no repo in this codebase's lineage
//! implements the full ten-state table (the closest, `akiles-ppproto`,
//! collapses several states for a minimal embedded use case).

pub mod ipcp;
pub mod ipv6cp;
pub mod lcp;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::mux::{EgressHandle, RingReceiver};
use zpkt::ppp::control::{Control, ControlCode, CONTROL_HEADER_TEMPLATE};
use zpkt::ppp::options::ControlOptionIter;
use zpkt::{Buf, Cursor, CursorMut, PktBufMut};

/// RFC 1661 §4.1 states. The internal keepalive sub-state is a boolean on the
/// FSM, not a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initial,
    Starting,
    Closed,
    Stopped,
    Closing,
    Stopping,
    ReqSent,
    AckRcvd,
    AckSent,
    Opened,
}

/// RFC 1661 §4.1 events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Up,
    Down,
    Open,
    Close,
    TimeoutPositive,
    TimeoutNegative,
    RcrPlus,
    RcrMinus,
    Rca,
    Rcn,
    Rtr,
    Rta,
    Ruc,
    RxjPlus,
    RxjMinus,
    Rxr,
}

/// A layer-level notification the FSM publishes to its owning supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerEvent {
    Up,
    Down,
    Started,
    Finished,
}

/// A single protocol-scoped option TLV, type-erased: the FSM engine never
/// interprets option values itself, only the protocol's own/peer rules do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireOption {
    pub option_type: u8,
    pub value: Vec<u8>,
}

/// The verdict an implementation's [`PeerOptionRule`] renders for one
/// Configure-Request: every input option must appear in exactly one of these
/// three lists (spec §8 invariant 2).
#[derive(Debug, Default, Clone)]
pub struct ReqVerdict {
    pub ack: Vec<WireOption>,
    pub nak: Vec<WireOption>,
    pub reject: Vec<WireOption>,
}

/// This instance's own configurable options: what we propose, and how we
/// react to the peer Naking or Rejecting them.
pub trait OwnOptionRule: Send {
    fn get_options(&self) -> Vec<WireOption>;
    /// An option in `options` must not reappear in a subsequent
    /// [`OwnOptionRule::get_options`] call (spec §8 invariant 3).
    fn handle_conf_rej(&mut self, options: &[WireOption]);
    /// For every option in `options`, the next [`OwnOptionRule::get_options`]
    /// must carry the Nak'd value (spec §8 invariant 4).
    fn handle_conf_nak(&mut self, options: &[WireOption]);
}

/// How this instance evaluates the peer's Configure-Request.
pub trait PeerOptionRule: Send {
    fn handle_conf_req(&mut self, options: &[WireOption]) -> ReqVerdict;
    /// The peer's most recently accepted option set (what the supervisor
    /// reads after LCP layer-up to learn the negotiated auth protocol, or
    /// after IPCP/IPv6CP layer-up to learn addressing).
    fn last_seen_options(&self) -> Vec<WireOption>;
}

/// Per-instance tunables (spec §4.3).
#[derive(Debug, Clone)]
pub struct FsmParams {
    pub protocol_name: &'static str,
    pub protocol_number: zpkt::ppp::PppProtocol,
    pub max_restart: u32,
    pub restart_timer: Duration,
    /// LCP only: interval between Echo-Requests once Opened.
    pub keepalive_interval: Option<Duration>,
}

fn serialize_options(options: &[WireOption]) -> Vec<u8> {
    let mut body = Vec::new();
    for opt in options {
        assert!(opt.value.len() + 2 <= 255);
        body.push(opt.option_type);
        body.push((opt.value.len() + 2) as u8);
        body.extend_from_slice(&opt.value);
    }
    body
}

fn parse_options(body: &[u8]) -> Vec<WireOption> {
    ControlOptionIter::from_body_slice(body)
        .map(|opt| WireOption {
            option_type: opt.option_type(),
            value: opt.value_slice().to_vec(),
        })
        .collect()
}

fn build_control_packet(code: ControlCode, identifier: u8, body: &[u8]) -> Vec<u8> {
    let total = zpkt::ppp::control::CONTROL_HEADER_LEN + body.len();
    let mut bytes = vec![0u8; total];
    {
        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(zpkt::ppp::control::CONTROL_HEADER_LEN);
        buf.chunk_mut()[..body.len()].copy_from_slice(body);
        let mut pkt = Control::prepend_header(buf, &CONTROL_HEADER_TEMPLATE);
        pkt.set_code(code);
        pkt.set_identifier(identifier);
    }
    bytes
}

/// Classification of one inbound Control packet into an [`Event`], alongside
/// whatever payload the event needs (e.g. the parsed option list for RCR).
enum ConfigureReply {
    Ack,
    Nak,
    Reject,
}

enum Classified {
    Event(Event),
    ConfigureRequest { identifier: u8, options: Vec<WireOption> },
    ConfigureReply { identifier: u8, options: Vec<WireOption>, kind: ConfigureReply },
    TerminateRequest { identifier: u8 },
    TerminateAck { identifier: u8 },
    CodeReject { rejected_code_is_critical: bool },
    ProtocolReject { rejected_protocol: zpkt::ppp::PppProtocol },
    EchoRequest { magic: u32, data: Vec<u8> },
    EchoReply,
    Unknown,
}

fn classify(body: &[u8]) -> Option<Classified> {
    let pkt = Control::parse(Cursor::new(body)).ok()?;
    Some(match pkt.code() {
        ControlCode::CONFIGURE_REQUEST => Classified::ConfigureRequest {
            identifier: pkt.identifier(),
            options: parse_options(pkt.body_slice()),
        },
        ControlCode::CONFIGURE_ACK => Classified::ConfigureReply {
            identifier: pkt.identifier(),
            options: parse_options(pkt.body_slice()),
            kind: ConfigureReply::Ack,
        },
        ControlCode::CONFIGURE_NAK => Classified::ConfigureReply {
            identifier: pkt.identifier(),
            options: parse_options(pkt.body_slice()),
            kind: ConfigureReply::Nak,
        },
        ControlCode::CONFIGURE_REJECT => Classified::ConfigureReply {
            identifier: pkt.identifier(),
            options: parse_options(pkt.body_slice()),
            kind: ConfigureReply::Reject,
        },
        ControlCode::TERMINATE_REQUEST => Classified::TerminateRequest {
            identifier: pkt.identifier(),
        },
        ControlCode::TERMINATE_ACK => Classified::TerminateAck {
            identifier: pkt.identifier(),
        },
        ControlCode::CODE_REJECT => Classified::CodeReject {
            rejected_code_is_critical: true,
        },
        ControlCode::PROTOCOL_REJECT => Classified::ProtocolReject {
            rejected_protocol: pkt.rejected_protocol(),
        },
        ControlCode::ECHO_REQUEST => Classified::EchoRequest {
            magic: pkt.magic_number(),
            data: pkt.echo_data().to_vec(),
        },
        ControlCode::ECHO_REPLY => Classified::EchoReply,
        ControlCode::DISCARD_REQUEST => Classified::Unknown,
        _ => Classified::Unknown,
    })
}

/// One running instance of the negotiation automaton.
pub struct Fsm<O, P> {
    state: State,
    params: FsmParams,
    own: Arc<RwLock<O>>,
    peer: Arc<RwLock<P>>,
    restart_count: u32,
    identifier: u8,
    last_configure_id: Option<u8>,
    last_configure_options: Vec<WireOption>,
    last_terminate_id: Option<u8>,
    rejected_types: HashSet<u8>,
    keepalive_failures: u32,
    magic_number: u32,
    egress: EgressHandle,
    layer_tx: mpsc::Sender<LayerEvent>,
    /// LCP only: forwards Protocol-Reject as RxjMinus to the named NCP's event
    /// channel, since a Protocol-Reject packet is itself LCP-coded but speaks
    /// about another protocol's viability.
    protocol_reject_router: Option<Arc<RwLock<std::collections::HashMap<u16, mpsc::Sender<Event>>>>>,
}

impl<O: OwnOptionRule, P: PeerOptionRule> Fsm<O, P> {
    pub fn new(
        params: FsmParams,
        own: Arc<RwLock<O>>,
        peer: Arc<RwLock<P>>,
        egress: EgressHandle,
        layer_tx: mpsc::Sender<LayerEvent>,
        protocol_reject_router: Option<Arc<RwLock<std::collections::HashMap<u16, mpsc::Sender<Event>>>>>,
    ) -> Self {
        Self {
            state: State::Initial,
            params,
            own,
            peer,
            restart_count: 0,
            identifier: rand::thread_rng().next_u32() as u8,
            last_configure_id: None,
            last_configure_options: Vec::new(),
            last_terminate_id: None,
            rejected_types: HashSet::new(),
            keepalive_failures: 0,
            magic_number: rand::thread_rng().next_u32(),
            egress,
            layer_tx,
            protocol_reject_router,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn next_identifier(&mut self) -> u8 {
        let id = self.identifier;
        self.identifier = self.identifier.wrapping_add(1);
        id
    }

    async fn send_packet(&self, bytes: Vec<u8>) {
        if let Err(e) = self.egress.send(&bytes).await {
            warn!(protocol = self.params.protocol_name, error = %e, "failed to send control packet");
        }
    }

    async fn notify(&self, ev: LayerEvent) {
        let _ = self.layer_tx.send(ev).await;
    }

    /// Drive the automaton to react to external control events (Open/Close/
    /// Up/Down) and to ingress Control packets on `ingress`, until
    /// `cancel` fires.
    pub async fn run(
        mut self,
        mut control_rx: mpsc::Receiver<Event>,
        mut ingress: RingReceiver<Vec<u8>>,
        cancel: CancellationToken,
    ) {
        let mut restart_timer = interval(self.params.restart_timer);
        restart_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        restart_timer.reset();

        let keepalive_interval = self
            .params
            .keepalive_interval
            .unwrap_or(Duration::from_secs(3600 * 24));
        let mut keepalive_timer = interval(keepalive_interval);
        keepalive_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        keepalive_timer.reset();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(protocol = self.params.protocol_name, "fsm cancelled");
                    return;
                }
                Some(ev) = control_rx.recv() => {
                    self.step(ev).await;
                }
                Some(body) = ingress.recv() => {
                    self.on_ingress(&body).await;
                }
                _ = restart_timer.tick(), if matches!(self.state, State::Closing | State::Stopping | State::ReqSent | State::AckRcvd | State::AckSent) => {
                    if self.restart_count > 0 {
                        self.restart_count -= 1;
                        self.step(Event::TimeoutPositive).await;
                    } else {
                        self.step(Event::TimeoutNegative).await;
                    }
                }
                _ = keepalive_timer.tick(), if self.params.keepalive_interval.is_some() && self.state == State::Opened => {
                    self.on_keepalive_tick().await;
                }
            }
        }
    }

    async fn on_keepalive_tick(&mut self) {
        if self.keepalive_failures >= self.params.max_restart {
            warn!(protocol = self.params.protocol_name, "keepalive exhausted, declaring layer finished");
            self.state = State::Stopped;
            self.notify(LayerEvent::Down).await;
            self.notify(LayerEvent::Finished).await;
            return;
        }
        self.keepalive_failures += 1;
        let id = self.next_identifier();
        let mut body = Vec::with_capacity(4);
        body.extend_from_slice(&self.magic_number.to_be_bytes());
        let bytes = build_control_packet(ControlCode::ECHO_REQUEST, id, &body);
        self.send_packet(bytes).await;
    }

    async fn on_ingress(&mut self, body: &[u8]) {
        let Some(classified) = classify(body) else {
            trace!(protocol = self.params.protocol_name, "dropping malformed control packet");
            return;
        };
        match classified {
            Classified::ConfigureRequest { identifier, options } => {
                let verdict = self.peer.write().await.handle_conf_req(&options);
                if verdict.nak.is_empty() && verdict.reject.is_empty() {
                    self.send_configure_ack(identifier, &verdict.ack).await;
                    self.step(Event::RcrPlus).await;
                } else {
                    let combined: Vec<WireOption> = if !verdict.reject.is_empty() {
                        verdict.reject.clone()
                    } else {
                        verdict.nak.clone()
                    };
                    let code = if !verdict.reject.is_empty() {
                        ControlCode::CONFIGURE_REJECT
                    } else {
                        ControlCode::CONFIGURE_NAK
                    };
                    let body = serialize_options(&combined);
                    let bytes = build_control_packet(code, identifier, &body);
                    self.send_packet(bytes).await;
                    self.step(Event::RcrMinus).await;
                }
            }
            Classified::ConfigureReply { identifier, options, kind } => {
                if Some(identifier) != self.last_configure_id {
                    trace!(protocol = self.params.protocol_name, "ignoring stale configure reply");
                    return;
                }
                match kind {
                    ConfigureReply::Ack => {
                        if options != self.last_configure_options {
                            trace!(protocol = self.params.protocol_name, "ignoring ack with mismatched options");
                            return;
                        }
                        self.step(Event::Rca).await;
                    }
                    ConfigureReply::Nak => {
                        self.own.write().await.handle_conf_nak(&options);
                        self.step(Event::Rcn).await;
                    }
                    ConfigureReply::Reject => {
                        for opt in &options {
                            self.rejected_types.insert(opt.option_type);
                        }
                        self.own.write().await.handle_conf_rej(&options);
                        self.step(Event::Rcn).await;
                    }
                }
            }
            Classified::TerminateRequest { identifier } => {
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, identifier, &[]);
                self.send_packet(bytes).await;
                self.step(Event::Rtr).await;
            }
            Classified::TerminateAck { identifier } => {
                if Some(identifier) == self.last_terminate_id {
                    self.step(Event::Rta).await;
                }
            }
            Classified::CodeReject { rejected_code_is_critical } => {
                if rejected_code_is_critical {
                    self.step(Event::RxjMinus).await;
                } else {
                    self.step(Event::RxjPlus).await;
                }
            }
            Classified::ProtocolReject { rejected_protocol } => {
                if let Some(router) = &self.protocol_reject_router {
                    if let Some(tx) = router.read().await.get(&u16::from(rejected_protocol)) {
                        let _ = tx.send(Event::RxjMinus).await;
                    }
                }
            }
            Classified::EchoRequest { magic, data } => {
                let id = self.next_identifier();
                let mut body = Vec::with_capacity(4 + data.len());
                body.extend_from_slice(&magic.to_be_bytes());
                body.extend_from_slice(&data);
                let bytes = build_control_packet(ControlCode::ECHO_REPLY, id, &body);
                self.send_packet(bytes).await;
                self.step(Event::Rxr).await;
            }
            Classified::EchoReply => {
                self.keepalive_failures = 0;
                self.step(Event::Rxr).await;
            }
            Classified::Event(ev) => self.step(ev).await,
            Classified::Unknown => self.step(Event::Ruc).await,
        }
    }

    async fn send_configure_request(&mut self) {
        let options = self.own.read().await.get_options();
        let id = self.next_identifier();
        let body = serialize_options(&options);
        let bytes = build_control_packet(ControlCode::CONFIGURE_REQUEST, id, &body);
        self.last_configure_id = Some(id);
        self.last_configure_options = options;
        self.send_packet(bytes).await;
    }

    async fn send_configure_ack(&mut self, identifier: u8, options: &[WireOption]) {
        let body = serialize_options(options);
        let bytes = build_control_packet(ControlCode::CONFIGURE_ACK, identifier, &body);
        self.send_packet(bytes).await;
    }

    async fn send_terminate_request(&mut self) {
        let id = self.next_identifier();
        self.last_terminate_id = Some(id);
        let bytes = build_control_packet(ControlCode::TERMINATE_REQUEST, id, &[]);
        self.send_packet(bytes).await;
    }

    /// Apply one event to the automaton (RFC 1661 §4.1). Unknown/meaningless
    /// events for the current state are silently ignored (spec §3 invariant).
    async fn step(&mut self, event: Event) {
        use Event::*;
        use State::*;

        let prev = self.state;
        match (self.state, event) {
            (Initial, Open) => {
                self.notify(LayerEvent::Started).await;
                self.state = Starting;
            }
            (Starting, Up) => {
                self.restart_count = self.params.max_restart;
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (Starting, Close) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Initial;
            }

            (Closed, Open) => {
                self.restart_count = self.params.max_restart;
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (Closed, Down) => self.state = Initial,
            (Closed, RcrPlus) | (Closed, RcrMinus) | (Closed, Rca) | (Closed, Rcn)
            | (Closed, Rtr) | (Closed, Ruc) | (Closed, RxjPlus) => {
                let id = self.next_identifier();
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, id, &[]);
                self.send_packet(bytes).await;
            }

            (Stopped, Down) => self.state = Starting,
            (Stopped, Close) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Closed;
            }
            (Stopped, RcrPlus) => {
                self.restart_count = self.params.max_restart;
                self.send_configure_request().await;
                self.state = AckSent;
            }
            (Stopped, RcrMinus) => {
                self.restart_count = self.params.max_restart;
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (Stopped, Rtr) => {
                let id = self.next_identifier();
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, id, &[]);
                self.send_packet(bytes).await;
            }
            (Stopped, RxjMinus) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Closed;
            }

            (Closing, Rta) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Closed;
            }
            (Closing, TimeoutPositive) => {
                self.send_terminate_request().await;
            }
            (Closing, TimeoutNegative) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Closed;
            }
            (Closing, Rtr) => {
                let id = self.next_identifier();
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, id, &[]);
                self.send_packet(bytes).await;
            }
            (Closing, Down) => self.state = Initial,

            (Stopping, Rta) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (Stopping, TimeoutPositive) => {
                self.send_terminate_request().await;
            }
            (Stopping, TimeoutNegative) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (Stopping, Rtr) => {
                let id = self.next_identifier();
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, id, &[]);
                self.send_packet(bytes).await;
            }
            (Stopping, Down) => self.state = Starting,

            (ReqSent, RcrPlus) => {
                self.state = AckSent;
            }
            (ReqSent, RcrMinus) => {
                // Nak/Reject already sent by on_ingress; stay put and await retry.
            }
            (ReqSent, Rca) => {
                self.restart_count = self.params.max_restart;
                self.state = AckRcvd;
            }
            (ReqSent, Rcn) => {
                self.send_configure_request().await;
            }
            (ReqSent, Rtr) => {
                let id = self.next_identifier();
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, id, &[]);
                self.send_packet(bytes).await;
            }
            (ReqSent, Ruc) => {
                self.send_code_reject().await;
            }
            (ReqSent, RxjMinus) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (ReqSent, TimeoutPositive) => {
                self.send_configure_request().await;
            }
            (ReqSent, TimeoutNegative) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (ReqSent, Down) => self.state = Starting,
            (ReqSent, Close) => {
                self.send_terminate_request().await;
                self.state = Closing;
            }

            (AckRcvd, RcrPlus) => {
                self.notify(LayerEvent::Up).await;
                self.state = Opened;
            }
            (AckRcvd, RcrMinus) => {
                // Nak/Reject already sent; remain in AckRcvd.
            }
            (AckRcvd, Rcn) => {
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (AckRcvd, Rtr) => {
                let id = self.next_identifier();
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, id, &[]);
                self.send_packet(bytes).await;
                self.state = ReqSent;
            }
            (AckRcvd, Ruc) => {
                self.send_code_reject().await;
            }
            (AckRcvd, RxjMinus) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (AckRcvd, TimeoutPositive) => {
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (AckRcvd, TimeoutNegative) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (AckRcvd, Down) => self.state = Starting,
            (AckRcvd, Close) => {
                self.send_terminate_request().await;
                self.state = Closing;
            }

            (AckSent, RcrPlus) => {
                // Re-acked already from on_ingress; stay in AckSent.
            }
            (AckSent, RcrMinus) => {
                self.state = ReqSent;
            }
            (AckSent, Rca) => {
                self.notify(LayerEvent::Up).await;
                self.state = Opened;
            }
            (AckSent, Rcn) => {
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (AckSent, Rtr) => {
                let id = self.next_identifier();
                let bytes = build_control_packet(ControlCode::TERMINATE_ACK, id, &[]);
                self.send_packet(bytes).await;
                self.state = ReqSent;
            }
            (AckSent, Ruc) => {
                self.send_code_reject().await;
            }
            (AckSent, RxjMinus) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (AckSent, TimeoutPositive) => {
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (AckSent, TimeoutNegative) => {
                self.notify(LayerEvent::Finished).await;
                self.state = Stopped;
            }
            (AckSent, Down) => self.state = Starting,
            (AckSent, Close) => {
                self.send_terminate_request().await;
                self.state = Closing;
            }

            (Opened, Down) => {
                self.notify(LayerEvent::Down).await;
                self.state = Starting;
            }
            (Opened, Close) => {
                self.notify(LayerEvent::Down).await;
                self.send_terminate_request().await;
                self.state = Closing;
            }
            (Opened, RcrPlus) => {
                self.notify(LayerEvent::Down).await;
                self.send_configure_request().await;
                self.state = AckSent;
            }
            (Opened, RcrMinus) => {
                self.notify(LayerEvent::Down).await;
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (Opened, Rcn) => {
                self.notify(LayerEvent::Down).await;
                self.send_configure_request().await;
                self.state = ReqSent;
            }
            (Opened, Rtr) => {
                self.notify(LayerEvent::Down).await;
                self.restart_count = 0;
                self.state = Stopping;
            }
            (Opened, Ruc) => {
                self.send_code_reject().await;
            }
            (Opened, RxjMinus) => {
                self.notify(LayerEvent::Down).await;
                self.send_terminate_request().await;
                self.state = Stopping;
            }
            (Opened, Rxr) => {
                // Echo handled in on_ingress; no state change.
            }

            _ => {
                trace!(
                    protocol = self.params.protocol_name,
                    state = ?prev,
                    event = ?event,
                    "ignoring event not meaningful in this state"
                );
            }
        }

        if prev != self.state {
            info!(
                protocol = self.params.protocol_name,
                from = ?prev,
                to = ?self.state,
                "layer state transition"
            );
        }
    }

    async fn send_code_reject(&mut self) {
        let id = self.next_identifier();
        let bytes = build_control_packet(ControlCode::CODE_REJECT, id, &[]);
        self.send_packet(bytes).await;
    }
}
