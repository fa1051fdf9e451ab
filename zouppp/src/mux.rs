//! The PPP session mux (spec §4.2): frames/unframes PPP packets on an opened
//! PPPoE session and demultiplexes by Protocol number to per-protocol
//! channels. The registration table is the only state shared across
//! protocols in this crate (spec §5), guarded by an `RwLock` that favors the
//! frequent ingress-demux read path over the rare register/unregister write
//! path.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Notify, RwLock};
use tracing::{trace, warn};
use zpkt::ppp::control::{Control, ControlCode, CONTROL_HEADER_LEN, CONTROL_HEADER_TEMPLATE};
use zpkt::ppp::{PppFrame, PppProtocol, PPP_FRAME_HEADER_LEN, PPP_FRAME_HEADER_TEMPLATE};
use zpkt::{Buf, Cursor, CursorMut, PktBufMut};

/// Protocol numbers the peer is entitled to send before we've registered a
/// handler for them; ingress for these is silently dropped rather than
/// Protocol-Rejected (spec §4.2).
const INGRESS_WHITELIST: [PppProtocol; 7] = [
    PppProtocol::IPV4,
    PppProtocol::IPV6,
    PppProtocol::LCP,
    PppProtocol::PAP,
    PppProtocol::CHAP,
    PppProtocol::IPCP,
    PppProtocol::IPV6CP,
];

/// Default bounded depth for a registered protocol's recv channel (spec §5).
pub const DEFAULT_CHANNEL_DEPTH: usize = 128;

struct RingShared<T> {
    queue: Mutex<VecDeque<T>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
}

/// Sending half of a bounded channel that drops the oldest in-flight item on
/// overflow instead of blocking the producer (spec §4.2, §5: "the transport
/// must never stall one protocol in order to service another").
#[derive(Clone)]
pub struct RingSender<T> {
    shared: Arc<RingShared<T>>,
}

/// Receiving half of a [`RingSender`] channel.
pub struct RingReceiver<T> {
    shared: Arc<RingShared<T>>,
}

impl<T> RingSender<T> {
    /// Push an item, dropping the oldest queued item if the channel is full.
    pub fn push(&self, item: T) {
        let mut q = self.shared.queue.lock().expect("ring mutex poisoned");
        if q.len() >= self.shared.capacity {
            q.pop_front();
        }
        q.push_back(item);
        drop(q);
        self.shared.notify.notify_one();
    }
}

impl<T> RingReceiver<T> {
    /// Await the next item, or `None` once every [`RingSender`] is dropped.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            {
                let mut q = self.shared.queue.lock().expect("ring mutex poisoned");
                if let Some(item) = q.pop_front() {
                    return Some(item);
                }
                if self.shared.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }
}

impl<T> Drop for RingReceiver<T> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

fn ring_channel<T>(capacity: usize) -> (RingSender<T>, RingReceiver<T>) {
    let shared = Arc::new(RingShared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        capacity,
        closed: AtomicBool::new(false),
    });
    (
        RingSender {
            shared: shared.clone(),
        },
        RingReceiver { shared },
    )
}

/// A registrant's egress handle: prepends the registered Protocol number and
/// forwards onto the mux's underlying egress channel (to PPPoE session
/// framing, and from there the relay).
#[derive(Clone)]
pub struct EgressHandle {
    protocol: PppProtocol,
    egress_tx: mpsc::Sender<Vec<u8>>,
}

impl EgressHandle {
    /// Send `payload`, the protocol's own body, out as a PPP frame.
    pub async fn send(&self, payload: &[u8]) -> Result<(), SendError> {
        let total = PPP_FRAME_HEADER_LEN + payload.len();
        let mut bytes = vec![0u8; total];
        {
            let mut buf = CursorMut::new(&mut bytes[..]);
            buf.advance(PPP_FRAME_HEADER_LEN);
            buf.chunk_mut()[..payload.len()].copy_from_slice(payload);
            let mut frame = PppFrame::prepend_header(buf, &PPP_FRAME_HEADER_TEMPLATE);
            frame.set_protocol(self.protocol);
        }
        self.egress_tx.send(bytes).await.map_err(|_| SendError)
    }
}

#[derive(Debug)]
pub struct SendError;

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mux egress channel closed")
    }
}
impl std::error::Error for SendError {}

/// The per-protocol registration table plus ingress/egress plumbing.
pub struct PppMux {
    table: RwLock<HashMap<u16, RingSender<Vec<u8>>>>,
    egress_tx: mpsc::Sender<Vec<u8>>,
}

impl PppMux {
    /// Build a mux that writes outbound PPP frames onto `egress_tx` (the
    /// PPPoE session framing layer owns the receiving half).
    pub fn new(egress_tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            egress_tx,
        }
    }

    /// Register a protocol, returning an egress handle and a bounded,
    /// drop-oldest-on-overflow ingress receiver.
    pub async fn register(&self, protocol: PppProtocol) -> (EgressHandle, RingReceiver<Vec<u8>>) {
        let (tx, rx) = ring_channel(DEFAULT_CHANNEL_DEPTH);
        self.table.write().await.insert(u16::from(protocol), tx);
        (
            EgressHandle {
                protocol,
                egress_tx: self.egress_tx.clone(),
            },
            rx,
        )
    }

    /// Remove a protocol's registration; further ingress for it is handled as
    /// "unregistered" (whitelisted-drop or Protocol-Reject).
    pub async fn unregister(&self, protocol: PppProtocol) {
        self.table.write().await.remove(&u16::from(protocol));
    }

    /// Route one inbound PPP frame. Parse failures are dropped (malformed PPP
    /// framing, logged at warn). Unknown protocols with no registrant
    /// generate an LCP Protocol-Reject unless whitelisted.
    pub async fn dispatch_ingress(&self, frame_bytes: &[u8]) {
        let frame = match PppFrame::parse(Cursor::new(frame_bytes)) {
            Ok(f) => f,
            Err(_) => {
                warn!("dropping malformed PPP frame (too short for protocol field)");
                return;
            }
        };
        let protocol = frame.protocol();
        let payload = frame.payload();

        let table = self.table.read().await;
        if let Some(tx) = table.get(&u16::from(protocol)) {
            tx.push(payload.chunk().to_vec());
            return;
        }
        drop(table);

        if INGRESS_WHITELIST.contains(&protocol) {
            trace!(?protocol, "dropping frame for whitelisted-but-unregistered protocol");
            return;
        }

        self.send_protocol_reject(protocol, frame_bytes).await;
    }

    async fn send_protocol_reject(&self, rejected: PppProtocol, rejected_information: &[u8]) {
        let mut body = Vec::with_capacity(2 + rejected_information.len());
        body.extend_from_slice(&u16::from(rejected).to_be_bytes());
        body.extend_from_slice(rejected_information);

        let control_total = CONTROL_HEADER_LEN + body.len();
        let mut control_bytes = vec![0u8; control_total];
        {
            let mut buf = CursorMut::new(&mut control_bytes[..]);
            buf.advance(CONTROL_HEADER_LEN);
            buf.chunk_mut()[..body.len()].copy_from_slice(&body);
            let mut pkt = Control::prepend_header(buf, &CONTROL_HEADER_TEMPLATE);
            pkt.set_code(ControlCode::PROTOCOL_REJECT);
            pkt.set_identifier(0);
        }

        let frame_total = PPP_FRAME_HEADER_LEN + control_bytes.len();
        let mut framed = vec![0u8; frame_total];
        {
            let mut buf = CursorMut::new(&mut framed[..]);
            buf.advance(PPP_FRAME_HEADER_LEN);
            buf.chunk_mut()[..control_bytes.len()].copy_from_slice(&control_bytes);
            let mut frame = PppFrame::prepend_header(buf, &PPP_FRAME_HEADER_TEMPLATE);
            frame.set_protocol(PppProtocol::LCP);
        }

        if self.egress_tx.send(framed).await.is_err() {
            warn!("failed to send Protocol-Reject: egress channel closed");
        }
    }
}
