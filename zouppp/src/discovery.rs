//! The PPPoE discovery dial (spec §4.1): PADI/PADO/PADR/PADS, with PADT for
//! teardown. Built directly atop [`crate::relay::PacketRelay`]; everything
//! above the discovery stage only ever sees session frames.

use std::time::Duration;

use tracing::{debug, info, warn};
use zpkt::ether::EtherAddr;
use zpkt::pppoe::{
    PppoeCode, PppoeDiscovery, PppoeTag, PppoeTagIter, PppoeTagType, PPPOE_DISCOVERY_HEADER_TEMPLATE,
    PPPOE_TAG_HEADER_TEMPLATE,
};
use zpkt::{Buf, Cursor, CursorMut, PktBufMut};

use crate::error::{Error, Result};
use crate::relay::{PacketRelay, RelayError};

const ETHERTYPE_PPPOE_DISCOVERY: u16 = 0x8863;

/// A caller-supplied discovery tag, e.g. a BBF Circuit-ID/Remote-ID subtag
/// bundle already encoded by [`crate::session`] as a raw Vendor-Specific tag.
#[derive(Debug, Clone)]
pub struct DiscoveryTag {
    pub tag_type: PppoeTagType,
    pub value: Vec<u8>,
}

/// The outcome of a successful dial: who to talk to and under what session.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveredSession {
    pub peer_mac: EtherAddr,
    pub session_id: u16,
}

fn build_discovery(code: PppoeCode, session_id: u16, tags: &[DiscoveryTag]) -> Vec<u8> {
    let mut body = Vec::new();
    for tag in tags {
        let total = 4 + tag.value.len();
        let mut bytes = vec![0u8; total];
        {
            let mut buf = CursorMut::new(&mut bytes[..]);
            buf.advance(4);
            buf.chunk_mut()[..tag.value.len()].copy_from_slice(&tag.value);
            let mut t = PppoeTag::prepend_header(buf, &PPPOE_TAG_HEADER_TEMPLATE);
            t.set_tag_type(tag.tag_type);
        }
        body.extend_from_slice(&bytes);
    }

    let total = 6 + body.len();
    let mut bytes = vec![0u8; total];
    {
        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(6);
        buf.chunk_mut()[..body.len()].copy_from_slice(&body);
        let mut pkt = PppoeDiscovery::prepend_header(buf, &PPPOE_DISCOVERY_HEADER_TEMPLATE);
        pkt.set_code(code);
        pkt.set_session_id(session_id);
    }
    bytes
}

fn find_tag(tags_slice: &[u8], wanted: PppoeTagType) -> Option<Vec<u8>> {
    PppoeTagIter::from_tag_slice(tags_slice)
        .find(|t| t.tag_type() == wanted)
        .map(|t| t.value_slice().to_vec())
}

struct DiscoveryReply {
    peer_mac: EtherAddr,
    session_id: u16,
    body: Vec<u8>,
}

async fn wait_for_discovery(
    relay: &dyn PacketRelay,
    deadline: Duration,
    want_codes: &[PppoeCode],
    from_peer: Option<EtherAddr>,
) -> Result<DiscoveryReply> {
    let deadline_at = tokio::time::Instant::now() + deadline;
    loop {
        let remaining = deadline_at.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout {
                what: "PPPoE discovery reply",
            });
        }
        let frame = match relay.read(remaining).await {
            Ok(f) => f,
            Err(RelayError::Timeout) => {
                return Err(Error::Timeout {
                    what: "PPPoE discovery reply",
                })
            }
            Err(_) => {
                return Err(Error::Transport(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "relay closed",
                )))
            }
        };
        if frame.ethertype != ETHERTYPE_PPPOE_DISCOVERY {
            continue;
        }
        if let Some(want_mac) = from_peer {
            if frame.remote_mac != want_mac {
                continue;
            }
        }
        let pkt = match PppoeDiscovery::parse(Cursor::new(&frame.payload[..])) {
            Ok(p) => p,
            Err(_) => {
                warn!("dropping malformed PPPoE discovery frame");
                continue;
            }
        };
        if !want_codes.contains(&pkt.code()) {
            continue;
        }
        let session_id = pkt.session_id();
        let body = pkt.payload().chunk().to_vec();
        return Ok(DiscoveryReply {
            peer_mac: frame.remote_mac,
            session_id,
            body,
        });
    }
}

/// Run one PADI→PADO→PADR→PADS exchange, retrying the whole sequence up to
/// `retries` additional times on timeout.
pub async fn dial(
    relay: &dyn PacketRelay,
    service_name: &str,
    extra_tags: &[DiscoveryTag],
    per_attempt_timeout: Duration,
    retries: u32,
) -> Result<DiscoveredSession> {
    let mut last_err = Error::Timeout { what: "PADI" };
    for attempt in 0..=retries {
        match dial_once(relay, service_name, extra_tags, per_attempt_timeout).await {
            Ok(session) => return Ok(session),
            Err(e) => {
                debug!(attempt, error = %e, "discovery attempt failed, retrying");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

async fn dial_once(
    relay: &dyn PacketRelay,
    service_name: &str,
    extra_tags: &[DiscoveryTag],
    timeout: Duration,
) -> Result<DiscoveredSession> {
    let mut tags = vec![DiscoveryTag {
        tag_type: PppoeTagType::SVC_NAME,
        value: service_name.as_bytes().to_vec(),
    }];
    tags.extend_from_slice(extra_tags);

    let padi = build_discovery(PppoeCode::PADI, 0, &tags);
    relay
        .write(&padi, ETHERTYPE_PPPOE_DISCOVERY, EtherAddr::BROADCAST)
        .await?;

    // The first PADO to arrive wins; any later ones (a PADO storm) are never
    // looked at because we've already moved on to PADR/PADS with this peer.
    let pado = wait_for_discovery(relay, timeout, &[PppoeCode::PADO], None).await?;
    info!(peer_mac = ?pado.peer_mac, "received PADO");

    let mut padr_tags = tags.clone();
    if let Some(cookie) = find_tag(&pado.body, PppoeTagType::AC_COOKIE) {
        padr_tags.push(DiscoveryTag {
            tag_type: PppoeTagType::AC_COOKIE,
            value: cookie,
        });
    }

    let padr = build_discovery(PppoeCode::PADR, 0, &padr_tags);
    relay.write(&padr, ETHERTYPE_PPPOE_DISCOVERY, pado.peer_mac).await?;

    // Only the chosen AC's PADS counts; a PADS from any other AC (e.g. one of
    // the PADO-storm stragglers) is never even looked at here.
    let pads = wait_for_discovery(relay, timeout, &[PppoeCode::PADS], Some(pado.peer_mac)).await?;
    if pads.session_id == 0 {
        return Err(Error::AcRejected);
    }

    Ok(DiscoveredSession {
        peer_mac: pado.peer_mac,
        session_id: pads.session_id,
    })
}

/// Send a PADT to tear down an open session.
pub async fn send_padt(relay: &dyn PacketRelay, peer_mac: EtherAddr, session_id: u16) -> Result<()> {
    let padt = build_discovery(PppoeCode::PADT, session_id, &[]);
    relay.write(&padt, ETHERTYPE_PPPOE_DISCOVERY, peer_mac).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::LoopbackRelay;

    #[tokio::test]
    async fn dial_succeeds_against_a_cooperative_peer() {
        let client_mac = EtherAddr([0, 0, 0, 0, 0, 1]);
        let peer_mac = EtherAddr([0, 0, 0, 0, 0, 2]);
        let (client, peer) = LoopbackRelay::pair(client_mac, peer_mac);

        let bras = tokio::spawn(async move {
            let padi = peer.read(Duration::from_secs(1)).await.unwrap();
            assert_eq!(padi.ethertype, ETHERTYPE_PPPOE_DISCOVERY);
            let pado = build_discovery(PppoeCode::PADO, 0, &[]);
            peer.write(&pado, ETHERTYPE_PPPOE_DISCOVERY, client_mac)
                .await
                .unwrap();

            let _padr = peer.read(Duration::from_secs(1)).await.unwrap();
            let pads = build_discovery(PppoeCode::PADS, 42, &[]);
            peer.write(&pads, ETHERTYPE_PPPOE_DISCOVERY, client_mac)
                .await
                .unwrap();
        });

        let session = dial(&client, "", &[], Duration::from_secs(1), 0)
            .await
            .unwrap();
        assert_eq!(session.session_id, 42);
        assert_eq!(session.peer_mac, peer_mac);
        bras.await.unwrap();
    }

    #[tokio::test]
    async fn dial_fails_when_ac_rejects_with_zero_session_id() {
        let client_mac = EtherAddr([0, 0, 0, 0, 0, 1]);
        let peer_mac = EtherAddr([0, 0, 0, 0, 0, 2]);
        let (client, peer) = LoopbackRelay::pair(client_mac, peer_mac);

        tokio::spawn(async move {
            let _padi = peer.read(Duration::from_secs(1)).await.unwrap();
            let pado = build_discovery(PppoeCode::PADO, 0, &[]);
            peer.write(&pado, ETHERTYPE_PPPOE_DISCOVERY, client_mac)
                .await
                .unwrap();
            let _padr = peer.read(Duration::from_secs(1)).await.unwrap();
            let pads = build_discovery(PppoeCode::PADS, 0, &[]);
            peer.write(&pads, ETHERTYPE_PPPOE_DISCOVERY, client_mac)
                .await
                .unwrap();
        });

        let err = dial(&client, "", &[], Duration::from_secs(1), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AcRejected));
    }

    /// A relay stub that lets a test hand out frames tagged with an arbitrary
    /// `remote_mac`, to play more than one AC against a single client.
    struct MultiAcRelay {
        inbound: tokio::sync::Mutex<mpsc::Receiver<crate::relay::Frame>>,
        outbound: mpsc::Sender<(Vec<u8>, EtherAddr)>,
    }

    use tokio::sync::mpsc;

    #[async_trait::async_trait]
    impl PacketRelay for MultiAcRelay {
        async fn write(
            &self,
            payload: &[u8],
            _ethertype: u16,
            dst_mac: EtherAddr,
        ) -> std::result::Result<usize, RelayError> {
            self.outbound
                .send((payload.to_vec(), dst_mac))
                .await
                .map_err(|_| RelayError::Closed)?;
            Ok(payload.len())
        }

        async fn read(&self, deadline: Duration) -> std::result::Result<crate::relay::Frame, RelayError> {
            let mut rx = self.inbound.lock().await;
            match tokio::time::timeout(deadline, rx.recv()).await {
                Ok(Some(frame)) => Ok(frame),
                Ok(None) => Err(RelayError::Closed),
                Err(_) => Err(RelayError::Timeout),
            }
        }
    }

    #[tokio::test]
    async fn dial_ignores_a_pado_storm_and_sticks_to_the_first_ac() {
        let ac1 = EtherAddr([0, 0, 0, 0, 0, 0x11]);
        let ac2 = EtherAddr([0, 0, 0, 0, 0, 0x22]);
        let (to_client_tx, to_client_rx) = mpsc::channel(16);
        let (from_client_tx, mut from_client_rx) = mpsc::channel(16);
        let relay = MultiAcRelay {
            inbound: tokio::sync::Mutex::new(to_client_rx),
            outbound: from_client_tx,
        };

        let bras = tokio::spawn(async move {
            let (_padi, _dst) = from_client_rx.recv().await.unwrap();

            // Two PADOs from different ACs; AC1's should win because it is seen first.
            let pado1 = build_discovery(PppoeCode::PADO, 0, &[]);
            to_client_tx
                .send(crate::relay::Frame { ethertype: ETHERTYPE_PPPOE_DISCOVERY, vlans: Vec::new(), remote_mac: ac1, payload: pado1 })
                .await
                .unwrap();
            let pado2 = build_discovery(PppoeCode::PADO, 0, &[]);
            to_client_tx
                .send(crate::relay::Frame { ethertype: ETHERTYPE_PPPOE_DISCOVERY, vlans: Vec::new(), remote_mac: ac2, payload: pado2 })
                .await
                .unwrap();

            let (_padr, padr_dst) = from_client_rx.recv().await.unwrap();
            assert_eq!(padr_dst, ac1, "PADR must only go to the first AC seen");

            // AC2's unsolicited PADS must be ignored; only AC1's session_id sticks.
            let pads_from_ac2 = build_discovery(PppoeCode::PADS, 0, &[]);
            to_client_tx
                .send(crate::relay::Frame { ethertype: ETHERTYPE_PPPOE_DISCOVERY, vlans: Vec::new(), remote_mac: ac2, payload: pads_from_ac2 })
                .await
                .unwrap();
            let pads_from_ac1 = build_discovery(PppoeCode::PADS, 7, &[]);
            to_client_tx
                .send(crate::relay::Frame { ethertype: ETHERTYPE_PPPOE_DISCOVERY, vlans: Vec::new(), remote_mac: ac1, payload: pads_from_ac1 })
                .await
                .unwrap();
        });

        let session = dial(&relay, "", &[], Duration::from_secs(1), 0).await.unwrap();
        assert_eq!(session.peer_mac, ac1);
        assert_eq!(session.session_id, 7);
        bras.await.unwrap();
    }
}
