//! PAP client (RFC 1334 §2): send Authenticate-Request, wait for Ack/Nak.

use std::time::Duration;

use tracing::{debug, warn};
use zpkt::ppp::pap::{PapCode, PapPacket, PAP_HEADER_LEN};
use zpkt::{Cursor, CursorMut, PktBufMut};

use crate::error::{Error, Result};
use crate::mux::{EgressHandle, RingReceiver};

/// Run the PAP exchange to completion: send Authenticate-Request, retrying up
/// to `retries` additional times on timeout, and classify the first Ack/Nak
/// that arrives.
pub async fn authenticate(
    egress: &EgressHandle,
    ingress: &mut RingReceiver<Vec<u8>>,
    username: &str,
    password: &str,
    per_attempt_timeout: Duration,
    retries: u32,
) -> Result<()> {
    let mut identifier: u8 = 1;
    for attempt in 0..=retries {
        let body_len = 2 + username.len() + password.len();
        let total = PAP_HEADER_LEN + body_len;
        let mut bytes = vec![0u8; total];
        {
            let mut buf = CursorMut::new(&mut bytes[..]);
            buf.advance(total);
            PapPacket::build_auth_request(buf, identifier, username.as_bytes(), password.as_bytes());
        }
        egress
            .send(&bytes)
            .await
            .map_err(|e| Error::Transport(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

        match tokio::time::timeout(per_attempt_timeout, wait_for_reply(ingress, identifier)).await {
            Ok(Some(true)) => return Ok(()),
            Ok(Some(false)) => return Err(Error::AuthFailed("PAP Authenticate-Nak".into())),
            Ok(None) => {
                warn!("dropping malformed PAP reply");
            }
            Err(_) => {
                debug!(attempt, "PAP attempt timed out, retrying");
            }
        }
        identifier = identifier.wrapping_add(1);
    }
    Err(Error::Timeout {
        what: "PAP Authenticate-Ack",
    })
}

async fn wait_for_reply(ingress: &mut RingReceiver<Vec<u8>>, identifier: u8) -> Option<bool> {
    loop {
        let body = ingress.recv().await?;
        let pkt = match PapPacket::parse(Cursor::new(&body[..])) {
            Ok(p) => p,
            Err(_) => return None,
        };
        if pkt.identifier() != identifier {
            continue;
        }
        return Some(pkt.code() == PapCode::AUTH_ACK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::PppMux;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use zpkt::ppp::{PppFrame, PppProtocol, PPP_FRAME_HEADER_LEN, PPP_FRAME_HEADER_TEMPLATE};

    fn frame_pap(code: PapCode, identifier: u8) -> Vec<u8> {
        let total = PAP_HEADER_LEN + 1;
        let mut bytes = vec![0u8; total];
        {
            let buf = CursorMut::new(&mut bytes[..]);
            PapPacket::build_reply(buf, code, identifier, b"");
        }
        let frame_total = PPP_FRAME_HEADER_LEN + bytes.len();
        let mut framed = vec![0u8; frame_total];
        {
            let mut buf = CursorMut::new(&mut framed[..]);
            buf.advance(PPP_FRAME_HEADER_LEN);
            buf.chunk_mut()[..bytes.len()].copy_from_slice(&bytes);
            let mut frame = PppFrame::prepend_header(buf, &PPP_FRAME_HEADER_TEMPLATE);
            frame.set_protocol(PppProtocol::PAP);
        }
        framed
    }

    #[tokio::test]
    async fn succeeds_on_ack() {
        let (egress_tx, mut egress_rx) = mpsc::channel(8);
        let mux = Arc::new(PppMux::new(egress_tx));
        let (handle, mut rx) = mux.register(PppProtocol::PAP).await;

        let mux2 = mux.clone();
        let server = tokio::spawn(async move {
            let framed = egress_rx.recv().await.unwrap();
            let frame = PppFrame::parse(Cursor::new(&framed[..])).unwrap();
            let req = PapPacket::parse(frame.payload()).unwrap();
            let identifier = req.identifier();
            assert_eq!(req.peer_id(), b"alice");
            assert_eq!(req.passwd(), b"secret");
            mux2.dispatch_ingress(&frame_pap(PapCode::AUTH_ACK, identifier)).await;
        });

        let result = authenticate(&handle, &mut rx, "alice", "secret", Duration::from_millis(500), 0).await;
        assert!(result.is_ok());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fails_on_nak() {
        let (egress_tx, mut egress_rx) = mpsc::channel(8);
        let mux = Arc::new(PppMux::new(egress_tx));
        let (handle, mut rx) = mux.register(PppProtocol::PAP).await;

        let mux2 = mux.clone();
        tokio::spawn(async move {
            let framed = egress_rx.recv().await.unwrap();
            let frame = PppFrame::parse(Cursor::new(&framed[..])).unwrap();
            let req = PapPacket::parse(frame.payload()).unwrap();
            mux2.dispatch_ingress(&frame_pap(PapCode::AUTH_NAK, req.identifier())).await;
        });

        let err = authenticate(&handle, &mut rx, "alice", "wrong", Duration::from_millis(500), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthFailed(_)));
    }
}
