//! CHAP-MD5 client (RFC 1994 §4): wait for a Challenge, answer with
//! `MD5(identifier ∥ secret ∥ challenge-value)`, wait for Success/Failure.

use std::time::Duration;

use md5::{Digest, Md5};
use tracing::debug;
use zpkt::ppp::chap::{ChapCode, ChapPacket, CHAP_HEADER_LEN};
use zpkt::{Cursor, CursorMut, PktBufMut};

use crate::error::{Error, Result};
use crate::mux::{EgressHandle, RingReceiver};

fn md5_response(identifier: u8, secret: &str, challenge: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update([identifier]);
    hasher.update(secret.as_bytes());
    hasher.update(challenge);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

/// Wait for the peer's Challenge, answer it, and wait for Success/Failure.
/// Unlike PAP, CHAP is peer-initiated: this function never sends first.
pub async fn authenticate(
    egress: &EgressHandle,
    ingress: &mut RingReceiver<Vec<u8>>,
    name: &str,
    secret: &str,
    overall_timeout: Duration,
) -> Result<()> {
    tokio::time::timeout(overall_timeout, run(egress, ingress, name, secret))
        .await
        .map_err(|_| Error::Timeout {
            what: "CHAP Challenge",
        })?
}

async fn run(
    egress: &EgressHandle,
    ingress: &mut RingReceiver<Vec<u8>>,
    name: &str,
    secret: &str,
) -> Result<()> {
    loop {
        let body = ingress.recv().await.ok_or(Error::Timeout {
            what: "CHAP Challenge",
        })?;
        let pkt = match ChapPacket::parse(Cursor::new(&body[..])) {
            Ok(p) => p,
            Err(_) => continue,
        };
        match pkt.code() {
            ChapCode::CHALLENGE => {
                let identifier = pkt.identifier();
                let digest = md5_response(identifier, secret, pkt.value());
                send_response(egress, identifier, &digest, name.as_bytes()).await?;
            }
            ChapCode::SUCCESS => return Ok(()),
            ChapCode::FAILURE => {
                let message = String::from_utf8_lossy(pkt.message()).into_owned();
                return Err(Error::AuthFailed(message));
            }
            _ => {
                debug!("dropping unexpected CHAP packet");
            }
        }
    }
}

async fn send_response(egress: &EgressHandle, identifier: u8, digest: &[u8; 16], name: &[u8]) -> Result<()> {
    let body_len = 1 + digest.len() + name.len();
    let total = CHAP_HEADER_LEN + body_len;
    let mut bytes = vec![0u8; total];
    {
        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(total);
        ChapPacket::build_challenge_or_response(buf, ChapCode::RESPONSE, identifier, digest, name);
    }
    egress
        .send(&bytes)
        .await
        .map_err(|e| Error::Transport(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}
