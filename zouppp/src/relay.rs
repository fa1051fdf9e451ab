//! The packet relay interface (spec §6): the external L2 transport this crate
//! consumes but does not implement. Production callers supply a raw-socket or
//! AF_XDP relay; this module ships only [`LoopbackRelay`], an in-memory test
//! double that lets the BRAS side of a scenario be played by another task in
//! the same process.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use zpkt::ether::EtherAddr;

/// A VLAN stack entry: a tag ID and the TPID it was (or will be) carried under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    pub id: u16,
    pub tpid: u16,
}

/// An Ethernet frame as seen by a relay, including whatever VLAN tags were
/// attached by the peer (or should be attached on send).
#[derive(Debug, Clone)]
pub struct Frame {
    pub ethertype: u16,
    pub vlans: Vec<VlanTag>,
    pub remote_mac: EtherAddr,
    pub payload: Vec<u8>,
}

/// Raised by [`PacketRelay::read`] to distinguish "nothing arrived in time"
/// from a transport that can no longer be used.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("read deadline elapsed")]
    Timeout,
    #[error("relay closed")]
    Closed,
    #[error("relay I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The external packet relay a session's discovery and mux layers send
/// through and receive from. Filters by Ethertype and VLAN stack are applied
/// at construction time; callers only see frames that already passed them.
#[async_trait::async_trait]
pub trait PacketRelay: Send + Sync {
    /// Send `payload` under `ethertype` to `dst_mac`, returning the number of
    /// bytes written.
    async fn write(
        &self,
        payload: &[u8],
        ethertype: u16,
        dst_mac: EtherAddr,
    ) -> Result<usize, RelayError>;

    /// Wait up to `deadline` for the next frame matching this relay's filters.
    async fn read(&self, deadline: Duration) -> Result<Frame, RelayError>;
}

/// An in-memory [`PacketRelay`] backed by two bounded channels, one per
/// direction. Used by unit tests and the end-to-end scenarios to play the
/// BRAS side of an exchange without a real NIC.
#[derive(Debug)]
pub struct LoopbackRelay {
    tx: mpsc::Sender<Frame>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Frame>>,
    local_mac: EtherAddr,
}

impl LoopbackRelay {
    /// Build a connected pair: `(client_side, peer_side)`. Frames written to
    /// one side's `write` are observed by the other side's `read`.
    pub fn pair(client_mac: EtherAddr, peer_mac: EtherAddr) -> (Self, Self) {
        let (to_peer_tx, to_peer_rx) = mpsc::channel(128);
        let (to_client_tx, to_client_rx) = mpsc::channel(128);
        let client = LoopbackRelay {
            tx: to_peer_tx,
            rx: tokio::sync::Mutex::new(to_client_rx),
            local_mac: client_mac,
        };
        let peer = LoopbackRelay {
            tx: to_client_tx,
            rx: tokio::sync::Mutex::new(to_peer_rx),
            local_mac: peer_mac,
        };
        (client, peer)
    }
}

#[async_trait::async_trait]
impl PacketRelay for LoopbackRelay {
    async fn write(
        &self,
        payload: &[u8],
        ethertype: u16,
        dst_mac: EtherAddr,
    ) -> Result<usize, RelayError> {
        let frame = Frame {
            ethertype,
            vlans: Vec::new(),
            remote_mac: self.local_mac,
            payload: payload.to_vec(),
        };
        let _ = dst_mac;
        self.tx
            .send(frame)
            .await
            .map_err(|_| RelayError::Closed)?;
        Ok(payload.len())
    }

    async fn read(&self, deadline: Duration) -> Result<Frame, RelayError> {
        let mut rx = self.rx.lock().await;
        match timeout(deadline, rx.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(RelayError::Closed),
            Err(_) => Err(RelayError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_roundtrips_a_frame() {
        let client_mac = EtherAddr([0, 0, 0, 0, 0, 1]);
        let peer_mac = EtherAddr([0, 0, 0, 0, 0, 2]);
        let (client, peer) = LoopbackRelay::pair(client_mac, peer_mac);

        client
            .write(b"padi", 0x8863, EtherAddr::BROADCAST)
            .await
            .unwrap();
        let frame = peer.read(Duration::from_secs(1)).await.unwrap();
        assert_eq!(frame.payload, b"padi");
        assert_eq!(frame.remote_mac, client_mac);
    }

    #[tokio::test]
    async fn read_times_out_with_nothing_sent() {
        let (client, _peer) =
            LoopbackRelay::pair(EtherAddr([0; 6]), EtherAddr([1; 6]));
        let err = client.read(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, RelayError::Timeout));
    }
}
