//! A Linux `AF_PACKET` [`PacketRelay`], for running this crate against a real
//! NIC rather than [`crate::relay::LoopbackRelay`]. Binds one raw socket per
//! client to the target interface; Ethertype and VLAN-stack filtering happen
//! here so everything above only ever sees matched PPPoE payloads.

use std::ffi::CString;
use std::io;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use zpkt::ether::{EtherAddr, EtherType, Ethernet, ETHERNET_HEADER_LEN, ETHERNET_HEADER_TEMPLATE};
use zpkt::vlan::{VlanTag, VLAN_TAG_LEN, VLAN_TAG_TEMPLATE};
use zpkt::{Buf, Cursor, CursorMut, PktBufMut};

use crate::relay::{Frame, PacketRelay, RelayError, VlanTag as RelayVlanTag};

/// A bound `AF_PACKET` socket carrying one client's Ethernet/VLAN identity.
pub struct RawSocketRelay {
    socket: Arc<Socket>,
    local_mac: EtherAddr,
    vlans: Vec<RelayVlanTag>,
}

impl RawSocketRelay {
    /// Bind to `ifname`, filtering reads to frames destined for `local_mac`
    /// under exactly `vlans` (outermost first).
    pub fn bind(ifname: &str, local_mac: EtherAddr, vlans: Vec<RelayVlanTag>) -> io::Result<Self> {
        let ifindex = interface_index(ifname)?;
        let socket = Socket::new(
            Domain::PACKET,
            Type::RAW,
            Some(Protocol::from(libc::ETH_P_ALL.to_be())),
        )?;
        socket.set_nonblocking(true)?;
        bind_to_interface(&socket, ifindex)?;
        Ok(RawSocketRelay {
            socket: Arc::new(socket),
            local_mac,
            vlans,
        })
    }
}

#[async_trait::async_trait]
impl PacketRelay for RawSocketRelay {
    async fn write(&self, payload: &[u8], ethertype: u16, dst_mac: EtherAddr) -> Result<usize, RelayError> {
        let bytes = encode_frame(self.local_mac, dst_mac, ethertype, &self.vlans, payload);
        let socket = self.socket.clone();
        tokio::task::spawn_blocking(move || socket.send(&bytes))
            .await
            .map_err(|e| RelayError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?
            .map_err(RelayError::Io)
    }

    async fn read(&self, deadline: Duration) -> Result<Frame, RelayError> {
        let deadline_instant = tokio::time::Instant::now() + deadline;
        loop {
            let remaining = deadline_instant.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(RelayError::Timeout);
            }
            let socket = self.socket.clone();
            let raw = tokio::task::spawn_blocking(move || recv_one(&socket))
                .await
                .map_err(|e| RelayError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))?
                .map_err(RelayError::Io)?;

            let Some(raw) = raw else {
                tokio::time::sleep(Duration::from_millis(5).min(remaining)).await;
                continue;
            };
            if let Some(frame) = decode_frame(&raw, self.local_mac, &self.vlans) {
                return Ok(frame);
            }
        }
    }
}

fn recv_one(socket: &Socket) -> io::Result<Option<Vec<u8>>> {
    let mut buf = [std::mem::MaybeUninit::uninit(); 2048];
    match socket.recv(&mut buf) {
        Ok(n) => {
            // Safety: `recv` reports `n` as the number of bytes it initialized.
            let init = unsafe { std::slice::from_raw_parts(buf.as_ptr().cast::<u8>(), n) };
            Ok(Some(init.to_vec()))
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e),
    }
}

/// Build an Ethernet frame with `vlans` stacked outermost-first around
/// `payload`, tagging each layer's ethertype field with whatever comes next.
fn encode_frame(
    src_mac: EtherAddr,
    dst_mac: EtherAddr,
    inner_ethertype: u16,
    vlans: &[RelayVlanTag],
    payload: &[u8],
) -> Vec<u8> {
    let header_len = ETHERNET_HEADER_LEN + vlans.len() * VLAN_TAG_LEN;
    let total = header_len + payload.len();
    let mut bytes = vec![0u8; total];

    let mut buf = CursorMut::new(&mut bytes[..]);
    buf.advance(header_len);
    buf.chunk_mut()[..payload.len()].copy_from_slice(payload);

    for (i, vlan) in vlans.iter().enumerate().rev() {
        let next_ethertype = match vlans.get(i + 1) {
            Some(inner) => EtherType::from(inner.tpid),
            None => EtherType::from(inner_ethertype),
        };
        let mut tag = VlanTag::prepend_header(buf, &VLAN_TAG_TEMPLATE);
        tag.set_priority(0);
        tag.set_dei_flag(0);
        tag.set_vlan_id(vlan.id);
        tag.set_ethertype(next_ethertype);
        buf = tag.release();
    }

    let outer_ethertype = match vlans.first() {
        Some(vlan) => EtherType::from(vlan.tpid),
        None => EtherType::from(inner_ethertype),
    };
    let mut eth = Ethernet::prepend_header(buf, &ETHERNET_HEADER_TEMPLATE);
    eth.set_dst_addr(dst_mac);
    eth.set_src_addr(src_mac);
    eth.set_ethertype(outer_ethertype);

    bytes
}

fn decode_frame(raw: &[u8], local_mac: EtherAddr, expect_vlans: &[RelayVlanTag]) -> Option<Frame> {
    let eth = Ethernet::parse(Cursor::new(raw)).ok()?;
    if eth.dst_addr() != local_mac && !eth.dst_addr().is_broadcast() && !eth.dst_addr().is_multicast() {
        return None;
    }
    let remote_mac = eth.src_addr();
    let mut ethertype = eth.ethertype();
    let mut cursor = eth.payload();
    let mut vlans = Vec::new();

    while matches!(ethertype, EtherType::VLAN | EtherType::QINQ) {
        let tpid = u16::from(ethertype);
        let tag = VlanTag::parse(cursor).ok()?;
        vlans.push(RelayVlanTag {
            id: tag.vlan_id(),
            tpid,
        });
        ethertype = tag.ethertype();
        cursor = tag.payload();
    }

    if vlans.len() != expect_vlans.len() || !vlans.iter().zip(expect_vlans).all(|(a, b)| a.id == b.id) {
        return None;
    }

    Some(Frame {
        ethertype: u16::from(ethertype),
        vlans,
        remote_mac,
        payload: cursor.chunk().to_vec(),
    })
}

fn interface_index(ifname: &str) -> io::Result<u32> {
    let c_name = CString::new(ifname)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name contains a NUL byte"))?;
    let idx = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if idx == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(idx)
}

fn bind_to_interface(socket: &Socket, ifindex: u32) -> io::Result<()> {
    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as u16;
    addr.sll_protocol = libc::ETH_P_ALL.to_be() as u16;
    addr.sll_ifindex = ifindex as i32;

    let ret = unsafe {
        libc::bind(
            socket.as_raw_fd(),
            std::ptr::addr_of!(addr).cast(),
            std::mem::size_of::<libc::sockaddr_ll>() as u32,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
