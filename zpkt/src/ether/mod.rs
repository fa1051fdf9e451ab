//! Ethernet II framing.
//!
//! This client only ever needs the outermost Ethernet header to decide whether
//! a frame is PPPoE discovery (`EtherType::PPPOE_DISCOVERY`) or PPPoE session
//! (`EtherType::PPPOE_SESSION`) traffic, optionally behind one or two
//! [`crate::vlan`] tags.

use core::fmt;

enum_sim! {
    /// An enum-like type for representing Ethertype in an Ethernet frame.
    pub struct EtherType (u16) {
        /// Ethernet frame payload is ARP.
        ARP =  0x0806,
        /// Ethernet frame payload is IPv4.
        IPV4 = 0x0800,
        /// Ethernet frame payload is IPv6.
        IPV6 = 0x86DD,
        /// Ethernet frame payload is an 802.1Q VLAN tag.
        VLAN = 0x8100,
        /// Ethernet frame payload is an 802.1ad QinQ tag.
        QINQ = 0x88a8,
        /// Ethernet frame payload contains a PPPoE session packet.
        PPPOE_SESSION = 0x8864,
        /// Ethernet frame payload contains a PPPoE discovery packet.
        PPPOE_DISCOVERY = 0x8863
    }
}

/// A six-octet Ethernet II address.
///
/// This is copied from smoltcp's `EthernetAddress` and renamed to `EtherAddr`.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct EtherAddr(pub [u8; 6]);

impl EtherAddr {
    /// The broadcast address.
    pub const BROADCAST: EtherAddr = EtherAddr([0xff; 6]);

    /// Construct an Ethernet address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not six octets long.
    pub fn from_bytes(data: &[u8]) -> EtherAddr {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(data);
        EtherAddr(bytes)
    }

    /// Return an Ethernet address as a sequence of octets, in big-endian.
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether the address is a unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_broadcast() || self.is_multicast())
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the 'multicast' bit in the OUI is set.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Query whether the 'locally administered' bit in the OUI is set.
    pub const fn is_local(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// Step the address forward by `n`, treating it as a 48-bit big-endian
    /// integer. Used by the fleet runner to stride per-client MACs.
    pub fn stride(&self, n: u64) -> EtherAddr {
        let cur = u64::from_be_bytes([
            0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        ]);
        let next = cur.wrapping_add(n) & 0x0000_ffff_ffff_ffff;
        let b = next.to_be_bytes();
        EtherAddr([b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    /// Parse a string with the form 'Aa:0b:Cc:11:02:33' into `EtherAddr`.
    pub fn parse_from<T: AsRef<str>>(s: T) -> Option<Self> {
        fn convert(c: char) -> Option<u8> {
            c.to_digit(16).map(|d| d as u8)
        }

        let mut result = [0; 6];
        let mut s = s.as_ref().split(':');
        for byte in result.iter_mut() {
            let mut hex = s.next()?.chars();
            let n = convert(hex.next()?)? << 4;
            *byte = n | convert(hex.next()?)?;
            if hex.next().is_some() {
                return None;
            }
        }
        if s.next().is_some() {
            return None;
        }
        Some(Self(result))
    }
}

impl fmt::Display for EtherAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
        )
    }
}

mod generated;
pub use generated::{Ethernet, ETHERNET_HEADER_LEN, ETHERNET_HEADER_TEMPLATE};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Buf, Cursor, CursorMut};

    static FRAME_BYTES: [u8; 18] = [
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x08, 0x00, 0xaa,
        0xbb, 0xcc, 0xdd,
    ];

    #[test]
    fn packet_parse() {
        let ethpkt = Ethernet::parse(Cursor::new(&FRAME_BYTES[..])).unwrap();
        assert_eq!(
            ethpkt.dst_addr(),
            EtherAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06])
        );
        assert_eq!(
            ethpkt.src_addr(),
            EtherAddr([0x11, 0x12, 0x13, 0x14, 0x15, 0x16])
        );
        assert_eq!(ethpkt.ethertype(), EtherType::IPV4);

        let next = ethpkt.payload();
        assert_eq!(next.chunk(), &FRAME_BYTES[ETHERNET_HEADER_LEN..]);
    }

    #[test]
    fn packet_build() {
        let mut bytes = [0u8; 18];
        bytes[ETHERNET_HEADER_LEN..].copy_from_slice(&FRAME_BYTES[ETHERNET_HEADER_LEN..]);

        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(ETHERNET_HEADER_LEN);
        let mut ethpkt = Ethernet::prepend_header(buf, &ETHERNET_HEADER_TEMPLATE);
        ethpkt.set_dst_addr(EtherAddr([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]));
        ethpkt.set_src_addr(EtherAddr([0x11, 0x12, 0x13, 0x14, 0x15, 0x16]));
        ethpkt.set_ethertype(EtherType::IPV4);

        assert_eq!(ethpkt.buf().chunk(), &FRAME_BYTES[..]);
    }

    #[test]
    fn etheraddr_parse_from() {
        let s = "Aa:Bb:Cc:11:22:33";
        assert_eq!(
            EtherAddr::parse_from(s),
            Some(EtherAddr::from_bytes(&[0xAa, 0xBb, 0xCc, 0x11, 0x22, 0x33]))
        );
        assert_eq!(EtherAddr::parse_from("Aa:Bb:Cc:11:22"), None);
        assert_eq!(EtherAddr::parse_from("Aaa:Bb:Cc:11:22:33"), None);
        assert_eq!(EtherAddr::parse_from("Zaa:Bb:Cc:11:22:33"), None);
    }

    #[test]
    fn etheraddr_stride() {
        let base = EtherAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0xfe]);
        assert_eq!(base.stride(0), base);
        assert_eq!(
            base.stride(2),
            EtherAddr([0x00, 0x11, 0x22, 0x33, 0x45, 0x00])
        );
    }
}
