//! The PPP (RFC 1661) frame and the protocol-number table that names what
//! follows it: LCP/IPCP/IPv6CP control traffic, PAP/CHAP authentication, or
//! a network-layer datagram (IPv4/IPv6).
//!
//! A PPP frame over PPPoE has already had its framing/escaping/FCS stripped
//! by the PPPoE session layer, so all that's left is the 2-byte protocol
//! number and the protocol's own payload.

mod generated;
pub use generated::{PppFrame, PPP_FRAME_HEADER_LEN, PPP_FRAME_HEADER_TEMPLATE};

pub mod chap;
pub mod control;
pub mod options;
pub mod pap;

enum_sim! {
    /// PPP protocol numbers this client speaks or must recognize well enough
    /// to reject, per RFC 1661 and RFC 3818.
    pub struct PppProtocol (u16) {
        /// Padding protocol, used to pad frames to a minimum length.
        PAD = 0x0001,
        /// Internet Protocol version 4.
        IPV4 = 0x0021,
        /// Internet Protocol version 6.
        IPV6 = 0x0057,
        /// Link Control Protocol.
        LCP = 0xc021,
        /// Password Authentication Protocol.
        PAP = 0xc023,
        /// Challenge Handshake Authentication Protocol.
        CHAP = 0xc223,
        /// Internet Protocol Control Protocol (IPv4 NCP).
        IPCP = 0x8021,
        /// IPv6 Control Protocol (IPv6 NCP).
        IPV6CP = 0x8057
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Buf, Cursor, CursorMut};

    #[test]
    fn frame_parse_and_build() {
        let bytes: [u8; 6] = [0xc0, 0x21, 0x01, 0x02, 0x03, 0x04];
        let frame = PppFrame::parse(Cursor::new(&bytes[..])).unwrap();
        assert_eq!(frame.protocol(), PppProtocol::LCP);
        assert_eq!(frame.payload().chunk(), &bytes[2..]);

        let mut out = [0u8; 6];
        out[2..].copy_from_slice(&bytes[2..]);
        let mut buf = CursorMut::new(&mut out[..]);
        buf.advance(2);
        let mut built = PppFrame::prepend_header(buf, &PPP_FRAME_HEADER_TEMPLATE);
        built.set_protocol(PppProtocol::LCP);
        assert_eq!(built.buf().chunk(), &bytes[..]);
    }
}
