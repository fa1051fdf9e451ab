//! PPPoE (RFC 2516) discovery and session framing.
//!
//! Discovery packets (PADI/PADO/PADR/PADS/PADT and friends) carry a sequence
//! of [`PppoeTag`] TLVs instead of a PPP payload; session packets carry a
//! 2-byte PPP protocol number followed by the PPP frame. Both share the same
//! 6-byte header shape, so [`PppoeGroup::parse`] dispatches on the `code`
//! byte to decide which view to hand back.

mod generated;
pub use generated::PppoeGroup;
pub use generated::{PppoeDiscovery, PPPOE_DISCOVERY_HEADER_LEN, PPPOE_DISCOVERY_HEADER_TEMPLATE};
pub use generated::{PppoeSession, PPPOE_SESSION_HEADER_LEN, PPPOE_SESSION_HEADER_TEMPLATE};
pub use generated::{
    PppoeTag, PppoeTagIter, PppoeTagIterMut, PPPOE_TAG_HEADER_LEN, PPPOE_TAG_HEADER_TEMPLATE,
};

pub mod vendor;

enum_sim! {
    /// An enum-like type for representing the PPPoE code.
    pub struct PppoeCode (u8) {
        /// PPPoE session code.
        SESSION = 0x00,
        /// PPPoE discovery PADO
        PADO = 0x07,
        /// PPPoE discovery PADI
        PADI = 0x09,
        /// PPPoE discovery PADG
        PADG = 0x0a,
        /// PPPoE discovery PADC
        PADC = 0x0b,
        /// PPPoE discovery PADQ
        PADQ = 0x0c,
        /// PPPoE discovery PADR
        PADR = 0x19,
        /// PPPoE discovery PADS
        PADS = 0x65,
        /// PPPoE discovery PADT
        PADT = 0xa7,
        /// PPPoE discovery PADM
        PADM = 0xd3,
        /// PPPoE discovery PADN
        PADN = 0xd4
    }
}

enum_sim! {
    /// An enum-like type for representing the tag field of the PPPoE discovery packet.
    pub struct PppoeTagType(u16) {
        /// End-Of-List tag type
        EOL = 0x0000,
        /// Service-Name tag type
        SVC_NAME = 0x0101,
        /// AC-Name tag type
        AC_NAME = 0x0102,
        /// Host-Uniq tag type
        HOST_UNIQ = 0x0103,
        /// AC-Cookie tag type
        AC_COOKIE = 0x0104,
        /// Vendor-Specific tag type
        VENDOR = 0x0105,
        /// Credits tag type
        CREDITS = 0x0106,
        /// Metrics tag type
        METRICS = 0x0107,
        /// Sequence Number tag type
        SEQ_NUM = 0x0108,
        /// Credit Scale Factor tag type
        CRED_SCALE = 0x0109,
        /// Relay-Session-Id tag type
        RELAY_ID = 0x0110,
        /// HURL tag type
        HURL = 0x0111,
        /// MOTM tag type
        MOTM = 0x0112,
        /// PPP-Max-Payload tag type
        MAX_PAYLD = 0x0120,
        /// IP_Route_Add tag type
        IP_RT_ADD = 0x0121,
        /// Service-Name-Error tag type
        SVC_ERR = 0x0201,
        /// AC-System-Error tag type
        AC_ERR = 0x0202,
        /// Generic-Error tag type
        GENERIC_ERR = 0x0203
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Buf, Cursor, CursorMut};

    #[test]
    fn discovery_parse_with_tags() {
        // PADI: header (6) + Service-Name tag with empty value (4) + Host-Uniq tag (4+4)
        let bytes: [u8; 18] = [
            0x11, 0x09, 0x00, 0x00, 0x00, 0x08, // header, code=PADI, payload_len=8
            0x01, 0x01, 0x00, 0x00, // Service-Name, len 0
            0x01, 0x03, 0x00, 0x04, 0xde, 0xad, 0xbe, 0xef, // Host-Uniq, len 4
        ];
        let pkt = PppoeDiscovery::parse(Cursor::new(&bytes[..])).unwrap();
        assert_eq!(pkt.code(), PppoeCode::PADI);
        assert_eq!(pkt.session_id(), 0);
        let tags_buf = pkt.payload();
        let mut iter = PppoeTagIter::from_tag_slice(tags_buf.chunk());
        let t0 = iter.next().unwrap();
        assert_eq!(t0.tag_type(), PppoeTagType::SVC_NAME);
        assert_eq!(t0.tag_len(), 0);
        let t1 = iter.next().unwrap();
        assert_eq!(t1.tag_type(), PppoeTagType::HOST_UNIQ);
        assert_eq!(t1.value_slice(), &[0xde, 0xad, 0xbe, 0xef]);
        assert!(iter.next().is_none());
    }

    #[test]
    fn session_payload_roundtrip() {
        let mut bytes = [0u8; 12];
        bytes[6..8].copy_from_slice(&0xC021u16.to_be_bytes());
        bytes[8..12].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd]);

        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(6);
        let mut hdr = PppoeSession::prepend_header(buf, &PPPOE_SESSION_HEADER_TEMPLATE);
        hdr.set_code(PppoeCode::SESSION);
        hdr.set_session_id(0x1234);

        let pkt = PppoeSession::parse(Cursor::new(hdr.buf().chunk())).unwrap();
        let (proto, payload) = pkt.session_payload();
        assert_eq!(proto, 0xC021);
        assert_eq!(payload.chunk(), &[0xaa, 0xbb, 0xcc, 0xdd]);
    }

    #[test]
    fn group_dispatches_on_code() {
        let discovery: [u8; 6] = [0x11, 0x09, 0x00, 0x00, 0x00, 0x00];
        match PppoeGroup::parse(Cursor::new(&discovery[..])).unwrap() {
            PppoeGroup::Discovery(d) => assert_eq!(d.code(), PppoeCode::PADI),
            PppoeGroup::Session(_) => panic!("expected discovery"),
        }

        let session: [u8; 8] = [0x11, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00, 0x21];
        match PppoeGroup::parse(Cursor::new(&session[..])).unwrap() {
            PppoeGroup::Session(s) => assert_eq!(s.session_id(), 1),
            PppoeGroup::Discovery(_) => panic!("expected session"),
        }
    }
}
