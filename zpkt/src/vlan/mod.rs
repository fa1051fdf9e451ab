//! 802.1Q/802.1ad VLAN tag stacking.
//!
//! A frame may carry zero, one, or two VLAN tags between the Ethernet header
//! and the PPPoE ethertype: an optional outer S-VLAN tag followed by an
//! optional inner C-VLAN tag, each a 4-byte [`VlanTag`] whose own ethertype
//! field names what comes next (another tag, or the PPPoE ethertype). The
//! TPID that introduces a tag (customarily 0x8100 for C-VLAN, 0x88a8 for
//! S-VLAN, but configurable) lives in the *preceding* header's ethertype
//! field, so stacking two tags is just parsing `VlanTag` twice in a row.

mod generated;
pub use generated::{VlanTag, VLAN_TAG_LEN, VLAN_TAG_TEMPLATE};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ether::EtherType;
    use crate::{Buf, Cursor, CursorMut};

    static TAG_BYTES: [u8; 8] = [0x20, 0x07, 0x08, 0x00, 0xaa, 0xbb, 0xcc, 0xdd];

    #[test]
    fn tag_parse() {
        let tag = VlanTag::parse(Cursor::new(&TAG_BYTES[..])).unwrap();
        assert_eq!(tag.priority(), 1);
        assert_eq!(tag.dei_flag(), 0);
        assert_eq!(tag.vlan_id(), 7);
        assert_eq!(tag.ethertype(), EtherType::IPV4);
        let next = tag.payload();
        assert_eq!(next.chunk(), &TAG_BYTES[VLAN_TAG_LEN..]);
    }

    #[test]
    fn tag_build() {
        let mut bytes = [0u8; 8];
        bytes[VLAN_TAG_LEN..].copy_from_slice(&TAG_BYTES[VLAN_TAG_LEN..]);

        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(VLAN_TAG_LEN);
        let mut tag = VlanTag::prepend_header(buf, &VLAN_TAG_TEMPLATE);
        tag.set_priority(1);
        tag.set_dei_flag(0);
        tag.set_vlan_id(7);
        tag.set_ethertype(EtherType::IPV4);

        assert_eq!(tag.buf().chunk(), &TAG_BYTES[..]);
    }

    #[test]
    fn tag_reject_short_buffer() {
        let short = [0u8; 3];
        assert!(VlanTag::parse(Cursor::new(&short[..])).is_err());
    }
}
