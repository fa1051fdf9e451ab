#![allow(missing_docs)]

use byteorder::{ByteOrder, NetworkEndian};

use crate::ether::EtherType;
use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

/// The fixed byte length of an 802.1Q/802.1ad VLAN tag (PCP/DEI/VID + inner
/// ethertype). The tag's own TPID is carried in the *preceding* ethertype
/// field, not in this header.
pub const VLAN_TAG_LEN: usize = 4;
/// A template VLAN tag with vlan_id/priority/dei zeroed and ethertype set to
/// IPv4; callers overwrite every field before use.
pub const VLAN_TAG_TEMPLATE: [u8; 4] = [0x00, 0x00, 0x08, 0x00];

#[derive(Debug, Clone, Copy)]
pub struct VlanTag<T> {
    buf: T,
}

impl<T: Buf> VlanTag<T> {
    #[inline]
    pub fn parse_unchecked(buf: T) -> Self {
        Self { buf }
    }
    #[inline]
    pub fn buf(&self) -> &T {
        &self.buf
    }
    #[inline]
    pub fn release(self) -> T {
        self.buf
    }
    #[inline]
    pub fn parse(buf: T) -> Result<Self, T> {
        if buf.chunk().len() < VLAN_TAG_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn header_slice(&self) -> &[u8] {
        &self.buf.chunk()[0..VLAN_TAG_LEN]
    }
    #[inline]
    pub fn priority(&self) -> u8 {
        self.buf.chunk()[0] >> 5
    }
    #[inline]
    pub fn dei_flag(&self) -> u8 {
        (self.buf.chunk()[0] >> 4) & 0x1
    }
    #[inline]
    pub fn vlan_id(&self) -> u16 {
        NetworkEndian::read_u16(&self.buf.chunk()[0..2]) & 0x0fff
    }
    #[inline]
    pub fn ethertype(&self) -> EtherType {
        EtherType::from(NetworkEndian::read_u16(&self.buf.chunk()[2..4]))
    }
}

impl<T: PktBuf> VlanTag<T> {
    #[inline]
    pub fn payload(self) -> T {
        let mut buf = self.buf;
        buf.advance(VLAN_TAG_LEN);
        buf
    }
}

impl<T: PktBufMut> VlanTag<T> {
    #[inline]
    pub fn prepend_header<'a>(mut buf: T, header: &'a [u8; VLAN_TAG_LEN]) -> Self {
        assert!(buf.chunk_headroom() >= VLAN_TAG_LEN);
        buf.move_back(VLAN_TAG_LEN);
        buf.chunk_mut()[0..VLAN_TAG_LEN].copy_from_slice(&header[..]);
        Self { buf }
    }
    #[inline]
    pub fn set_priority(&mut self, value: u8) {
        assert!(value <= 0x7);
        self.buf.chunk_mut()[0] = (self.buf.chunk_mut()[0] & 0x1f) | (value << 5);
    }
    #[inline]
    pub fn set_dei_flag(&mut self, value: u8) {
        assert!(value <= 0x1);
        self.buf.chunk_mut()[0] = (self.buf.chunk_mut()[0] & 0xef) | (value << 4);
    }
    #[inline]
    pub fn set_vlan_id(&mut self, value: u16) {
        assert!(value <= 0x0fff);
        let top = self.buf.chunk_mut()[0] & 0xf0;
        NetworkEndian::write_u16(&mut self.buf.chunk_mut()[0..2], value);
        self.buf.chunk_mut()[0] |= top;
    }
    #[inline]
    pub fn set_ethertype(&mut self, value: EtherType) {
        NetworkEndian::write_u16(&mut self.buf.chunk_mut()[2..4], u16::from(value));
    }
}

impl<'a> VlanTag<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        if buf.chunk().len() < VLAN_TAG_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn payload_as_cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.buf.chunk()[VLAN_TAG_LEN..])
    }
}

impl<'a> VlanTag<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        if buf.chunk().len() < VLAN_TAG_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn payload_as_cursor_mut(&mut self) -> CursorMut<'_> {
        CursorMut::new(&mut self.buf.chunk_mut()[VLAN_TAG_LEN..])
    }
}
