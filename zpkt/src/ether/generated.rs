#![allow(missing_docs)]

use byteorder::{ByteOrder, NetworkEndian};

use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

use super::{EtherAddr, EtherType};

/// The fixed byte length of an Ethernet II header (dst + src + ethertype).
pub const ETHERNET_HEADER_LEN: usize = 14;
/// A template Ethernet II header with ethertype pre-set to IPv4; callers
/// overwrite every field before use.
pub const ETHERNET_HEADER_TEMPLATE: [u8; 14] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00,
];

#[derive(Debug, Clone, Copy)]
pub struct Ethernet<T> {
    buf: T,
}

impl<T: Buf> Ethernet<T> {
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
        if buf.chunk().len() < ETHERNET_HEADER_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn header_slice(&self) -> &[u8] {
        &self.buf.chunk()[0..ETHERNET_HEADER_LEN]
    }
    #[inline]
    pub fn dst_addr(&self) -> EtherAddr {
        EtherAddr::from_bytes(&self.buf.chunk()[0..6])
    }
    #[inline]
    pub fn src_addr(&self) -> EtherAddr {
        EtherAddr::from_bytes(&self.buf.chunk()[6..12])
    }
    #[inline]
    pub fn ethertype(&self) -> EtherType {
        EtherType::from(NetworkEndian::read_u16(&self.buf.chunk()[12..14]))
    }
}

impl<T: PktBuf> Ethernet<T> {
    #[inline]
    pub fn payload(self) -> T {
        let mut buf = self.buf;
        buf.advance(ETHERNET_HEADER_LEN);
        buf
    }
}

impl<T: PktBufMut> Ethernet<T> {
    #[inline]
    pub fn prepend_header<'a>(mut buf: T, header: &'a [u8; ETHERNET_HEADER_LEN]) -> Self {
        assert!(buf.chunk_headroom() >= ETHERNET_HEADER_LEN);
        buf.move_back(ETHERNET_HEADER_LEN);
        buf.chunk_mut()[0..ETHERNET_HEADER_LEN].copy_from_slice(&header[..]);
        Self { buf }
    }
    #[inline]
    pub fn set_dst_addr(&mut self, value: EtherAddr) {
        self.buf.chunk_mut()[0..6].copy_from_slice(value.as_bytes());
    }
    #[inline]
    pub fn set_src_addr(&mut self, value: EtherAddr) {
        self.buf.chunk_mut()[6..12].copy_from_slice(value.as_bytes());
    }
    #[inline]
    pub fn set_ethertype(&mut self, value: EtherType) {
        NetworkEndian::write_u16(&mut self.buf.chunk_mut()[12..14], u16::from(value));
    }
}

impl<'a> Ethernet<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        if buf.chunk().len() < ETHERNET_HEADER_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn payload_as_cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.buf.chunk()[ETHERNET_HEADER_LEN..])
    }
}

impl<'a> Ethernet<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        if buf.chunk().len() < ETHERNET_HEADER_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn payload_as_cursor_mut(&mut self) -> CursorMut<'_> {
        CursorMut::new(&mut self.buf.chunk_mut()[ETHERNET_HEADER_LEN..])
    }
}
