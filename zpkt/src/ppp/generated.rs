#![allow(missing_docs)]

use byteorder::{ByteOrder, NetworkEndian};

use super::PppProtocol;
use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

/// The fixed byte length of a PPP frame header (just the protocol number).
pub const PPP_FRAME_HEADER_LEN: usize = 2;
/// A template PPP header with protocol pre-set to LCP.
pub const PPP_FRAME_HEADER_TEMPLATE: [u8; 2] = [0xc0, 0x21];

#[derive(Debug, Clone, Copy)]
pub struct PppFrame<T> {
    buf: T,
}
impl<T: Buf> PppFrame<T> {
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
        if buf.chunk().len() < PPP_FRAME_HEADER_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn header_slice(&self) -> &[u8] {
        &self.buf.chunk()[0..PPP_FRAME_HEADER_LEN]
    }
    #[inline]
    pub fn protocol(&self) -> PppProtocol {
        PppProtocol::from(NetworkEndian::read_u16(&self.buf.chunk()[0..2]))
    }
}
impl<T: PktBuf> PppFrame<T> {
    #[inline]
    pub fn payload(self) -> T {
        let mut buf = self.buf;
        buf.advance(PPP_FRAME_HEADER_LEN);
        buf
    }
}
impl<T: PktBufMut> PppFrame<T> {
    #[inline]
    pub fn prepend_header<'a>(mut buf: T, header: &'a [u8; PPP_FRAME_HEADER_LEN]) -> Self {
        assert!(buf.chunk_headroom() >= PPP_FRAME_HEADER_LEN);
        buf.move_back(PPP_FRAME_HEADER_LEN);
        buf.chunk_mut()[0..PPP_FRAME_HEADER_LEN].copy_from_slice(&header[..]);
        Self { buf }
    }
    #[inline]
    pub fn set_protocol(&mut self, value: PppProtocol) {
        NetworkEndian::write_u16(&mut self.buf.chunk_mut()[0..2], u16::from(value));
    }
}
impl<'a> PppFrame<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        if buf.chunk().len() < PPP_FRAME_HEADER_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn payload_as_cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.buf.chunk()[PPP_FRAME_HEADER_LEN..])
    }
}
impl<'a> PppFrame<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        if buf.chunk().len() < PPP_FRAME_HEADER_LEN {
            return Err(buf);
        }
        Ok(Self { buf })
    }
    #[inline]
    pub fn payload_as_cursor_mut(&mut self) -> CursorMut<'_> {
        CursorMut::new(&mut self.buf.chunk_mut()[PPP_FRAME_HEADER_LEN..])
    }
}
