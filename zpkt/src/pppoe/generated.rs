#![allow(missing_docs)]

use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

use super::{PppoeCode, PppoeTagType};

/// The fixed byte length of the shared PPPoE header (version/type nibbles,
/// code, session id, payload length).
pub const PPPOE_DISCOVERY_HEADER_LEN: usize = 6;
/// A template PPPoE discovery header (version 1, type 1, code left zeroed).
pub const PPPOE_DISCOVERY_HEADER_TEMPLATE: [u8; 6] = [0x11, 0x00, 0x00, 0x00, 0x00, 0x00];

pub const PPPOE_SESSION_HEADER_LEN: usize = 6;
pub const PPPOE_SESSION_HEADER_TEMPLATE: [u8; 6] = [0x11, 0x00, 0x00, 0x00, 0x00, 0x00];

#[derive(Debug, Clone, Copy)]
pub struct PppoeDiscovery<T> {
    buf: T,
}
impl<T: Buf> PppoeDiscovery<T> {
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
        if buf.chunk().len() < PPPOE_DISCOVERY_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.payload_len() as usize) + PPPOE_DISCOVERY_HEADER_LEN
            > container.buf.remaining()
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn header_slice(&self) -> &[u8] {
        &self.buf.chunk()[0..PPPOE_DISCOVERY_HEADER_LEN]
    }
    #[inline]
    pub fn version(&self) -> u8 {
        self.buf.chunk()[0] >> 4
    }
    #[inline]
    pub fn type_(&self) -> u8 {
        self.buf.chunk()[0] & 0xf
    }
    #[inline]
    pub fn code(&self) -> PppoeCode {
        PppoeCode::from(self.buf.chunk()[1])
    }
    #[inline]
    pub fn session_id(&self) -> u16 {
        u16::from_be_bytes(self.buf.chunk()[2..4].try_into().unwrap())
    }
    #[inline]
    pub fn payload_len(&self) -> u16 {
        u16::from_be_bytes(self.buf.chunk()[4..6].try_into().unwrap())
    }
}
impl<T: PktBuf> PppoeDiscovery<T> {
    #[inline]
    pub fn payload(self) -> T {
        let payload_len = self.payload_len() as usize;
        assert!(PPPOE_DISCOVERY_HEADER_LEN + payload_len <= self.buf.remaining());
        let trim_size = self.buf.remaining() - (PPPOE_DISCOVERY_HEADER_LEN + payload_len);
        let mut buf = self.buf;
        if trim_size > 0 {
            buf.trim_off(trim_size);
        }
        buf.advance(PPPOE_DISCOVERY_HEADER_LEN);
        buf
    }
}
impl<T: PktBufMut> PppoeDiscovery<T> {
    #[inline]
    pub fn prepend_header<'a>(mut buf: T, header: &'a [u8; PPPOE_DISCOVERY_HEADER_LEN]) -> Self {
        assert!(buf.chunk_headroom() >= PPPOE_DISCOVERY_HEADER_LEN);
        let payload_len = buf.remaining();
        assert!(payload_len <= 65535);
        buf.move_back(PPPOE_DISCOVERY_HEADER_LEN);
        buf.chunk_mut()[0..PPPOE_DISCOVERY_HEADER_LEN].copy_from_slice(&header[..]);
        let mut container = Self { buf };
        container.set_payload_len(payload_len as u16);
        container
    }
    #[inline]
    pub fn set_version(&mut self, value: u8) {
        assert!(value == 1);
        self.buf.chunk_mut()[0] = (self.buf.chunk_mut()[0] & 0x0f) | (value << 4);
    }
    #[inline]
    pub fn set_type_(&mut self, value: u8) {
        assert!(value == 1);
        self.buf.chunk_mut()[0] = (self.buf.chunk_mut()[0] & 0xf0) | value;
    }
    #[inline]
    pub fn set_code(&mut self, value: PppoeCode) {
        self.buf.chunk_mut()[1] = u8::from(value);
    }
    #[inline]
    pub fn set_session_id(&mut self, value: u16) {
        self.buf.chunk_mut()[2..4].copy_from_slice(&value.to_be_bytes());
    }
    #[inline]
    pub fn set_payload_len(&mut self, value: u16) {
        self.buf.chunk_mut()[4..6].copy_from_slice(&value.to_be_bytes());
    }
}
impl<'a> PppoeDiscovery<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PPPOE_DISCOVERY_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.payload_len() as usize) + PPPOE_DISCOVERY_HEADER_LEN > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor(&self) -> Cursor<'_> {
        let payload_len = self.payload_len() as usize;
        Cursor::new(
            &self.buf.chunk()
                [PPPOE_DISCOVERY_HEADER_LEN..(PPPOE_DISCOVERY_HEADER_LEN + payload_len)],
        )
    }
}
impl<'a> PppoeDiscovery<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PPPOE_DISCOVERY_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.payload_len() as usize) + PPPOE_DISCOVERY_HEADER_LEN > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor_mut(&mut self) -> CursorMut<'_> {
        let payload_len = self.payload_len() as usize;
        CursorMut::new(
            &mut self.buf.chunk_mut()
                [PPPOE_DISCOVERY_HEADER_LEN..(PPPOE_DISCOVERY_HEADER_LEN + payload_len)],
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PppoeSession<T> {
    buf: T,
}
impl<T: Buf> PppoeSession<T> {
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
        if buf.chunk().len() < PPPOE_SESSION_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.payload_len() as usize) + PPPOE_SESSION_HEADER_LEN
            > container.buf.remaining()
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn header_slice(&self) -> &[u8] {
        &self.buf.chunk()[0..PPPOE_SESSION_HEADER_LEN]
    }
    #[inline]
    pub fn version(&self) -> u8 {
        self.buf.chunk()[0] >> 4
    }
    #[inline]
    pub fn type_(&self) -> u8 {
        self.buf.chunk()[0] & 0xf
    }
    #[inline]
    pub fn code(&self) -> PppoeCode {
        PppoeCode::from(self.buf.chunk()[1])
    }
    #[inline]
    pub fn session_id(&self) -> u16 {
        u16::from_be_bytes(self.buf.chunk()[2..4].try_into().unwrap())
    }
    #[inline]
    pub fn payload_len(&self) -> u16 {
        u16::from_be_bytes(self.buf.chunk()[4..6].try_into().unwrap())
    }
}
impl<T: PktBuf> PppoeSession<T> {
    #[inline]
    pub fn payload(self) -> T {
        let payload_len = self.payload_len() as usize;
        assert!(PPPOE_SESSION_HEADER_LEN + payload_len <= self.buf.remaining());
        let trim_size = self.buf.remaining() - (PPPOE_SESSION_HEADER_LEN + payload_len);
        let mut buf = self.buf;
        if trim_size > 0 {
            buf.trim_off(trim_size);
        }
        buf.advance(PPPOE_SESSION_HEADER_LEN);
        buf
    }

    /// Split the session payload into the 2-byte PPP protocol number and the
    /// remaining PPP payload bytes.
    ///
    /// # Panics
    /// Panics if `code` is not `PppoeCode::SESSION` or the header claims fewer
    /// than 2 bytes of payload.
    pub fn session_payload(self) -> (u16, T) {
        assert!(self.code() == PppoeCode::SESSION);
        assert!(self.buf.chunk().len() >= PPPOE_SESSION_HEADER_LEN + 2);
        let proto = u16::from_be_bytes(
            self.buf.chunk()[PPPOE_SESSION_HEADER_LEN..PPPOE_SESSION_HEADER_LEN + 2]
                .try_into()
                .unwrap(),
        );
        let mut payload = self.payload();
        payload.advance(2);
        (proto, payload)
    }
}
impl<T: PktBufMut> PppoeSession<T> {
    #[inline]
    pub fn prepend_header<'a>(mut buf: T, header: &'a [u8; PPPOE_SESSION_HEADER_LEN]) -> Self {
        assert!(buf.chunk_headroom() >= PPPOE_SESSION_HEADER_LEN);
        let payload_len = buf.remaining();
        assert!(payload_len <= 65535);
        buf.move_back(PPPOE_SESSION_HEADER_LEN);
        buf.chunk_mut()[0..PPPOE_SESSION_HEADER_LEN].copy_from_slice(&header[..]);
        let mut container = Self { buf };
        container.set_payload_len(payload_len as u16);
        container
    }
    #[inline]
    pub fn set_version(&mut self, value: u8) {
        assert!(value == 1);
        self.buf.chunk_mut()[0] = (self.buf.chunk_mut()[0] & 0x0f) | (value << 4);
    }
    #[inline]
    pub fn set_type_(&mut self, value: u8) {
        assert!(value == 1);
        self.buf.chunk_mut()[0] = (self.buf.chunk_mut()[0] & 0xf0) | value;
    }
    #[inline]
    pub fn set_code(&mut self, value: PppoeCode) {
        self.buf.chunk_mut()[1] = u8::from(value);
    }
    #[inline]
    pub fn set_session_id(&mut self, value: u16) {
        self.buf.chunk_mut()[2..4].copy_from_slice(&value.to_be_bytes());
    }
    #[inline]
    pub fn set_payload_len(&mut self, value: u16) {
        self.buf.chunk_mut()[4..6].copy_from_slice(&value.to_be_bytes());
    }

    /// Prepend the 2-byte PPP protocol number to a payload buffer, turning it
    /// into a session-packet payload ready for `prepend_header`.
    pub fn prepend_session_payload_type(mut buf: T, proto: u16) -> T {
        assert!(buf.chunk_headroom() >= 2);
        buf.move_back(2);
        buf.chunk_mut()[..2].copy_from_slice(&proto.to_be_bytes());
        buf
    }
}
impl<'a> PppoeSession<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PPPOE_SESSION_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.payload_len() as usize) + PPPOE_SESSION_HEADER_LEN > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor(&self) -> Cursor<'_> {
        let payload_len = self.payload_len() as usize;
        Cursor::new(
            &self.buf.chunk()[PPPOE_SESSION_HEADER_LEN..(PPPOE_SESSION_HEADER_LEN + payload_len)],
        )
    }
}
impl<'a> PppoeSession<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PPPOE_SESSION_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.payload_len() as usize) + PPPOE_SESSION_HEADER_LEN > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor_mut(&mut self) -> CursorMut<'_> {
        let payload_len = self.payload_len() as usize;
        CursorMut::new(
            &mut self.buf.chunk_mut()
                [PPPOE_SESSION_HEADER_LEN..(PPPOE_SESSION_HEADER_LEN + payload_len)],
        )
    }
}

/// The fixed byte length of a PPPoE tag header (tag type + tag length).
pub const PPPOE_TAG_HEADER_LEN: usize = 4;
/// A template PPPoE tag header (type EOL, zero-length value).
pub const PPPOE_TAG_HEADER_TEMPLATE: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

#[derive(Debug, Clone, Copy)]
pub struct PppoeTag<T> {
    buf: T,
}
impl<T: Buf> PppoeTag<T> {
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
        let chunk_len = buf.chunk().len();
        if chunk_len < PPPOE_TAG_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if container.header_len() > chunk_len {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn header_slice(&self) -> &[u8] {
        &self.buf.chunk()[0..PPPOE_TAG_HEADER_LEN]
    }
    #[inline]
    pub fn value_slice(&self) -> &[u8] {
        &self.buf.chunk()[PPPOE_TAG_HEADER_LEN..self.header_len()]
    }
    #[inline]
    pub fn tag_type(&self) -> PppoeTagType {
        PppoeTagType::from(u16::from_be_bytes(self.buf.chunk()[0..2].try_into().unwrap()))
    }
    #[inline]
    pub fn tag_len(&self) -> u16 {
        u16::from_be_bytes(self.buf.chunk()[2..4].try_into().unwrap())
    }
    #[inline]
    fn header_len(&self) -> usize {
        PPPOE_TAG_HEADER_LEN + self.tag_len() as usize
    }
}
impl<T: PktBuf> PppoeTag<T> {
    #[inline]
    pub fn payload(self) -> T {
        let header_len = self.header_len();
        let mut buf = self.buf;
        buf.advance(header_len);
        buf
    }
}
impl<T: PktBufMut> PppoeTag<T> {
    #[inline]
    pub fn prepend_header<'a>(mut buf: T, header: &'a [u8; PPPOE_TAG_HEADER_LEN]) -> Self {
        let value_len = buf.remaining();
        assert!(buf.chunk_headroom() >= PPPOE_TAG_HEADER_LEN);
        buf.move_back(PPPOE_TAG_HEADER_LEN);
        buf.chunk_mut()[0..PPPOE_TAG_HEADER_LEN].copy_from_slice(&header[..]);
        let mut container = Self { buf };
        container.set_tag_len(value_len as u16);
        container
    }
    #[inline]
    pub fn value_slice_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        &mut self.buf.chunk_mut()[PPPOE_TAG_HEADER_LEN..header_len]
    }
    #[inline]
    pub fn set_tag_type(&mut self, value: PppoeTagType) {
        self.buf.chunk_mut()[0..2].copy_from_slice(&u16::from(value).to_be_bytes());
    }
    #[inline]
    pub fn set_tag_len(&mut self, value: u16) {
        self.buf.chunk_mut()[2..4].copy_from_slice(&value.to_be_bytes());
    }
}
impl<'a> PppoeTag<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PPPOE_TAG_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if container.header_len() > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor(&self) -> Cursor<'_> {
        let header_len = self.header_len();
        Cursor::new(&self.buf.chunk()[header_len..])
    }
}
impl<'a> PppoeTag<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PPPOE_TAG_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if container.header_len() > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor_mut(&mut self) -> CursorMut<'_> {
        let header_len = self.header_len();
        CursorMut::new(&mut self.buf.chunk_mut()[header_len..])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PppoeTagIter<'a> {
    buf: &'a [u8],
}
impl<'a> PppoeTagIter<'a> {
    pub fn from_tag_slice(tag_slice: &'a [u8]) -> Self {
        Self { buf: tag_slice }
    }
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }
}
impl<'a> Iterator for PppoeTagIter<'a> {
    type Item = PppoeTag<Cursor<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        PppoeTag::parse(self.buf).ok().map(|tag| {
            let header_len = PPPOE_TAG_HEADER_LEN + tag.tag_len() as usize;
            let result = PppoeTag {
                buf: Cursor::new(&self.buf[..header_len]),
            };
            self.buf = &self.buf[header_len..];
            result
        })
    }
}

#[derive(Debug)]
pub struct PppoeTagIterMut<'a> {
    buf: &'a mut [u8],
}
impl<'a> PppoeTagIterMut<'a> {
    pub fn from_tag_slice_mut(tag_slice_mut: &'a mut [u8]) -> Self {
        Self {
            buf: tag_slice_mut,
        }
    }
    pub fn buf(&self) -> &[u8] {
        &self.buf[..]
    }
}
impl<'a> Iterator for PppoeTagIterMut<'a> {
    type Item = PppoeTag<CursorMut<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        match PppoeTag::parse(&self.buf[..]) {
            Ok(tag) => {
                let header_len = PPPOE_TAG_HEADER_LEN + tag.tag_len() as usize;
                let (fst, snd) = std::mem::take(&mut self.buf).split_at_mut(header_len);
                self.buf = snd;
                Some(PppoeTag {
                    buf: CursorMut::new(fst),
                })
            }
            Err(_) => None,
        }
    }
}

/// A parsed PPPoE frame, dispatched on `code` into discovery or session view.
#[derive(Debug, Clone, Copy)]
pub enum PppoeGroup<T> {
    Discovery(PppoeDiscovery<T>),
    Session(PppoeSession<T>),
}
impl<T: Buf> PppoeGroup<T> {
    pub fn parse(buf: T) -> Result<Self, T> {
        if buf.chunk().len() < PPPOE_DISCOVERY_HEADER_LEN {
            return Err(buf);
        }
        if buf.chunk()[1] == u8::from(PppoeCode::SESSION) {
            PppoeSession::parse(buf).map(PppoeGroup::Session)
        } else {
            PppoeDiscovery::parse(buf).map(PppoeGroup::Discovery)
        }
    }
}
