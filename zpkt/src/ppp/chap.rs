//! CHAP (RFC 1994 §4): challenge/response authentication.
//!
//! Challenge and Response carry a length-prefixed value (the challenge bytes,
//! or the MD5 digest of identifier+secret+challenge) followed by a name;
//! Success and Failure carry only a message. All four share the control
//! protocols' 4-byte code/identifier/length header.

use byteorder::{ByteOrder, NetworkEndian};

use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

enum_sim! {
    /// CHAP packet codes (RFC 1994 §4.1-4.4).
    pub struct ChapCode (u8) {
        /// Challenge.
        CHALLENGE = 1,
        /// Response.
        RESPONSE = 2,
        /// Success.
        SUCCESS = 3,
        /// Failure.
        FAILURE = 4
    }
}

enum_sim! {
    /// CHAP algorithm byte carried in an LCP Authentication-Protocol option
    /// when the negotiated protocol is CHAP (RFC 1994 §4, PPP Extensions WG
    /// registry).
    pub struct ChapAlgorithm (u8) {
        /// No algorithm (not a valid wire value; used as an absent-option sentinel).
        NONE = 0,
        /// CHAP with MD5, the only algorithm this client implements.
        MD5 = 5,
        /// SHA-1 (unsupported, recognized only to reject cleanly).
        SHA1 = 6,
        /// CHAP with SHA-256 (unsupported).
        SHA256 = 7,
        /// CHAP with SHA3-256 (unsupported).
        SHA3_256 = 8,
        /// MS-CHAP (unsupported).
        MSCHAP = 128,
        /// MS-CHAP-2 (unsupported).
        MSCHAP2 = 129
    }
}

/// The length in bytes of an MD5 digest, i.e. the CHAP value field length
/// this client always uses.
pub const CHAP_MD5_VALUE_LEN: usize = 16;

/// The fixed byte length of the CHAP header (code/identifier/length).
pub const CHAP_HEADER_LEN: usize = 4;
/// A template CHAP header (Challenge, identifier/length zeroed).
pub const CHAP_HEADER_TEMPLATE: [u8; 4] = [0x01, 0x00, 0x00, 0x04];

#[derive(Debug, Clone, Copy)]
pub struct ChapPacket<T> {
    buf: T,
}

impl<T: Buf> ChapPacket<T> {
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
        if buf.chunk().len() < CHAP_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < CHAP_HEADER_LEN
            || (container.length() as usize) > container.buf.remaining()
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn code(&self) -> ChapCode {
        ChapCode::from(self.buf.chunk()[0])
    }
    #[inline]
    pub fn identifier(&self) -> u8 {
        self.buf.chunk()[1]
    }
    #[inline]
    pub fn length(&self) -> u16 {
        NetworkEndian::read_u16(&self.buf.chunk()[2..4])
    }
    /// The value field carried by a Challenge/Response (the challenge bytes,
    /// or the MD5 response digest).
    ///
    /// # Panics
    /// Panics if `code()` is not `CHALLENGE` or `RESPONSE`.
    #[inline]
    pub fn value(&self) -> &[u8] {
        assert!(matches!(self.code(), ChapCode::CHALLENGE | ChapCode::RESPONSE));
        let value_len = self.buf.chunk()[4] as usize;
        &self.buf.chunk()[5..5 + value_len]
    }
    /// The name field following the value in a Challenge/Response.
    ///
    /// # Panics
    /// Panics if `code()` is not `CHALLENGE` or `RESPONSE`.
    #[inline]
    pub fn name(&self) -> &[u8] {
        assert!(matches!(self.code(), ChapCode::CHALLENGE | ChapCode::RESPONSE));
        let value_len = self.buf.chunk()[4] as usize;
        &self.buf.chunk()[5 + value_len..self.length() as usize]
    }
    /// The message carried by a Success/Failure.
    ///
    /// # Panics
    /// Panics if `code()` is `CHALLENGE` or `RESPONSE`.
    #[inline]
    pub fn message(&self) -> &[u8] {
        assert!(!matches!(self.code(), ChapCode::CHALLENGE | ChapCode::RESPONSE));
        &self.buf.chunk()[4..self.length() as usize]
    }
}

impl<T: PktBufMut> ChapPacket<T> {
    /// Build a Challenge/Response into `buf`, which must already hold
    /// `value.len() + name.len()` bytes of headroom beyond the header.
    pub fn build_challenge_or_response(
        mut buf: T,
        code: ChapCode,
        identifier: u8,
        value: &[u8],
        name: &[u8],
    ) -> Self {
        assert!(matches!(code, ChapCode::CHALLENGE | ChapCode::RESPONSE));
        assert!(value.len() <= 255);
        let body_len = 1 + value.len() + name.len();
        assert!(buf.chunk_headroom() >= CHAP_HEADER_LEN + body_len);
        buf.move_back(body_len);
        buf.chunk_mut()[0] = value.len() as u8;
        buf.chunk_mut()[1..1 + value.len()].copy_from_slice(value);
        buf.chunk_mut()[1 + value.len()..1 + value.len() + name.len()].copy_from_slice(name);

        buf.move_back(CHAP_HEADER_LEN);
        buf.chunk_mut()[0] = u8::from(code);
        buf.chunk_mut()[1] = identifier;
        NetworkEndian::write_u16(&mut buf.chunk_mut()[2..4], (CHAP_HEADER_LEN + body_len) as u16);
        Self { buf }
    }

    /// Build a Success/Failure into `buf`, which must already hold
    /// `message.len()` bytes of headroom beyond the header.
    pub fn build_status(mut buf: T, code: ChapCode, identifier: u8, message: &[u8]) -> Self {
        assert!(!matches!(code, ChapCode::CHALLENGE | ChapCode::RESPONSE));
        let body_len = message.len();
        assert!(buf.chunk_headroom() >= CHAP_HEADER_LEN + body_len);
        buf.move_back(body_len);
        buf.chunk_mut()[..message.len()].copy_from_slice(message);

        buf.move_back(CHAP_HEADER_LEN);
        buf.chunk_mut()[0] = u8::from(code);
        buf.chunk_mut()[1] = identifier;
        NetworkEndian::write_u16(&mut buf.chunk_mut()[2..4], (CHAP_HEADER_LEN + body_len) as u16);
        Self { buf }
    }
}

impl<'a> ChapPacket<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < CHAP_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < CHAP_HEADER_LEN
            || (container.length() as usize) > remaining_len
        {
            return Err(container.buf);
        }
        Ok(container)
    }
}

impl<'a> ChapPacket<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < CHAP_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < CHAP_HEADER_LEN
            || (container.length() as usize) > remaining_len
        {
            return Err(container.buf);
        }
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CursorMut;

    #[test]
    fn build_and_parse_challenge() {
        let mut bytes = [0u8; 32];
        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(CHAP_HEADER_LEN + 1 + 16 + 3);
        let value = [0x11u8; 16];
        let pkt = ChapPacket::build_challenge_or_response(buf, ChapCode::CHALLENGE, 3, &value, b"ac1");

        let parsed = ChapPacket::parse(Cursor::new(pkt.buf().chunk())).unwrap();
        assert_eq!(parsed.code(), ChapCode::CHALLENGE);
        assert_eq!(parsed.identifier(), 3);
        assert_eq!(parsed.value(), &value);
        assert_eq!(parsed.name(), b"ac1");
    }

    #[test]
    fn build_and_parse_response() {
        let mut bytes = [0u8; 32];
        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(CHAP_HEADER_LEN + 1 + CHAP_MD5_VALUE_LEN + 3);
        let digest = [0xaa; CHAP_MD5_VALUE_LEN];
        let pkt =
            ChapPacket::build_challenge_or_response(buf, ChapCode::RESPONSE, 3, &digest, b"bob");

        let parsed = ChapPacket::parse(Cursor::new(pkt.buf().chunk())).unwrap();
        assert_eq!(parsed.code(), ChapCode::RESPONSE);
        assert_eq!(parsed.value(), &digest);
        assert_eq!(parsed.name(), b"bob");
    }

    #[test]
    fn build_and_parse_success() {
        let mut bytes = [0u8; 16];
        let mut buf = CursorMut::new(&mut bytes[..]);
        buf.advance(CHAP_HEADER_LEN + 8);
        let pkt = ChapPacket::build_status(buf, ChapCode::SUCCESS, 3, b"Welcome.");

        let parsed = ChapPacket::parse(Cursor::new(pkt.buf().chunk())).unwrap();
        assert_eq!(parsed.code(), ChapCode::SUCCESS);
        assert_eq!(parsed.message(), b"Welcome.");
    }
}
