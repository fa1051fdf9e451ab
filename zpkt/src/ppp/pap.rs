//! PAP (RFC 1334 §2): a single cleartext credential exchange.
//!
//! Authenticate-Request carries a length-prefixed peer-id and password;
//! Authenticate-Ack/Nak carry a length-prefixed message. All three share the
//! same 4-byte code/identifier/length header as the control protocols.

use byteorder::{ByteOrder, NetworkEndian};

use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

enum_sim! {
    /// PAP packet codes (RFC 1334 §2.1-2.2).
    pub struct PapCode (u8) {
        /// Authenticate-Request.
        AUTH_REQUEST = 1,
        /// Authenticate-Ack.
        AUTH_ACK = 2,
        /// Authenticate-Nak.
        AUTH_NAK = 3
    }
}

/// The fixed byte length of the PAP header (code/identifier/length).
pub const PAP_HEADER_LEN: usize = 4;
/// A template PAP header (Authenticate-Request, identifier/length zeroed).
pub const PAP_HEADER_TEMPLATE: [u8; 4] = [0x01, 0x00, 0x00, 0x04];

#[derive(Debug, Clone, Copy)]
pub struct PapPacket<T> {
    buf: T,
}

impl<T: Buf> PapPacket<T> {
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
        if buf.chunk().len() < PAP_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < PAP_HEADER_LEN
            || (container.length() as usize) > container.buf.remaining()
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn code(&self) -> PapCode {
        PapCode::from(self.buf.chunk()[0])
    }
    #[inline]
    pub fn identifier(&self) -> u8 {
        self.buf.chunk()[1]
    }
    #[inline]
    pub fn length(&self) -> u16 {
        NetworkEndian::read_u16(&self.buf.chunk()[2..4])
    }
    /// The peer-id carried by an Authenticate-Request.
    ///
    /// # Panics
    /// Panics if `code()` is not `AUTH_REQUEST`.
    #[inline]
    pub fn peer_id(&self) -> &[u8] {
        assert_eq!(self.code(), PapCode::AUTH_REQUEST);
        let peer_id_len = self.buf.chunk()[4] as usize;
        &self.buf.chunk()[5..5 + peer_id_len]
    }
    /// The password carried by an Authenticate-Request.
    ///
    /// # Panics
    /// Panics if `code()` is not `AUTH_REQUEST`.
    #[inline]
    pub fn passwd(&self) -> &[u8] {
        assert_eq!(self.code(), PapCode::AUTH_REQUEST);
        let peer_id_len = self.buf.chunk()[4] as usize;
        let passwd_off = 5 + peer_id_len;
        let passwd_len = self.buf.chunk()[passwd_off] as usize;
        &self.buf.chunk()[passwd_off + 1..passwd_off + 1 + passwd_len]
    }
    /// The message carried by an Authenticate-Ack/Nak.
    ///
    /// # Panics
    /// Panics if `code()` is `AUTH_REQUEST`.
    #[inline]
    pub fn message(&self) -> &[u8] {
        assert_ne!(self.code(), PapCode::AUTH_REQUEST);
        let msg_len = self.buf.chunk()[4] as usize;
        &self.buf.chunk()[5..5 + msg_len]
    }
}

impl<T: PktBufMut> PapPacket<T> {
    /// Build an Authenticate-Request into `buf`, which must already hold
    /// `peer_id.len() + passwd.len()` bytes of headroom beyond the header.
    pub fn build_auth_request(mut buf: T, identifier: u8, peer_id: &[u8], passwd: &[u8]) -> Self {
        assert!(!peer_id.is_empty() && peer_id.len() <= 249);
        assert!(passwd.len() <= 249);
        let body_len = 2 + peer_id.len() + passwd.len();
        assert!(buf.chunk_headroom() >= PAP_HEADER_LEN + body_len);
        buf.move_back(body_len);
        buf.chunk_mut()[0] = peer_id.len() as u8;
        buf.chunk_mut()[1..1 + peer_id.len()].copy_from_slice(peer_id);
        let passwd_off = 1 + peer_id.len();
        buf.chunk_mut()[passwd_off] = passwd.len() as u8;
        buf.chunk_mut()[passwd_off + 1..passwd_off + 1 + passwd.len()].copy_from_slice(passwd);

        buf.move_back(PAP_HEADER_LEN);
        buf.chunk_mut()[0] = u8::from(PapCode::AUTH_REQUEST);
        buf.chunk_mut()[1] = identifier;
        NetworkEndian::write_u16(&mut buf.chunk_mut()[2..4], (PAP_HEADER_LEN + body_len) as u16);
        Self { buf }
    }

    /// Build an Authenticate-Ack/Nak into `buf`, which must already hold
    /// `message.len()` bytes of headroom beyond the header.
    pub fn build_reply(mut buf: T, code: PapCode, identifier: u8, message: &[u8]) -> Self {
        assert_ne!(code, PapCode::AUTH_REQUEST);
        assert!(message.len() <= 250);
        let body_len = 1 + message.len();
        assert!(buf.chunk_headroom() >= PAP_HEADER_LEN + body_len);
        buf.move_back(body_len);
        buf.chunk_mut()[0] = message.len() as u8;
        buf.chunk_mut()[1..1 + message.len()].copy_from_slice(message);

        buf.move_back(PAP_HEADER_LEN);
        buf.chunk_mut()[0] = u8::from(code);
        buf.chunk_mut()[1] = identifier;
        NetworkEndian::write_u16(&mut buf.chunk_mut()[2..4], (PAP_HEADER_LEN + body_len) as u16);
        Self { buf }
    }
}

impl<'a> PapPacket<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PAP_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < PAP_HEADER_LEN
            || (container.length() as usize) > remaining_len
        {
            return Err(container.buf);
        }
        Ok(container)
    }
}

impl<'a> PapPacket<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < PAP_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < PAP_HEADER_LEN
            || (container.length() as usize) > remaining_len
        {
            return Err(container.buf);
        }
        Ok(container)
    }
}
