//! The control packet shape shared by LCP, IPCP, and IPv6CP (RFC 1661 §5).
//!
//! Every control packet starts with a 4-byte header: a 1-byte code, a
//! 1-byte identifier used to match requests to replies, and a 2-byte length
//! covering the header plus whatever follows. What follows depends on
//! `code`:
//!
//! - Configure-Request/Ack/Nak/Reject: a run of option TLVs ([`super::options`]).
//! - Echo-Request/Echo-Reply/Discard-Request: a 4-byte magic number then opaque data.
//! - Protocol-Reject: a 2-byte rejected protocol number then the rejected packet.
//! - Terminate-Request/Ack, Code-Reject: opaque data.

use byteorder::{ByteOrder, NetworkEndian};

use super::PppProtocol;
use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

/// The maximum number of options this implementation will parse out of a
/// single Configure-Request/Ack/Nak/Reject packet before giving up, matching
/// the loop guard the reference client uses against malformed peers.
pub const MAX_OPTIONS: usize = 32;

enum_sim! {
    /// LCP/IPCP/IPv6CP control packet codes (RFC 1661 §5, Table 2).
    pub struct ControlCode (u8) {
        /// Configure-Request.
        CONFIGURE_REQUEST = 1,
        /// Configure-Ack.
        CONFIGURE_ACK = 2,
        /// Configure-Nak.
        CONFIGURE_NAK = 3,
        /// Configure-Reject.
        CONFIGURE_REJECT = 4,
        /// Terminate-Request.
        TERMINATE_REQUEST = 5,
        /// Terminate-Ack.
        TERMINATE_ACK = 6,
        /// Code-Reject.
        CODE_REJECT = 7,
        /// Protocol-Reject (LCP only).
        PROTOCOL_REJECT = 8,
        /// Echo-Request (LCP only).
        ECHO_REQUEST = 9,
        /// Echo-Reply (LCP only).
        ECHO_REPLY = 10,
        /// Discard-Request (LCP only).
        DISCARD_REQUEST = 11
    }
}

/// The fixed byte length of the shared control header.
pub const CONTROL_HEADER_LEN: usize = 4;
/// A template control header (Configure-Request, identifier/length zeroed).
pub const CONTROL_HEADER_TEMPLATE: [u8; 4] = [0x01, 0x00, 0x00, 0x04];

#[derive(Debug, Clone, Copy)]
pub struct Control<T> {
    buf: T,
}

impl<T: Buf> Control<T> {
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
        if buf.chunk().len() < CONTROL_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < CONTROL_HEADER_LEN
            || (container.length() as usize) > container.buf.remaining()
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn header_slice(&self) -> &[u8] {
        &self.buf.chunk()[0..CONTROL_HEADER_LEN]
    }
    #[inline]
    pub fn code(&self) -> ControlCode {
        ControlCode::from(self.buf.chunk()[0])
    }
    #[inline]
    pub fn identifier(&self) -> u8 {
        self.buf.chunk()[1]
    }
    #[inline]
    pub fn length(&self) -> u16 {
        NetworkEndian::read_u16(&self.buf.chunk()[2..4])
    }
    /// The body after the 4-byte header: option TLVs, magic-number+data, or
    /// opaque data, depending on `code`. Trimmed to `length`.
    #[inline]
    pub fn body_slice(&self) -> &[u8] {
        &self.buf.chunk()[CONTROL_HEADER_LEN..self.length() as usize]
    }
    /// The 4-byte magic number carried by Echo-Request/Echo-Reply/Discard-Request.
    ///
    /// # Panics
    /// Panics if `body_slice()` is shorter than 4 bytes.
    #[inline]
    pub fn magic_number(&self) -> u32 {
        NetworkEndian::read_u32(&self.body_slice()[0..4])
    }
    /// The data following the magic number in an echo-family packet.
    #[inline]
    pub fn echo_data(&self) -> &[u8] {
        &self.body_slice()[4..]
    }
    /// The rejected protocol number carried by a Protocol-Reject packet.
    #[inline]
    pub fn rejected_protocol(&self) -> PppProtocol {
        PppProtocol::from(NetworkEndian::read_u16(&self.body_slice()[0..2]))
    }
    /// The rejected packet's own bytes, following the 2-byte protocol number
    /// in a Protocol-Reject packet.
    #[inline]
    pub fn rejected_information(&self) -> &[u8] {
        &self.body_slice()[2..]
    }
}

impl<T: PktBuf> Control<T> {
    #[inline]
    pub fn payload(self) -> T {
        let total_len = self.length() as usize;
        assert!(total_len <= self.buf.remaining());
        let trim_size = self.buf.remaining() - total_len;
        let mut buf = self.buf;
        if trim_size > 0 {
            buf.trim_off(trim_size);
        }
        buf.advance(CONTROL_HEADER_LEN);
        buf
    }
}

impl<T: PktBufMut> Control<T> {
    #[inline]
    pub fn prepend_header<'a>(mut buf: T, header: &'a [u8; CONTROL_HEADER_LEN]) -> Self {
        assert!(buf.chunk_headroom() >= CONTROL_HEADER_LEN);
        let total_len = buf.remaining() + CONTROL_HEADER_LEN;
        assert!(total_len <= 65535);
        buf.move_back(CONTROL_HEADER_LEN);
        buf.chunk_mut()[0..CONTROL_HEADER_LEN].copy_from_slice(&header[..]);
        let mut container = Self { buf };
        container.set_length(total_len as u16);
        container
    }
    #[inline]
    pub fn set_code(&mut self, value: ControlCode) {
        self.buf.chunk_mut()[0] = u8::from(value);
    }
    #[inline]
    pub fn set_identifier(&mut self, value: u8) {
        self.buf.chunk_mut()[1] = value;
    }
    #[inline]
    pub fn set_length(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buf.chunk_mut()[2..4], value);
    }
}

impl<'a> Control<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < CONTROL_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < CONTROL_HEADER_LEN
            || (container.length() as usize) > remaining_len
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor(&self) -> Cursor<'_> {
        let total_len = self.length() as usize;
        Cursor::new(&self.buf.chunk()[CONTROL_HEADER_LEN..total_len])
    }
}

impl<'a> Control<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < CONTROL_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if (container.length() as usize) < CONTROL_HEADER_LEN
            || (container.length() as usize) > remaining_len
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn payload_as_cursor_mut(&mut self) -> CursorMut<'_> {
        let total_len = self.length() as usize;
        CursorMut::new(&mut self.buf.chunk_mut()[CONTROL_HEADER_LEN..total_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cursor;

    #[test]
    fn parse_configure_request_header() {
        let bytes: [u8; 8] = [0x01, 0x07, 0x00, 0x08, 0x01, 0x04, 0x05, 0xf4];
        let pkt = Control::parse(Cursor::new(&bytes[..])).unwrap();
        assert_eq!(pkt.code(), ControlCode::CONFIGURE_REQUEST);
        assert_eq!(pkt.identifier(), 7);
        assert_eq!(pkt.length(), 8);
        assert_eq!(pkt.body_slice(), &[0x01, 0x04, 0x05, 0xf4]);
    }

    #[test]
    fn parse_echo_request() {
        let bytes: [u8; 12] = [
            0x09, 0x01, 0x00, 0x0c, 0xde, 0xad, 0xbe, 0xef, 0xaa, 0xbb, 0xcc, 0xdd,
        ];
        let pkt = Control::parse(Cursor::new(&bytes[..])).unwrap();
        assert_eq!(pkt.code(), ControlCode::ECHO_REQUEST);
        assert_eq!(pkt.magic_number(), 0xdead_beef);
        assert_eq!(pkt.echo_data(), &[0xaa, 0xbb, 0xcc, 0xdd]);
    }

    #[test]
    fn parse_protocol_reject() {
        let bytes: [u8; 8] = [0x08, 0x02, 0x00, 0x08, 0xc0, 0x23, 0x11, 0x22];
        let pkt = Control::parse(Cursor::new(&bytes[..])).unwrap();
        assert_eq!(pkt.code(), ControlCode::PROTOCOL_REJECT);
        assert_eq!(pkt.rejected_protocol(), PppProtocol::PAP);
        assert_eq!(pkt.rejected_information(), &[0x11, 0x22]);
    }

    #[test]
    fn rejects_length_shorter_than_header() {
        let bytes: [u8; 4] = [0x05, 0x01, 0x00, 0x02];
        assert!(Control::parse(Cursor::new(&bytes[..])).is_err());
    }
}
