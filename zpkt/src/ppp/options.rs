//! Option TLVs carried in the body of a Configure-Request/Ack/Nak/Reject
//! control packet (RFC 1661 §6): a 1-byte type, a 1-byte length covering the
//! type/length/value together, and a value of `length - 2` bytes.
//!
//! The three control protocols this client runs (LCP, IPCP, IPv6CP) each
//! define their own option type numbering; [`LcpOptionType`], [`IpcpOptionType`],
//! and [`Ipv6cpOptionType`] give each table a name while sharing the single
//! [`ControlOption`] wire view and [`ControlOptionIter`]/[`ControlOptionIterMut`]
//! walkers.

use crate::{Buf, PktBuf, PktBufMut};
use crate::{Cursor, CursorMut};

enum_sim! {
    /// LCP option types (RFC 1661 §6).
    pub struct LcpOptionType (u8) {
        /// Maximum-Receive-Unit.
        MRU = 1,
        /// Authentication-Protocol.
        AUTH_PROTOCOL = 3,
        /// Quality-Protocol.
        QUALITY_PROTOCOL = 4,
        /// Magic-Number.
        MAGIC_NUMBER = 5,
        /// Protocol-Field-Compression.
        PROTOCOL_FIELD_COMPRESSION = 7,
        /// Address-and-Control-Field-Compression.
        ADDR_CONTROL_FIELD_COMPRESSION = 8
    }
}

enum_sim! {
    /// IPCP option types (RFC 1332 §3).
    pub struct IpcpOptionType (u8) {
        /// IP-Addresses (deprecated, RFC 1172 form).
        IP_ADDRESSES = 1,
        /// IP-Compression-Protocol.
        IP_COMPRESSION_PROTOCOL = 2,
        /// IP-Address.
        IP_ADDRESS = 3,
        /// Primary-DNS-Server-Address (RFC 1877).
        PRIMARY_DNS = 129,
        /// Primary-NBNS-Server-Address (RFC 1877).
        PRIMARY_NBNS = 130,
        /// Secondary-DNS-Server-Address (RFC 1877).
        SECONDARY_DNS = 131,
        /// Secondary-NBNS-Server-Address (RFC 1877).
        SECONDARY_NBNS = 132
    }
}

enum_sim! {
    /// IPv6CP option types (RFC 5072 §4).
    pub struct Ipv6cpOptionType (u8) {
        /// Interface-Identifier.
        INTERFACE_IDENTIFIER = 1,
        /// IPv6-Compression-Protocol.
        IPV6_COMPRESSION_PROTOCOL = 2
    }
}

/// The fixed byte length of an option's type+length prefix.
pub const OPTION_HEADER_LEN: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct ControlOption<T> {
    buf: T,
}

impl<T: Buf> ControlOption<T> {
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
        if buf.chunk().len() < OPTION_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if container.option_len() < OPTION_HEADER_LEN
            || container.option_len() > container.buf.remaining()
        {
            return Err(container.buf);
        }
        Ok(container)
    }
    #[inline]
    pub fn option_type(&self) -> u8 {
        self.buf.chunk()[0]
    }
    #[inline]
    pub fn option_len(&self) -> usize {
        self.buf.chunk()[1] as usize
    }
    #[inline]
    pub fn value_slice(&self) -> &[u8] {
        &self.buf.chunk()[OPTION_HEADER_LEN..self.option_len()]
    }
}

impl<T: PktBuf> ControlOption<T> {
    #[inline]
    pub fn payload(self) -> T {
        let option_len = self.option_len();
        let mut buf = self.buf;
        buf.advance(option_len);
        buf
    }
}

impl<T: PktBufMut> ControlOption<T> {
    /// Prepend a type/length header for a value of `value_len` bytes already
    /// sitting at the front of `buf`.
    #[inline]
    pub fn prepend_header(mut buf: T, option_type: u8, value_len: usize) -> Self {
        assert!(value_len + OPTION_HEADER_LEN <= 255);
        assert!(buf.chunk_headroom() >= OPTION_HEADER_LEN);
        buf.move_back(OPTION_HEADER_LEN);
        buf.chunk_mut()[0] = option_type;
        buf.chunk_mut()[1] = (value_len + OPTION_HEADER_LEN) as u8;
        Self { buf }
    }
    #[inline]
    pub fn value_slice_mut(&mut self) -> &mut [u8] {
        let option_len = self.option_len();
        &mut self.buf.chunk_mut()[OPTION_HEADER_LEN..option_len]
    }
}

impl<'a> ControlOption<Cursor<'a>> {
    #[inline]
    pub fn parse_from_cursor(buf: Cursor<'a>) -> Result<Self, Cursor<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < OPTION_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if container.option_len() < OPTION_HEADER_LEN || container.option_len() > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
}

impl<'a> ControlOption<CursorMut<'a>> {
    #[inline]
    pub fn parse_from_cursor_mut(buf: CursorMut<'a>) -> Result<Self, CursorMut<'a>> {
        let remaining_len = buf.chunk().len();
        if remaining_len < OPTION_HEADER_LEN {
            return Err(buf);
        }
        let container = Self { buf };
        if container.option_len() < OPTION_HEADER_LEN || container.option_len() > remaining_len {
            return Err(container.buf);
        }
        Ok(container)
    }
}

/// Walks a Configure-Request/Ack/Nak/Reject body as a run of [`ControlOption`]
/// TLVs, stopping after [`super::control::MAX_OPTIONS`] to bound malformed input.
#[derive(Debug, Clone, Copy)]
pub struct ControlOptionIter<'a> {
    buf: &'a [u8],
    yielded: usize,
}

impl<'a> ControlOptionIter<'a> {
    pub fn from_body_slice(body: &'a [u8]) -> Self {
        Self {
            buf: body,
            yielded: 0,
        }
    }
}

impl<'a> Iterator for ControlOptionIter<'a> {
    type Item = ControlOption<Cursor<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() || self.yielded >= super::control::MAX_OPTIONS {
            return None;
        }
        ControlOption::parse(self.buf).ok().map(|opt| {
            let option_len = opt.option_len();
            let result = ControlOption {
                buf: Cursor::new(&self.buf[..option_len]),
            };
            self.buf = &self.buf[option_len..];
            self.yielded += 1;
            result
        })
    }
}

/// Mutable counterpart of [`ControlOptionIter`], for rewriting options in place.
#[derive(Debug)]
pub struct ControlOptionIterMut<'a> {
    buf: &'a mut [u8],
    yielded: usize,
}

impl<'a> ControlOptionIterMut<'a> {
    pub fn from_body_slice_mut(body: &'a mut [u8]) -> Self {
        Self {
            buf: body,
            yielded: 0,
        }
    }
}

impl<'a> Iterator for ControlOptionIterMut<'a> {
    type Item = ControlOption<CursorMut<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() || self.yielded >= super::control::MAX_OPTIONS {
            return None;
        }
        match ControlOption::parse(&self.buf[..]) {
            Ok(opt) => {
                let option_len = opt.option_len();
                let (fst, snd) = std::mem::take(&mut self.buf).split_at_mut(option_len);
                self.buf = snd;
                self.yielded += 1;
                Some(ControlOption {
                    buf: CursorMut::new(fst),
                })
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterate_mru_and_auth_proto() {
        let bytes: [u8; 8] = [0x01, 0x04, 0x05, 0xf4, 0x03, 0x04, 0xc0, 0x23];
        let mut iter = ControlOptionIter::from_body_slice(&bytes);
        let mru = iter.next().unwrap();
        assert_eq!(mru.option_type(), u8::from(LcpOptionType::MRU));
        assert_eq!(mru.value_slice(), &[0x05, 0xf4]);
        let auth = iter.next().unwrap();
        assert_eq!(auth.option_type(), u8::from(LcpOptionType::AUTH_PROTOCOL));
        assert_eq!(auth.value_slice(), &[0xc0, 0x23]);
        assert!(iter.next().is_none());
    }

    #[test]
    fn stops_at_max_options_on_zero_length_garbage() {
        let bytes = [0x00u8; 4];
        let iter = ControlOptionIter::from_body_slice(&bytes);
        assert_eq!(iter.count(), 0);
    }
}
