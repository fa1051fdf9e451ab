use bytes::Buf;

use crate::{PktBuf, PktBufMut};

/// A read cursor over a byte slice that remembers how far it has advanced.
///
/// Unlike a plain `&[u8]`, a `Cursor` can move back over bytes it already
/// advanced past (`move_back`), which is how packet views walk outward from an
/// inner header back to an outer one without re-slicing from scratch.
#[derive(Debug)]
pub struct Cursor<'a> {
    chunk: &'a [u8],
    start_addr: *const u8,
}

impl<'a> Cursor<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor {
            chunk: buf,
            start_addr: buf.as_ptr(),
        }
    }

    #[inline]
    pub fn buf(&self) -> &'a [u8] {
        unsafe { std::slice::from_raw_parts(self.start_addr, self.cursor() + self.chunk.len()) }
    }

    #[inline]
    pub fn chunk_shared_lifetime(&self) -> &'a [u8] {
        self.chunk
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        unsafe { self.chunk.as_ptr().offset_from(self.start_addr) as usize }
    }
}

impl<'a> Buf for Cursor<'a> {
    #[inline]
    fn remaining(&self) -> usize {
        self.chunk.len()
    }

    #[inline]
    fn chunk(&self) -> &[u8] {
        self.chunk
    }

    #[inline]
    fn advance(&mut self, cnt: usize) {
        assert!(cnt <= self.chunk.len());
        self.chunk = &self.chunk[cnt..];
    }
}

impl<'a> PktBuf for Cursor<'a> {
    #[inline]
    fn move_back(&mut self, cnt: usize) {
        assert!(cnt <= self.cursor());
        self.chunk = unsafe {
            std::slice::from_raw_parts(self.chunk.as_ptr().sub(cnt), self.chunk.len() + cnt)
        };
    }

    #[inline]
    fn trim_off(&mut self, cnt: usize) {
        assert!(cnt <= self.chunk.len());
        self.chunk = &self.chunk[..(self.chunk.len() - cnt)];
    }
}

/// A write cursor over a mutable byte slice, with the same move-back ability
/// as `Cursor` so headers can be prepended outward-in.
#[derive(Debug)]
pub struct CursorMut<'a> {
    chunk: &'a mut [u8],
    start_addr: *const u8,
}

impl<'a> CursorMut<'a> {
    #[inline]
    pub fn new(buf: &'a mut [u8]) -> Self {
        let start_addr = buf.as_mut_ptr();
        CursorMut {
            chunk: buf,
            start_addr,
        }
    }

    #[inline]
    pub fn buf(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.start_addr, self.cursor() + self.chunk.len()) }
    }

    #[inline]
    pub fn chunk_mut_shared_lifetime(self) -> &'a mut [u8] {
        self.chunk
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        unsafe { self.chunk.as_ptr().offset_from(self.start_addr) as usize }
    }
}

impl<'a> Buf for CursorMut<'a> {
    #[inline]
    fn remaining(&self) -> usize {
        self.chunk.len()
    }

    #[inline]
    fn chunk(&self) -> &[u8] {
        self.chunk
    }

    #[inline]
    fn advance(&mut self, cnt: usize) {
        assert!(cnt <= self.chunk.len());
        self.chunk = unsafe {
            std::slice::from_raw_parts_mut(self.chunk.as_mut_ptr().add(cnt), self.chunk.len() - cnt)
        };
    }
}

impl<'a> PktBuf for CursorMut<'a> {
    #[inline]
    fn move_back(&mut self, cnt: usize) {
        assert!(cnt <= self.cursor());
        self.chunk = unsafe {
            std::slice::from_raw_parts_mut(self.chunk.as_mut_ptr().sub(cnt), self.chunk.len() + cnt)
        };
    }

    #[inline]
    fn trim_off(&mut self, cnt: usize) {
        assert!(cnt <= self.remaining());
        self.chunk = unsafe {
            std::slice::from_raw_parts_mut(self.chunk.as_mut_ptr(), self.chunk.len() - cnt)
        };
    }
}

impl<'a> PktBufMut for CursorMut<'a> {
    #[inline]
    fn chunk_mut(&mut self) -> &mut [u8] {
        self.chunk
    }

    #[inline]
    fn chunk_headroom(&self) -> usize {
        self.cursor()
    }
}
