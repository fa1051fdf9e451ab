#![warn(missing_debug_implementations, rust_2018_idioms)]

//! Zero-copy parsing and construction of the wire formats this codebase's PPPoE
//! client needs: Ethernet II framing, 802.1Q/802.1ad VLAN stacking, PPPoE
//! discovery/session framing, and the PPP/LCP/IPCP/IPv6CP/PAP/CHAP packet
//! family defined by RFC 1661/1332/5072/1334/1994.
//!
//! The cursor/trait split (`Cursor`/`CursorMut` over the `Buf`/`PktBuf`/
//! `PktBufMut` traits) lets every packet view borrow directly from the
//! underlying buffer instead of copying into intermediate structs.

#[macro_use]
mod macros;

mod traits;
pub use traits::{Buf, PktBuf, PktBufMut};

mod cursors;
pub use cursors::{Cursor, CursorMut};

pub mod network_rw;

pub mod ether;
pub mod ppp;
pub mod pppoe;
pub mod vlan;

#[allow(unused)]
mod endian;
