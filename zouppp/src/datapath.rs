//! The OS data-path adapter interface (spec §6): external virtual-interface
//! creation, address/route installation. This crate defines the trait and a
//! logging no-op implementation only; a Linux TUN-backed adapter is not
//! implemented here (see `original_source/` note in the design ledger).

use std::net::Ipv4Addr;

use tracing::info;

/// Registers IPv4/IPv6 sinks/sources with the PPP mux and relays between them
/// and an OS virtual interface once a session reaches Open. Constructed with
/// the negotiated MRU and addresses per §4.5 step 7.
pub trait DatapathAdapter: Send + Sync {
    /// Called once, when the supervisor's session reaches Open.
    fn on_session_up(&self, ctx: &DatapathContext);

    /// Called when the supervisor's session closes.
    fn on_session_down(&self);
}

/// The negotiated parameters handed to a [`DatapathAdapter`] on session-up.
#[derive(Debug, Clone)]
pub struct DatapathContext {
    /// The interface name this adapter should create, already `@ID`-substituted.
    pub ifname: String,
    /// Negotiated LCP MRU (default 1498 if the peer never Naked it).
    pub mru: u16,
    /// Own IPv4 address from IPCP, if IPv4 was enabled and negotiated.
    pub ipv4: Option<Ipv4Addr>,
    /// Own IPv6 Interface-Identifier from IPv6CP, if IPv6 was enabled.
    pub ipv6_ifid: Option<[u8; 8]>,
}

/// A [`DatapathAdapter`] that only logs; installs nothing. The default when
/// `apply` is not set in configuration.
#[derive(Debug, Default)]
pub struct LoggingDatapath;

impl DatapathAdapter for LoggingDatapath {
    fn on_session_up(&self, ctx: &DatapathContext) {
        info!(
            ifname = %ctx.ifname,
            mru = ctx.mru,
            ipv4 = ?ctx.ipv4,
            ipv6_ifid = ?ctx.ipv6_ifid.map(hex_ifid),
            "session open, datapath not installed (no-op adapter)"
        );
    }

    fn on_session_down(&self) {
        info!("session closed, datapath no-op teardown");
    }
}

fn hex_ifid(ifid: [u8; 8]) -> String {
    ifid.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_adapter_does_not_panic() {
        let adapter = LoggingDatapath;
        adapter.on_session_up(&DatapathContext {
            ifname: "ppp0".into(),
            mru: 1492,
            ipv4: Some(Ipv4Addr::new(192, 0, 2, 2)),
            ipv6_ifid: Some([0; 8]),
        });
        adapter.on_session_down();
    }
}
