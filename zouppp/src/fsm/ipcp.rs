//! Default IPCP own-option and peer-option rules (spec §4.3, RFC 1332).
//!
//! We only ever propose IP-Address; everything the server might additionally
//! hand us (DNS/NBNS, RFC 1877) we accept if offered but never request.

use std::net::Ipv4Addr;

use zpkt::ppp::options::IpcpOptionType;

use super::{OwnOptionRule, PeerOptionRule, ReqVerdict, WireOption};

pub struct IpcpOwnRule {
    address: Ipv4Addr,
    rejected: std::collections::HashSet<u8>,
}

impl IpcpOwnRule {
    pub fn new() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            rejected: std::collections::HashSet::new(),
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }
}

impl Default for IpcpOwnRule {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnOptionRule for IpcpOwnRule {
    fn get_options(&self) -> Vec<WireOption> {
        if self.rejected.contains(&u8::from(IpcpOptionType::IP_ADDRESS)) {
            return Vec::new();
        }
        vec![WireOption {
            option_type: u8::from(IpcpOptionType::IP_ADDRESS),
            value: self.address.octets().to_vec(),
        }]
    }

    fn handle_conf_rej(&mut self, options: &[WireOption]) {
        for opt in options {
            self.rejected.insert(opt.option_type);
        }
    }

    fn handle_conf_nak(&mut self, options: &[WireOption]) {
        for opt in options {
            if opt.option_type == u8::from(IpcpOptionType::IP_ADDRESS) && opt.value.len() == 4 {
                self.address = Ipv4Addr::new(opt.value[0], opt.value[1], opt.value[2], opt.value[3]);
            }
        }
    }
}

/// Accepts IP-Address unmodified; rejects everything else (the client has no
/// address to hand the peer, and doesn't implement IP-Compression-Protocol).
pub struct IpcpPeerRule {
    last_seen: Vec<WireOption>,
}

impl IpcpPeerRule {
    pub fn new() -> Self {
        Self {
            last_seen: Vec::new(),
        }
    }
}

impl Default for IpcpPeerRule {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerOptionRule for IpcpPeerRule {
    fn handle_conf_req(&mut self, options: &[WireOption]) -> ReqVerdict {
        self.last_seen = options.to_vec();
        let mut verdict = ReqVerdict::default();
        for opt in options {
            if opt.option_type == u8::from(IpcpOptionType::IP_ADDRESS) {
                verdict.ack.push(opt.clone());
            } else {
                verdict.reject.push(opt.clone());
            }
        }
        verdict
    }

    fn last_seen_options(&self) -> Vec<WireOption> {
        self.last_seen.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_rule_adopts_nak_address() {
        let mut rule = IpcpOwnRule::new();
        rule.handle_conf_nak(&[WireOption {
            option_type: u8::from(IpcpOptionType::IP_ADDRESS),
            value: vec![198, 51, 100, 7],
        }]);
        assert_eq!(rule.address(), Ipv4Addr::new(198, 51, 100, 7));
        assert_eq!(rule.get_options()[0].value, vec![198, 51, 100, 7]);
    }

    #[test]
    fn peer_rule_rejects_unknown_options() {
        let mut rule = IpcpPeerRule::new();
        let verdict = rule.handle_conf_req(&[WireOption {
            option_type: u8::from(IpcpOptionType::PRIMARY_DNS),
            value: vec![0, 0, 0, 0],
        }]);
        assert_eq!(verdict.reject.len(), 1);
        assert!(verdict.ack.is_empty());
    }
}
