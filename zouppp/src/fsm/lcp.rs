//! Default LCP own-option and peer-option rules (spec §4.3).
//!
//! Own side: we propose MRU and Magic-Number. We never propose
//! Authentication-Protocol ourselves — it's the server that tells us which
//! authenticator it wants via its own Configure-Request, which our
//! peer-option rule inspects and records.

use zpkt::ppp::options::LcpOptionType;

use super::{OwnOptionRule, PeerOptionRule, ReqVerdict, WireOption};
use crate::config::AuthProto;

const DEFAULT_MRU: u16 = 1500;

/// Wire values of the LCP Authentication-Protocol option (RFC 1334 §2,
/// RFC 1994 §2): PAP is a bare 2-byte protocol number, CHAP adds a 1-byte
/// algorithm (5 = MD5).
const AUTH_PROTOCOL_PAP: [u8; 2] = [0xc0, 0x23];
const AUTH_PROTOCOL_CHAP_MD5: [u8; 3] = [0xc2, 0x23, 0x05];

pub struct LcpOwnRule {
    mru: u16,
    magic_number: u32,
    rejected: std::collections::HashSet<u8>,
}

impl LcpOwnRule {
    pub fn new(magic_number: u32) -> Self {
        Self {
            mru: DEFAULT_MRU,
            magic_number,
            rejected: std::collections::HashSet::new(),
        }
    }

    pub fn mru(&self) -> u16 {
        self.mru
    }
}

impl OwnOptionRule for LcpOwnRule {
    fn get_options(&self) -> Vec<WireOption> {
        let mut options = Vec::new();
        if !self.rejected.contains(&u8::from(LcpOptionType::MRU)) {
            options.push(WireOption {
                option_type: u8::from(LcpOptionType::MRU),
                value: self.mru.to_be_bytes().to_vec(),
            });
        }
        if !self.rejected.contains(&u8::from(LcpOptionType::MAGIC_NUMBER)) {
            options.push(WireOption {
                option_type: u8::from(LcpOptionType::MAGIC_NUMBER),
                value: self.magic_number.to_be_bytes().to_vec(),
            });
        }
        options
    }

    fn handle_conf_rej(&mut self, options: &[WireOption]) {
        for opt in options {
            self.rejected.insert(opt.option_type);
        }
    }

    fn handle_conf_nak(&mut self, options: &[WireOption]) {
        for opt in options {
            if opt.option_type == u8::from(LcpOptionType::MRU) && opt.value.len() == 2 {
                self.mru = u16::from_be_bytes([opt.value[0], opt.value[1]]);
            } else if opt.option_type == u8::from(LcpOptionType::MAGIC_NUMBER) && opt.value.len() == 4 {
                self.magic_number =
                    u32::from_be_bytes([opt.value[0], opt.value[1], opt.value[2], opt.value[3]]);
            }
        }
    }
}

/// Evaluates the peer's (the access concentrator's) Configure-Request. The
/// required authenticator is fixed at construction from configuration; any
/// Authentication-Protocol option the peer proposes that doesn't match is
/// Naked with the one we actually support.
pub struct LcpPeerRule {
    required_auth: AuthProto,
    last_seen: Vec<WireOption>,
}

impl LcpPeerRule {
    pub fn new(required_auth: AuthProto) -> Self {
        Self {
            required_auth,
            last_seen: Vec::new(),
        }
    }

    fn required_auth_value(&self) -> Vec<u8> {
        match self.required_auth {
            AuthProto::Pap => AUTH_PROTOCOL_PAP.to_vec(),
            AuthProto::Chap => AUTH_PROTOCOL_CHAP_MD5.to_vec(),
        }
    }
}

impl PeerOptionRule for LcpPeerRule {
    fn handle_conf_req(&mut self, options: &[WireOption]) -> ReqVerdict {
        self.last_seen = options.to_vec();
        let mut verdict = ReqVerdict::default();
        for opt in options {
            if opt.option_type == u8::from(LcpOptionType::MRU)
                || opt.option_type == u8::from(LcpOptionType::MAGIC_NUMBER)
            {
                verdict.ack.push(opt.clone());
            } else if opt.option_type == u8::from(LcpOptionType::AUTH_PROTOCOL) {
                let wanted = self.required_auth_value();
                if opt.value == wanted {
                    verdict.ack.push(opt.clone());
                } else {
                    verdict.nak.push(WireOption {
                        option_type: opt.option_type,
                        value: wanted,
                    });
                }
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
    fn own_rule_drops_rejected_option_from_future_offers() {
        let mut rule = LcpOwnRule::new(0xdead_beef);
        assert_eq!(rule.get_options().len(), 2);
        rule.handle_conf_rej(&[WireOption {
            option_type: u8::from(LcpOptionType::MRU),
            value: vec![],
        }]);
        let options = rule.get_options();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].option_type, u8::from(LcpOptionType::MAGIC_NUMBER));
    }

    #[test]
    fn peer_rule_naks_mismatched_auth_protocol() {
        let mut rule = LcpPeerRule::new(AuthProto::Chap);
        let verdict = rule.handle_conf_req(&[WireOption {
            option_type: u8::from(LcpOptionType::AUTH_PROTOCOL),
            value: AUTH_PROTOCOL_PAP.to_vec(),
        }]);
        assert_eq!(verdict.nak.len(), 1);
        assert_eq!(verdict.nak[0].value, AUTH_PROTOCOL_CHAP_MD5.to_vec());
    }

    #[test]
    fn peer_rule_acks_matching_auth_protocol() {
        let mut rule = LcpPeerRule::new(AuthProto::Pap);
        let verdict = rule.handle_conf_req(&[WireOption {
            option_type: u8::from(LcpOptionType::AUTH_PROTOCOL),
            value: AUTH_PROTOCOL_PAP.to_vec(),
        }]);
        assert_eq!(verdict.ack.len(), 1);
        assert!(verdict.nak.is_empty());
    }
}
