//! Default IPv6CP own-option and peer-option rules (spec §4.3, RFC 5072).
//!
//! Interface-Identifiers are derived per RFC 7217: the first 8 bytes of
//! `SHA-256(fe80::/64 ∥ local_MAC ∥ dup_counter ∥ secret_key)`. `dup_counter`
//! starts at zero and is bumped each time a fresh identifier is needed, e.g.
//! after the peer Naks ours as colliding with its own.

use sha2::{Digest, Sha256};
use zpkt::ether::EtherAddr;
use zpkt::ppp::options::Ipv6cpOptionType;

use super::{OwnOptionRule, PeerOptionRule, ReqVerdict, WireOption};

const LINK_LOCAL_PREFIX: [u8; 8] = [0xfe, 0x80, 0, 0, 0, 0, 0, 0];

pub fn derive_interface_id(mac: EtherAddr, dup_counter: u32, secret_key: &[u8]) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(LINK_LOCAL_PREFIX);
    hasher.update(mac.as_bytes());
    hasher.update(dup_counter.to_be_bytes());
    hasher.update(secret_key);
    let digest = hasher.finalize();
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    id
}

pub struct Ipv6cpOwnRule {
    mac: EtherAddr,
    secret_key: Vec<u8>,
    dup_counter: u32,
    identifier: [u8; 8],
    rejected: std::collections::HashSet<u8>,
}

impl Ipv6cpOwnRule {
    pub fn new(mac: EtherAddr, secret_key: Vec<u8>) -> Self {
        let identifier = derive_interface_id(mac, 0, &secret_key);
        Self {
            mac,
            secret_key,
            dup_counter: 0,
            identifier,
            rejected: std::collections::HashSet::new(),
        }
    }

    pub fn identifier(&self) -> [u8; 8] {
        self.identifier
    }
}

impl OwnOptionRule for Ipv6cpOwnRule {
    fn get_options(&self) -> Vec<WireOption> {
        if self.rejected.contains(&u8::from(Ipv6cpOptionType::INTERFACE_IDENTIFIER)) {
            return Vec::new();
        }
        vec![WireOption {
            option_type: u8::from(Ipv6cpOptionType::INTERFACE_IDENTIFIER),
            value: self.identifier.to_vec(),
        }]
    }

    fn handle_conf_rej(&mut self, options: &[WireOption]) {
        for opt in options {
            self.rejected.insert(opt.option_type);
        }
    }

    fn handle_conf_nak(&mut self, options: &[WireOption]) {
        for opt in options {
            if opt.option_type == u8::from(Ipv6cpOptionType::INTERFACE_IDENTIFIER) && opt.value.len() == 8 {
                let mut id = [0u8; 8];
                id.copy_from_slice(&opt.value);
                self.identifier = id;
            }
        }
    }
}

impl Ipv6cpOwnRule {
    /// Re-derive a fresh identifier with an incremented `dup_counter`, for use
    /// when the peer signals a collision outside the ordinary Nak path.
    pub fn restart_with_fresh_id(&mut self) {
        self.dup_counter += 1;
        self.identifier = derive_interface_id(self.mac, self.dup_counter, &self.secret_key);
    }
}

pub struct Ipv6cpPeerRule {
    own_identifier: [u8; 8],
    mac: EtherAddr,
    secret_key: Vec<u8>,
    dup_counter: u32,
    last_seen: Vec<WireOption>,
}

impl Ipv6cpPeerRule {
    pub fn new(own_identifier: [u8; 8], mac: EtherAddr, secret_key: Vec<u8>) -> Self {
        Self {
            own_identifier,
            mac,
            secret_key,
            dup_counter: 1,
            last_seen: Vec::new(),
        }
    }
}

impl PeerOptionRule for Ipv6cpPeerRule {
    fn handle_conf_req(&mut self, options: &[WireOption]) -> ReqVerdict {
        self.last_seen = options.to_vec();
        let mut verdict = ReqVerdict::default();
        for opt in options {
            if opt.option_type != u8::from(Ipv6cpOptionType::INTERFACE_IDENTIFIER) {
                verdict.reject.push(opt.clone());
                continue;
            }
            if opt.value.iter().all(|b| *b == 0) {
                let fresh = derive_interface_id(self.mac, self.dup_counter, &self.secret_key);
                self.dup_counter += 1;
                verdict.nak.push(WireOption {
                    option_type: opt.option_type,
                    value: fresh.to_vec(),
                });
            } else if opt.value == self.own_identifier {
                let mut distinguished = self.own_identifier;
                *distinguished.last_mut().unwrap() ^= 0xff;
                verdict.nak.push(WireOption {
                    option_type: opt.option_type,
                    value: distinguished.to_vec(),
                });
            } else {
                verdict.ack.push(opt.clone());
            }
        }
        verdict
    }

    fn last_seen_options(&self) -> Vec<WireOption> {
        self.last_seen.clone()
    }
}
