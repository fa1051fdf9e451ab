//! The recognized configuration surface (spec §6) and the `@ID` substitution
//! helper. File loading itself (YAML from disk) is exercised by the `zouppp`
//! binary (`crate::cli`); this module only defines the shape and the
//! per-client derivation logic the fleet runner needs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One C-VLAN or S-VLAN tag in a starting VLAN stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanConfig {
    pub id: u16,
    #[serde(default = "default_tpid")]
    pub tpid: u16,
}

fn default_tpid() -> u16 {
    0x8100
}

/// Which authenticator the client runs when LCP negotiates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProto {
    Pap,
    Chap,
}

/// Which packet relay implementation the binary should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayKind {
    RawSocket,
    Xdp,
}

/// The full recognized configuration surface (spec §6 table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local NIC to bind the relay to.
    pub interface: String,

    pub start_mac: String,
    #[serde(default = "default_mac_step")]
    pub mac_step: u64,

    #[serde(default)]
    pub start_vlans: Vec<VlanConfig>,
    #[serde(default = "default_vlan_step")]
    pub vlan_step: u16,
    #[serde(default)]
    pub excluded_vlans: Vec<u16>,

    #[serde(default = "default_num_clients")]
    pub num_clients: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_retry")]
    pub retry: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    pub auth_proto: AuthProto,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub rid: String,
    pub ppp_ifname: String,

    #[serde(default = "default_true")]
    pub ipv4: bool,
    #[serde(default)]
    pub ipv6: bool,

    #[serde(default)]
    pub apply: bool,
    #[serde(default = "default_relay_kind")]
    pub xdp: RelayKind,
}

fn default_mac_step() -> u64 {
    1
}
fn default_vlan_step() -> u16 {
    0
}
fn default_num_clients() -> u32 {
    1
}
fn default_interval_ms() -> u64 {
    0
}
fn default_retry() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    3_000
}
fn default_true() -> bool {
    true
}
fn default_relay_kind() -> RelayKind {
    RelayKind::RawSocket
}

/// Substitute the literal placeholder `@ID` in `field` with `index`.
pub fn substitute_id(field: &str, index: u32) -> String {
    field.replace("@ID", &index.to_string())
}

impl Config {
    /// Validate the invariants §4.6 requires before any session is launched:
    /// the interface-name field must contain `@ID` when more than one client
    /// will be dispatched, to guarantee per-client uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_clients > 1 && !self.ppp_ifname.contains("@ID") {
            return Err(ConfigError::MissingIdPlaceholder {
                field: "ppp_ifname",
            });
        }
        Ok(())
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}
