//! Error kinds the runtime distinguishes (spec §7): each variant names the
//! policy its caller applies, not just the failure.

/// Errors raised anywhere in the session engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A packet failed to parse. The codec drops the packet and logs a
    /// warning; this variant exists for callers that need to observe the
    /// failure (tests, metrics) rather than silently continue.
    #[error("malformed {what}")]
    Parse {
        /// What was being parsed, e.g. `"PPPoE discovery packet"`.
        what: &'static str,
    },

    /// No response arrived within the configured deadline. Retried up to the
    /// configured limit by the caller; this variant is returned once the
    /// limit is exhausted.
    #[error("timed out waiting for {what}")]
    Timeout {
        /// What was being waited for, e.g. `"PADO"`.
        what: &'static str,
    },

    /// The access concentrator replied with Session-ID=0 in PADS.
    #[error("access concentrator rejected session request")]
    AcRejected,

    /// PAP/CHAP authentication failed, either by explicit Nak/Failure or by
    /// timing out waiting for one.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// An FSM instance reached Stopped via TO- before its layer ever came up.
    #[error("{protocol} negotiation finished without reaching Opened")]
    NegotiationFinished {
        /// The protocol whose FSM gave up, e.g. `"LCP"`.
        protocol: &'static str,
    },

    /// The underlying packet relay failed. Logged and treated as transient
    /// wherever a restart timer already covers the loss; fatal only when the
    /// relay itself reports it cannot continue.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Configuration is internally inconsistent or names an unsupported
    /// option (e.g. an auth protocol this client doesn't implement).
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Error produced while parsing or validating a [`crate::config::Config`]
/// before any session work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The config file did not parse as YAML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    /// A required `@ID`-substituted field didn't contain the placeholder.
    #[error("field {field} must contain the @ID placeholder for uniqueness across clients")]
    MissingIdPlaceholder { field: &'static str },
    /// Striding a VLAN stack past the excluded set exceeded the retry budget.
    #[error("could not find a non-excluded VLAN after {attempts} re-steps starting from {start}")]
    VlanExclusionExhausted { start: u16, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
