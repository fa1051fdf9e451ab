//! Authentication clients (spec §4.4): PAP and CHAP-MD5, run as their own
//! registered protocol on the [`crate::mux::PppMux`] once LCP reports the
//! authentication protocol it negotiated.

pub mod chap;
pub mod pap;

use std::time::Duration;

use crate::config::AuthProto;
use crate::error::Result;
use crate::mux::{EgressHandle, RingReceiver};

/// Run whichever authentication protocol LCP negotiated to completion.
pub async fn authenticate(
    proto: AuthProto,
    egress: &EgressHandle,
    ingress: &mut RingReceiver<Vec<u8>>,
    username: &str,
    password: &str,
    per_attempt_timeout: Duration,
    retries: u32,
) -> Result<()> {
    match proto {
        AuthProto::Pap => pap::authenticate(egress, ingress, username, password, per_attempt_timeout, retries).await,
        AuthProto::Chap => {
            let overall = per_attempt_timeout * (retries + 1);
            chap::authenticate(egress, ingress, username, password, overall).await
        }
    }
}
