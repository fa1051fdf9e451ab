//! The fleet runner (spec §4.6): derives N per-client configurations from one
//! [`Config`], dispatches them on an interval, and aggregates their
//! [`SessionResult`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zpkt::ether::EtherAddr;

use crate::config::{substitute_id, Config, VlanConfig};
use crate::datapath::DatapathAdapter;
use crate::error::{ConfigError, Error, Result};
use crate::relay::PacketRelay;
use crate::session::{self, Outcome, SessionConfig, SessionResult};

const MAX_VLAN_RESTEPS: u32 = 10;

/// One client's fully-derived, `@ID`-substituted launch parameters.
#[derive(Debug, Clone)]
pub struct ClientParams {
    pub index: u32,
    pub mac: EtherAddr,
    pub vlans: Vec<VlanConfig>,
    pub session: SessionConfig,
}

/// Derive the Nth client's parameters, striding MAC/VLAN from the config's
/// starting point and substituting `@ID` into every placeholder field.
pub fn derive_client_params(
    config: &Config,
    index: u32,
    vlan_cursor: &mut Option<u16>,
    vlan_step: u16,
) -> std::result::Result<ClientParams, Error> {
    let start_mac = EtherAddr::parse_from(&config.start_mac)
        .ok_or_else(|| Error::Config(format!("invalid start_mac {:?}", config.start_mac)))?;
    let mac = start_mac.stride(index as u64 * config.mac_step);

    let mut vlans = config.start_vlans.clone();
    if let Some(first) = vlans.first_mut() {
        if vlan_cursor.is_none() {
            *vlan_cursor = Some(first.id);
        }
        let id = stride_vlan_with_step(vlan_cursor, &config.excluded_vlans, vlan_step)
            .map_err(|e| Error::Config(e.to_string()))?;
        first.id = id;
        *vlan_cursor = Some(id.wrapping_add(vlan_step));
    }

    let session = SessionConfig {
        client_index: index,
        service_name: String::new(),
        cid: substitute_id(&config.cid, index),
        rid: substitute_id(&config.rid, index),
        auth_proto: config.auth_proto,
        username: substitute_id(&config.username, index),
        password: substitute_id(&config.password, index),
        ipv4: config.ipv4,
        ipv6: config.ipv6,
        ifname: substitute_id(&config.ppp_ifname, index),
        retry: config.retry,
        timeout: Duration::from_millis(config.timeout_ms),
    };

    Ok(ClientParams {
        index,
        mac,
        vlans,
        session,
    })
}

fn stride_vlan_with_step(
    cursor: &mut Option<u16>,
    excluded: &[u16],
    step: u16,
) -> std::result::Result<u16, ConfigError> {
    let mut id = cursor.expect("cursor primed by caller before this call");
    let start = id;
    let mut attempts = 0;
    while excluded.contains(&id) {
        attempts += 1;
        if attempts > MAX_VLAN_RESTEPS {
            return Err(ConfigError::VlanExclusionExhausted {
                start,
                attempts: MAX_VLAN_RESTEPS,
            });
        }
        id = id.wrapping_add(step);
    }
    Ok(id)
}

/// Running aggregate over a fleet's published [`SessionResult`]s (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    pub total: u32,
    pub success: u32,
    pub failed: u32,
    pub fastest: Option<Duration>,
    pub slowest: Option<Duration>,
    pub average: Option<Duration>,
    pub success_within_10s: u32,
    pub wall_time: Duration,
}

impl ResultSummary {
    fn record(&mut self, elapsed: Duration, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success { .. } => {
                self.success += 1;
                if elapsed <= Duration::from_secs(10) {
                    self.success_within_10s += 1;
                }
                self.fastest = Some(self.fastest.map_or(elapsed, |f| f.min(elapsed)));
                self.slowest = Some(self.slowest.map_or(elapsed, |s| s.max(elapsed)));
            }
            Outcome::Failure { .. } => self.failed += 1,
        }
    }
}

/// Dispatch `config.num_clients` sessions in order, `interval_ms` apart, and
/// collect their results until every session has published one or `cancel`
/// fires.
pub async fn run_fleet<R, D>(
    config: Config,
    make_relay: impl Fn(&ClientParams) -> R,
    make_datapath: impl Fn(&ClientParams) -> D,
    progress: Option<mpsc::Sender<SessionResult>>,
    cancel: CancellationToken,
) -> Result<ResultSummary>
where
    R: PacketRelay + 'static,
    D: DatapathAdapter + 'static,
{
    config.validate().map_err(|e| Error::Config(e.to_string()))?;

    let (result_tx, mut result_rx) = mpsc::channel(config.num_clients.max(1) as usize);
    let mut vlan_cursor: Option<u16> = None;
    let fleet_start = Instant::now();

    for index in 0..config.num_clients {
        if cancel.is_cancelled() {
            break;
        }
        let params = match derive_client_params(&config, index, &mut vlan_cursor, config.vlan_step) {
            Ok(p) => p,
            Err(e) => {
                warn!(client = index, error = %e, "failed to derive client parameters, skipping");
                continue;
            }
        };
        let relay = Arc::new(make_relay(&params));
        let datapath = Arc::new(make_datapath(&params));
        let session_cfg = params.session.clone();
        let tx = result_tx.clone();
        let progress = progress.clone();
        let child_cancel = cancel.child_token();
        info!(client = index, mac = ?params.mac, "dispatching client");

        tokio::spawn(async move {
            let result = session::run_session(relay, session_cfg, datapath, child_cancel).await;
            if let Some(p) = &progress {
                let _ = p.send(result.clone()).await;
            }
            let _ = tx.send(result).await;
        });

        if config.interval_ms > 0 && index + 1 < config.num_clients {
            tokio::time::sleep(Duration::from_millis(config.interval_ms)).await;
        }
    }
    drop(result_tx);

    let mut summary = ResultSummary::default();
    let mut success_duration_sum = Duration::ZERO;
    let mut collected = 0u32;
    while collected < config.num_clients {
        tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = result_rx.recv() => {
                let Some(result) = maybe else { break };
                collected += 1;
                let elapsed = result.finished_at.duration_since(result.started_at);
                if matches!(result.outcome, Outcome::Success { .. }) {
                    success_duration_sum += elapsed;
                }
                summary.record(elapsed, &result.outcome);
            }
        }
    }
    summary.wall_time = fleet_start.elapsed();
    if summary.success > 0 {
        summary.average = Some(success_duration_sum / summary.success);
    }
    Ok(summary)
}
