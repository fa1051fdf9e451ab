//! The `zouppp` binary: parse CLI args, load the YAML config they name, and
//! run the fleet to completion or until Ctrl-C.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use zouppp::cli::Cli;
use zouppp::config::RelayKind;
use zouppp::datapath::LoggingDatapath;
use zouppp::fleet::{self, ClientParams};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(cli.env_filter()).init();

    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if matches!(config.xdp, RelayKind::Xdp) {
        error!("XDP relay is not implemented by this build; use xdp: rawsocket");
        return ExitCode::FAILURE;
    }
    if config.apply {
        warn!("apply: true requested but no OS datapath adapter is wired in; sessions will negotiate but install nothing");
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, stopping fleet");
            signal_cancel.cancel();
        }
    });

    let ifname = config.interface.clone();
    let make_relay = move |params: &ClientParams| {
        #[cfg(target_os = "linux")]
        {
            zouppp::rawsocket::RawSocketRelay::bind(&ifname, params.mac, to_relay_vlans(&params.vlans))
                .unwrap_or_else(|e| panic!("failed to bind raw socket on {ifname}: {e}"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = &ifname;
            panic!("no PacketRelay implementation is available on this target")
        }
    };
    let make_datapath = |_: &ClientParams| LoggingDatapath;

    let summary = fleet::run_fleet(config, make_relay, make_datapath, None, cancel).await;
    match summary {
        Ok(summary) => {
            info!(
                total = summary.total,
                success = summary.success,
                failed = summary.failed,
                fastest_ms = summary.fastest.map(|d| d.as_millis()),
                slowest_ms = summary.slowest.map(|d| d.as_millis()),
                average_ms = summary.average.map(|d| d.as_millis()),
                within_10s = summary.success_within_10s,
                wall_time_ms = summary.wall_time.as_millis(),
                "fleet run complete"
            );
            if summary.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!(error = %e, "fleet run failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_os = "linux")]
fn to_relay_vlans(vlans: &[zouppp::config::VlanConfig]) -> Vec<zouppp::relay::VlanTag> {
    vlans
        .iter()
        .map(|v| zouppp::relay::VlanTag { id: v.id, tpid: v.tpid })
        .collect()
}
