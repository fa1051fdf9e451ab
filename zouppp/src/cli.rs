//! Command-line entry point (spec §6): load a YAML [`Config`], set up
//! logging, and hand off to the fleet runner.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{ConfigError, Error, Result};

#[derive(Debug, Parser)]
#[command(name = "zouppp", about = "PPPoE access client and load generator")]
pub struct Cli {
    /// Path to the YAML configuration file (spec §6 field table).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Increase log verbosity; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Read and validate the configuration file named on the command line.
    pub fn load_config(&self) -> Result<Config> {
        let text = std::fs::read_to_string(&self.config).map_err(|source| {
            Error::Config(
                ConfigError::Read {
                    path: self.config.display().to_string(),
                    source,
                }
                .to_string(),
            )
        })?;
        let config = Config::from_yaml_str(&text).map_err(|source| {
            Error::Config(
                ConfigError::Parse {
                    path: self.config.display().to_string(),
                    source,
                }
                .to_string(),
            )
        })?;
        config.validate().map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Directive to hand to `tracing_subscriber`'s `EnvFilter`, derived from
    /// `-v` count unless `RUST_LOG` is already set.
    pub fn env_filter(&self) -> EnvFilter {
        if std::env::var("RUST_LOG").is_ok() {
            return EnvFilter::from_default_env();
        }
        let directive = match self.verbose {
            0 => "zouppp=info",
            1 => "zouppp=debug",
            _ => "zouppp=trace",
        };
        EnvFilter::new(directive)
    }
}
