//! Command-line arguments for the price server.
//!
//! This module defines the CLI interface using `clap`. Every value has a default, so
//! `price_server` with no flags streams the built-in instrument set on the standard ports.
use clap::{Parser, ValueEnum};
use price_common::net::{COMMAND_PORT, DATA_PORT};
use price_common::{PriceError, Result};
use price_server::model::simulator::{DEFAULT_DT, DEFAULT_FLOOR};
use price_server::{NonPositivePolicy, PriceSimulator, SchedulerConfig};
use std::path::PathBuf;
use std::time::Duration;
use strum_macros::Display;

/// How non-positive simulated prices are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PolicyArg {
    /// Replace the price with `--floor`.
    Clamp,
    /// Keep the previous price.
    Reject,
}

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// TCP port accepting subscription commands.
    #[clap(long, default_value_t = COMMAND_PORT)]
    pub command_port: u16,

    /// UDP port receiving pings; payloads are sent from it as well.
    #[clap(long, default_value_t = DATA_PORT)]
    pub data_port: u16,

    /// Tick period per subscription, in milliseconds.
    #[clap(long, default_value_t = 200)]
    pub tick_ms: u64,

    /// JSON file with an array of instruments (`id`, `mu`, `sigma`, `s0`, `spread`).
    /// The built-in set is used when omitted.
    #[clap(long)]
    pub instruments: Option<PathBuf>,

    /// Seconds without a ping after which a client is unsubscribed.
    #[clap(long, default_value_t = 5)]
    pub ping_timeout_secs: u64,

    /// Seed for reproducible price paths.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Handling of simulated prices that fall to zero or below.
    #[clap(long, value_enum, default_value_t = PolicyArg::Clamp)]
    pub policy: PolicyArg,

    /// Substitute price used by the `clamp` policy.
    #[clap(long, default_value_t = DEFAULT_FLOOR)]
    pub floor: f64,

    /// Updates buffered per client before new ones are dropped.
    #[clap(long, default_value_t = 256)]
    pub queue_capacity: usize,
}

impl Args {
    /// Scheduler settings derived from the flags.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        if self.tick_ms == 0 {
            return Err(PriceError::Configuration(
                "--tick-ms must be > 0".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(PriceError::Configuration(
                "--queue-capacity must be > 0".to_string(),
            ));
        }
        let policy = match self.policy {
            PolicyArg::Clamp => NonPositivePolicy::Clamp { floor: self.floor },
            PolicyArg::Reject => NonPositivePolicy::Reject,
        };
        Ok(SchedulerConfig {
            period: Duration::from_millis(self.tick_ms),
            simulator: PriceSimulator::new(DEFAULT_DT, policy)?,
            seed: self.seed,
        })
    }

    /// Keep-alive threshold.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_standard_setup() {
        let args = Args::parse_from(["price_server"]);
        let config = args.scheduler_config().unwrap();

        assert_eq!(args.command_port, COMMAND_PORT);
        assert_eq!(args.data_port, DATA_PORT);
        assert_eq!(config.period, Duration::from_millis(200));
        assert_eq!(config.simulator, PriceSimulator::default());
        assert_eq!(config.seed, None);
        assert_eq!(args.ping_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn policy_flag_selects_reject() {
        let args = Args::parse_from(["price_server", "--policy", "reject", "--seed", "3"]);
        let config = args.scheduler_config().unwrap();
        assert_eq!(config.simulator.policy(), NonPositivePolicy::Reject);
        assert_eq!(config.seed, Some(3));
        assert_eq!(args.policy.to_string(), "reject");
    }

    #[test]
    fn invalid_flags_are_configuration_errors() {
        for argv in [
            vec!["price_server", "--tick-ms", "0"],
            vec!["price_server", "--floor", "0"],
            vec!["price_server", "--queue-capacity", "0"],
        ] {
            let args = Args::parse_from(argv);
            assert!(matches!(
                args.scheduler_config(),
                Err(PriceError::Configuration(_))
            ));
        }
    }
}
