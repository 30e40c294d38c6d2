//! Command-line arguments for the price client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Server IP address (IPv4 or IPv6) where the price service is running.
    #[clap(long)]
    pub server_ip: String,

    /// Local UDP port to bind for receiving prices and sending pings.
    #[clap(long)]
    pub listen_port: String,

    /// Only print these assets (comma separated). Everything is printed when omitted.
    #[clap(long, value_delimiter = ',')]
    pub assets: Vec<String>,
}

impl Args {
    /// `true` when `asset` passes the `--assets` filter.
    pub fn wants(&self, asset: &str) -> bool {
        self.assets.is_empty()
            || self
                .assets
                .iter()
                .any(|wanted| wanted.trim().eq_ignore_ascii_case(asset))
    }
}
