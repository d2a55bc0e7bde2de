use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::Parser;

/// Port appended to every resolver host.
pub const DNS_PORT: u16 = 53;

#[derive(Parser, Debug)]
#[command(name = "sw-connectivity")]
#[command(about = "Test DNS resolver connectivity through a transport", long_about = None)]
pub struct Args {
    /// Enable debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Transport config, e.g. `ss://...@host:port|tlsfrag:1` (empty = direct)
    #[arg(long, default_value = "")]
    pub transport: String,
    /// Domain name to resolve in the test
    #[arg(long, default_value = "example.com.")]
    pub domain: String,
    /// Comma-separated list of DNS resolver hosts
    #[arg(long, default_value = "8.8.8.8,2001:4860:4860::8888")]
    pub resolver: String,
    /// Comma-separated list of protocols to test: "tcp", "udp" or both
    #[arg(long, default_value = "tcp,udp")]
    pub proto: String,
    /// Per-test deadline in milliseconds
    #[arg(long = "timeout-ms", default_value_t = 5000)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Udp,
}

impl Proto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proto::Tcp => "tcp",
            Proto::Udp => "udp",
        }
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Proto {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Proto::Tcp),
            "udp" => Ok(Proto::Udp),
            other => Err(anyhow!(r#"invalid proto {other:?}: must be "tcp" or "udp""#)),
        }
    }
}

impl Args {
    /// Resolver hosts, trimmed, with any IPv6 brackets removed.
    pub fn resolver_hosts(&self) -> Vec<String> {
        self.resolver
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .collect()
    }

    pub fn protos(&self) -> Result<Vec<Proto>> {
        self.proto.split(',').map(|p| p.trim().parse()).collect()
    }
}
