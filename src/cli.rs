//! Command-line flags.
//!
//! The config file carries everything; flags and their environment
//! variables override single values of it.

use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "redirect-balancer")]
#[command(about = "Weighted random redirector with active health checks", version)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, env = "CONF", default_value = "rlb.toml")]
    pub conf: PathBuf,

    /// Refresh interval (secs)
    #[arg(short, long, env = "REFRESH")]
    pub refresh: Option<u64>,

    /// HEAD/GET timeouts (secs)
    #[arg(short, long, env = "TIMEOUT")]
    pub timeout: Option<u64>,

    /// Stats collector url
    #[arg(short, long, env = "STATS")]
    pub stats: Option<String>,

    /// Listen address
    #[arg(short, long, env = "LISTEN")]
    pub listen: Option<String>,

    /// Failback base url
    #[arg(long, env = "FAILBACK")]
    pub failback: Option<String>,

    /// Debug mode
    #[arg(long, env = "DEBUG")]
    pub dbg: bool,
}

impl Cli {
    /// Override config values with the flags that were given.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(refresh) = self.refresh {
            config.health_check.refresh_secs = refresh;
        }
        if let Some(timeout) = self.timeout {
            config.health_check.timeout_secs = timeout;
        }
        if let Some(stats) = &self.stats {
            config.server.stats_url = Some(stats.clone());
        }
        if let Some(listen) = &self.listen {
            config.server.bind_address = listen.clone();
        }
        if let Some(failback) = &self.failback {
            config.server.failback = Some(failback.clone());
        }
    }
}
