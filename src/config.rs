use std::thread;

use clap::Parser;

pub const DEFAULT_OWNER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

/// Node settings. Every flag can also come from the environment.
#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Reverie ledger node", long_about = None)]
pub struct NodeConfig {
    /// Principal allowed to delete thoughts. Fixed for the life of the process.
    #[clap(long, env = "REVERIE_OWNER", default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// Binary protocol listen address
    #[clap(long, env = "REVERIE_ADDR", default_value = "127.0.0.1:9000")]
    pub addr: String,

    #[clap(long, env = "REVERIE_HTTP_PORT", default_value = "8080")]
    pub http_port: u16,

    /// Override for the tokio worker pool size
    #[clap(long, env = "REVERIE_WORKERS")]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RuntimeProfile {
    pub logical_cores: usize,
    pub worker_threads: usize,
}

impl RuntimeProfile {
    pub fn detect() -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::for_cores(cores)
    }

    /// One worker per core, clamped to 2..=4.
    pub fn for_cores(cores: usize) -> Self {
        Self {
            logical_cores: cores,
            worker_threads: cores.clamp(2, 4),
        }
    }

    pub fn with_override(mut self, workers: Option<usize>) -> Self {
        if let Some(n) = workers.filter(|&n| n > 0) {
            self.worker_threads = n;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_sizing() {
        assert_eq!(RuntimeProfile::for_cores(1).worker_threads, 2);
        assert_eq!(RuntimeProfile::for_cores(3).worker_threads, 3);
        assert_eq!(RuntimeProfile::for_cores(64).worker_threads, 4);
        assert_eq!(RuntimeProfile::for_cores(8).with_override(Some(12)).worker_threads, 12);
        assert_eq!(RuntimeProfile::for_cores(8).with_override(Some(0)).worker_threads, 4);
    }

    #[test]
    fn test_flags() {
        let cfg = NodeConfig::try_parse_from([
            "reverie",
            "--owner",
            "admin",
            "--addr",
            "0.0.0.0:7000",
            "--http-port",
            "9090",
        ])
        .unwrap();
        assert_eq!(cfg.owner, "admin");
        assert_eq!(cfg.addr, "0.0.0.0:7000");
        assert_eq!(cfg.http_port, 9090);
        assert_eq!(cfg.workers, None);
    }
}
