use clap::Parser;
use std::time::Duration;

/// Command line configuration of the game server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Address to bind the game listener to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 43594)]
    pub port: u16,

    /// Milliseconds between engine cycles
    #[arg(short, long, default_value_t = 600)]
    pub cycle_ms: u64,

    /// Maximum number of registered players
    #[arg(short, long, default_value_t = 2000)]
    pub max_players: usize,

    /// Size of the blocking worker pool (defaults to available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["server"])
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms.max(1))
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:43594");
        assert_eq!(config.cycle(), Duration::from_millis(600));
        assert_eq!(config.max_players, 2000);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_flags() {
        let config = ServerConfig::parse_from([
            "server", "-H", "127.0.0.1", "-p", "5555", "--cycle-ms", "50", "--workers", "3",
        ]);
        assert_eq!(config.address(), "127.0.0.1:5555");
        assert_eq!(config.cycle(), Duration::from_millis(50));
        assert_eq!(config.worker_count(), 3);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let config = ServerConfig::parse_from(["server", "-w", "0"]);
        assert_eq!(config.worker_count(), 1);
    }
}
