//! Shared HTTP client settings and per-client traffic counters

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const USER_AGENT: &str = concat!("vcloud-rs/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    /// Applies to regular API calls; upload pieces use `upload_timeout`.
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            upload_timeout: Duration::from_secs(600),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

/// What became of one HTTP attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Succeeded,
    /// Failed and will be attempted again
    Retried,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub retried_requests: u64,
    pub failed_requests: u64,
    pub uploaded_pieces: u64,
    pub uploaded_bytes: u64,
    pub last_request: Option<Instant>,
}

pub struct ConnectionPoolManager {
    stats: Arc<RwLock<ConnectionStats>>,
    config: ConnectionPoolConfig,
}

impl ConnectionPoolManager {
    pub fn new(config: ConnectionPoolConfig) -> Self {
        Self {
            stats: Arc::new(RwLock::new(ConnectionStats::default())),
            config,
        }
    }

    pub fn config(&self) -> &ConnectionPoolConfig {
        &self.config
    }

    pub async fn record(&self, outcome: RequestOutcome) {
        let mut stats = self.stats.write().await;
        stats.total_requests += 1;
        match outcome {
            RequestOutcome::Succeeded => {}
            RequestOutcome::Retried => stats.retried_requests += 1,
            RequestOutcome::Failed => stats.failed_requests += 1,
        }
        stats.last_request = Some(Instant::now());
    }

    pub async fn record_upload_piece(&self, bytes: u64) {
        let mut stats = self.stats.write().await;
        stats.uploaded_pieces += 1;
        stats.uploaded_bytes += bytes;
    }

    pub async fn get_stats(&self) -> ConnectionStats {
        self.stats.read().await.clone()
    }

    /// The reqwest client every request of one `Client` goes through
    pub fn build_client(&self, insecure: bool) -> Result<reqwest::Client, reqwest::Error> {
        if insecure {
            tracing::warn!("TLS certificate verification is disabled");
        }
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(insecure)
            .connect_timeout(self.config.connect_timeout)
            .pool_idle_timeout(self.config.idle_timeout)
            .pool_max_idle_per_host(self.config.max_idle_per_host)
            .tcp_keepalive(self.config.tcp_keepalive)
            .build()
    }
}
