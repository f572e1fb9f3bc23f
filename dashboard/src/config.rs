use shared::DEFAULT_PORT;
use std::time::Duration;

/// Tunables of a dashboard instance
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub endpoint: String,
    pub log_capacity: usize,
    pub history_limit: usize,
    /// How long a request may wait for its reply before it is released
    pub command_timeout: Duration,
    pub connect_timeout: Duration,
    /// Delay of locally produced acknowledgements while offline
    pub offline_ack_delay: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("127.0.0.1:{}", DEFAULT_PORT),
            log_capacity: 1000,
            history_limit: 50,
            command_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            offline_ack_delay: Duration::from_millis(100),
            heartbeat_interval: Duration::from_secs(1),
        }
    }
}
