use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the listening server, the per-room hubs and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the WebSocket endpoint will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Limits applied to every subscriber connection.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HubSettings {
    /// Capacity of each subscriber's outbound queue. A subscriber whose queue
    /// is full at broadcast time is evicted.
    pub send_queue_capacity: usize,
    /// Upper bound for a single write, including ping frames.
    pub write_wait_secs: u64,
    /// How long a connection may go without a pong before it is considered dead.
    pub pong_wait_secs: u64,
    /// Largest frame accepted from a peer, in bytes.
    pub max_message_size: usize,
}

/// Upper bound for any configured wait. Deadlines are computed as
/// `Instant::now() + wait`, which must not overflow.
pub const MAX_WAIT_SECS: u64 = 365 * 24 * 60 * 60;

impl HubSettings {
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs.min(MAX_WAIT_SECS))
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs.min(MAX_WAIT_SECS))
    }

    /// Interval between pings. Always shorter than the pong wait so a healthy
    /// peer refreshes the read deadline before it expires.
    pub fn ping_period(&self) -> Duration {
        (self.pong_wait() / 10 * 9).max(Duration::from_millis(1))
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            send_queue_capacity: 256,
            write_wait_secs: 10,
            pong_wait_secs: 60,
            max_message_size: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled from defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHubSettings {
    pub send_queue_capacity: Option<usize>,
    pub write_wait_secs: Option<u64>,
    pub pong_wait_secs: Option<u64>,
    pub max_message_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fills every missing value from `Settings::default()`.
    pub fn merge_with_defaults(self) -> Settings {
        let default = Settings::default();
        let server = self.server;
        let hub = self.hub;
        let log = self.log;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            hub: HubSettings {
                send_queue_capacity: hub
                    .as_ref()
                    .and_then(|h| h.send_queue_capacity)
                    .unwrap_or(default.hub.send_queue_capacity),
                write_wait_secs: hub
                    .as_ref()
                    .and_then(|h| h.write_wait_secs)
                    .unwrap_or(default.hub.write_wait_secs),
                pong_wait_secs: hub
                    .as_ref()
                    .and_then(|h| h.pong_wait_secs)
                    .unwrap_or(default.hub.pong_wait_secs),
                max_message_size: hub
                    .as_ref()
                    .and_then(|h| h.max_message_size)
                    .unwrap_or(default.hub.max_message_size),
            },
            log: LogSettings {
                level: log
                    .and_then(|l| l.level)
                    .unwrap_or(default.log.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            hub: HubSettings::default(),
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
