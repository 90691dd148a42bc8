//! Server configuration management.
//!
//! Consolidates environment variable reads and provides validated
//! configuration for the binary.

use holdem_chips::DatabaseConfig;
use std::net::SocketAddr;

/// Complete server configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP/WebSocket bind address.
    pub bind: SocketAddr,
    /// Prometheus exporter bind address.
    pub metrics_bind: SocketAddr,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// WebSocket session tuning.
    pub session: SessionConfig,
    /// Room lifecycle policy.
    pub rooms: RoomLifecycleConfig,
}

/// WebSocket liveness parameters.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Interval clients are expected to ping at.
    pub heartbeat_interval_secs: u64,
    /// Silence budget before a session is considered dead.
    pub liveness_timeout_secs: u64,
}

/// Background room management.
#[derive(Debug, Clone, Copy)]
pub struct RoomLifecycleConfig {
    /// Seconds a fully-disconnected room survives before deletion.
    pub idle_room_ttl_secs: i64,
    /// Sweep cadence.
    pub sweep_interval_secs: u64,
    /// Fold a disconnected player whose turn it is (off by default).
    pub auto_fold_disconnected: bool,
}

impl ServerConfig {
    /// Load configuration, letting CLI arguments override the environment.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:8080"
                    .parse()
                    .expect("default bind address is valid")
            });

        let metrics_bind: SocketAddr = std::env::var("HC_METRICS_BIND")
            .unwrap_or_else(|_| "127.0.0.1:9090".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid {
                var: "HC_METRICS_BIND".to_string(),
                reason: "must be an ip:port address".to_string(),
            })?;

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let session = SessionConfig {
            heartbeat_interval_secs: parse_env_or("SESSION_HEARTBEAT_SECS", 3),
            liveness_timeout_secs: parse_env_or("SESSION_LIVENESS_TIMEOUT_SECS", 15),
        };

        let rooms = RoomLifecycleConfig {
            idle_room_ttl_secs: parse_env_or("ROOM_IDLE_TTL_SECS", 600),
            sweep_interval_secs: parse_env_or("ROOM_SWEEP_INTERVAL_SECS", 10),
            auto_fold_disconnected: parse_env_or("AUTO_FOLD_DISCONNECTED", false),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            database,
            session,
            rooms,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "SESSION_HEARTBEAT_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.session.liveness_timeout_secs <= self.session.heartbeat_interval_secs {
            return Err(ConfigError::Invalid {
                var: "SESSION_LIVENESS_TIMEOUT_SECS".to_string(),
                reason: format!(
                    "must exceed the heartbeat interval ({})",
                    self.session.heartbeat_interval_secs
                ),
            });
        }
        if self.rooms.idle_room_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_IDLE_TTL_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.rooms.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_SWEEP_INTERVAL_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
