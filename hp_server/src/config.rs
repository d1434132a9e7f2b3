//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use hilo_poker::GameConfig;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Directory the browser client is served from
    pub static_dir: PathBuf,
    /// Prometheus scrape address, exporter disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Rules every room is created with
    pub game: GameConfig,
    /// Per-socket limits
    pub connection: ConnectionConfig,
    /// How often the lobby expires stale rooms
    pub room_sweep_interval_secs: u64,
}

/// Per-connection housekeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Seconds between pings; a socket that misses one pong is closed
    pub heartbeat_interval_secs: u64,
    /// Messages allowed per rate limit window
    pub rate_limit_max_messages: usize,
    pub rate_limit_window_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            rate_limit_max_messages: 30,
            rate_limit_window_secs: 1,
        }
    }
}

impl ConnectionConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: PathBuf::from("public"),
            metrics_bind: None,
            game: GameConfig::default(),
            connection: ConnectionConfig::default(),
            room_sweep_interval_secs: 60 * 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `static_dir_override` - Optional client directory override (from CLI args)
    /// * `metrics_override` - Optional metrics address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but does not parse
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        static_dir_override: Option<PathBuf>,
        metrics_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr_env("SERVER_BIND")?.unwrap_or(defaults.bind),
        };

        let static_dir = static_dir_override
            .or_else(|| std::env::var("STATIC_DIR").ok().map(PathBuf::from))
            .unwrap_or(defaults.static_dir);

        let metrics_bind = match metrics_override {
            Some(addr) => Some(addr),
            None => parse_addr_env("METRICS_BIND")?,
        };

        let game_defaults = defaults.game;
        let game = GameConfig {
            starting_chips: parse_env_or("STARTING_CHIPS", game_defaults.starting_chips),
            equation_window_secs: parse_env_or(
                "EQUATION_WINDOW_SECS",
                game_defaults.equation_window_secs,
            ),
            equation_grace_secs: parse_env_or(
                "EQUATION_GRACE_SECS",
                game_defaults.equation_grace_secs,
            ),
            room_ttl_secs: parse_env_or("ROOM_TTL_SECS", game_defaults.room_ttl_secs),
            max_players: parse_env_or("MAX_PLAYERS_PER_ROOM", game_defaults.max_players),
            ..game_defaults
        };

        let connection_defaults = defaults.connection;
        let connection = ConnectionConfig {
            heartbeat_interval_secs: parse_env_or(
                "HEARTBEAT_INTERVAL_SECS",
                connection_defaults.heartbeat_interval_secs,
            ),
            rate_limit_max_messages: parse_env_or(
                "RATE_LIMIT_MAX_MESSAGES",
                connection_defaults.rate_limit_max_messages,
            ),
            rate_limit_window_secs: parse_env_or(
                "RATE_LIMIT_WINDOW_SECS",
                connection_defaults.rate_limit_window_secs,
            ),
        };

        Ok(ServerConfig {
            bind,
            static_dir,
            metrics_bind,
            game,
            connection,
            room_sweep_interval_secs: parse_env_or(
                "ROOM_SWEEP_INTERVAL_SECS",
                defaults.room_sweep_interval_secs,
            ),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate().map_err(|reason| ConfigError::Invalid {
            var: "game rules".to_string(),
            reason,
        })?;

        if self.connection.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "HEARTBEAT_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.connection.rate_limit_max_messages == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_MAX_MESSAGES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.connection.rate_limit_window_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_WINDOW_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.room_sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_SWEEP_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }

    pub fn room_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.room_sweep_interval_secs)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Addresses are not defaulted on a typo; a bad value is reported.
fn parse_addr_env(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{value}' is not an IP:PORT address"),
            }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            var: key.to_string(),
            reason: "Value must be valid UTF-8".to_string(),
        }),
    }
}
