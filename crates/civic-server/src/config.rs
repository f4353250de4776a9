//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};

use civic_shared::constants::{
    DEFAULT_DB_MAX_CONNECTIONS, DEFAULT_HTTP_PORT, DEFAULT_MAX_PAGE_SIZE,
    DEFAULT_RESOLUTION_UTC_OFFSET_HOURS,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./civic.db`
    pub database_path: PathBuf,

    /// Most SQLite connections open at once.
    /// Env: `DB_MAX_CONNECTIONS`
    /// Default: `8`
    pub db_max_connections: usize,

    /// Offset, in whole hours east of UTC, at which resolution times are
    /// recorded.
    /// Env: `RESOLUTION_UTC_OFFSET_HOURS`
    /// Default: `2`
    pub resolution_offset_hours: i32,

    /// Whether an external resolution may only be proposed by someone who
    /// has reported an issue in the same category.
    /// Env: `REQUIRE_CLUSTER_MEMBERSHIP` (true/false)
    /// Default: `true`
    pub require_cluster_membership: bool,

    /// Upper bound on `amount` for feed pages.
    /// Env: `MAX_PAGE_SIZE`
    /// Default: `100`
    pub max_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./civic.db"),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            resolution_offset_hours: DEFAULT_RESOLUTION_UTC_OFFSET_HOURS,
            require_cluster_membership: true,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.  Invalid values
    /// are logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = PathBuf::from(path);
            }
        }

        if let Some(val) = lookup("DB_MAX_CONNECTIONS") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.db_max_connections = n,
                _ => tracing::warn!(value = %val, "Invalid DB_MAX_CONNECTIONS, using default"),
            }
        }

        if let Some(val) = lookup("RESOLUTION_UTC_OFFSET_HOURS") {
            match val.trim().parse::<i32>() {
                Ok(hours) if offset_from_hours(hours).is_some() => {
                    config.resolution_offset_hours = hours;
                }
                _ => {
                    tracing::warn!(value = %val, "Invalid RESOLUTION_UTC_OFFSET_HOURS, using default");
                }
            }
        }

        if let Some(val) = lookup("REQUIRE_CLUSTER_MEMBERSHIP") {
            config.require_cluster_membership = val != "false" && val != "0";
        }

        if let Some(val) = lookup("MAX_PAGE_SIZE") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.max_page_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_PAGE_SIZE, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// The fixed offset resolution timestamps are normalised to.
    pub fn resolution_offset(&self) -> FixedOffset {
        offset_from_hours(self.resolution_offset_hours).unwrap_or_else(|| Utc.fix())
    }
}

fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    if !(-23..=23).contains(&hours) {
        return None;
    }
    FixedOffset::east_opt(hours * 3600)
}
