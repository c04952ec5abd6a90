use anyhow::Context;
use chrono::TimeDelta;
use serde::Deserialize;

/// Upper bound on `INVITE_TTL_HOURS` (roughly a century)
pub const MAX_INVITE_TTL_HOURS: u32 = 24 * 366 * 100;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. When unset the service keeps its
    /// data in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum pooled PostgreSQL connections
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// Redis connection URL for corner change events
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Lifetime of a freshly issued invite code, in hours
    #[serde(default = "default_invite_ttl_hours")]
    pub invite_ttl_hours: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_invite_ttl_hours() -> u32 {
    24
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.invite_ttl_hours == 0 || config.invite_ttl_hours > MAX_INVITE_TTL_HOURS {
            anyhow::bail!(
                "Failed to load config: INVITE_TTL_HOURS must be between 1 and {}, got {}",
                MAX_INVITE_TTL_HOURS,
                config.invite_ttl_hours
            );
        }

        Ok(config)
    }

    /// Invite lifetime as a duration
    pub fn invite_ttl(&self) -> anyhow::Result<TimeDelta> {
        TimeDelta::try_hours(i64::from(self.invite_ttl_hours))
            .context("INVITE_TTL_HOURS out of range")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
