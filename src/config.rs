use std::env;
use std::time::Duration;

use anyhow::Result;

use crate::api::client::DEFAULT_API_URL;
use crate::engagement::CounterRollback;
use crate::feed::models::Level;

/// Default real-time server origin.
pub const DEFAULT_SOCKET_URL: &str = "https://cast-api-zeta.vercel.app";

/// Level shown before the user picks one.
pub const DEFAULT_LEVEL_TYPE: &str = "home";
pub const DEFAULT_LEVEL_VALUE: &str = "home";

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy, so every field can be
/// set there instead of in the shell.
pub struct Config {
    /// REST base URL, including the `/api` prefix.
    pub api_url: String,
    /// Origin of the Socket.IO server.
    pub socket_url: String,
    /// Identity-provider user id. Empty means read-only.
    pub user_id: String,
    pub level: Level,
    /// What a failed recast/recite reverts (CAST_COUNTER_ROLLBACK).
    pub counter_rollback: CounterRollback,
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the user id, which only mutating
    /// commands need.
    pub fn load() -> Result<Self> {
        let counter_rollback = match env::var("CAST_COUNTER_ROLLBACK") {
            Ok(value) => value.parse()?,
            Err(_) => CounterRollback::default(),
        };

        let timeout_secs = match env::var("CAST_REQUEST_TIMEOUT_SECS") {
            Ok(value) => value.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("CAST_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got {value:?}")
            })?,
            Err(_) => 15,
        };

        Ok(Self {
            api_url: env::var("CAST_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            socket_url: env::var("CAST_SOCKET_URL")
                .unwrap_or_else(|_| DEFAULT_SOCKET_URL.to_string()),
            user_id: env::var("CAST_USER_ID").unwrap_or_default(),
            level: Level::new(
                env::var("CAST_LEVEL_TYPE").unwrap_or_else(|_| DEFAULT_LEVEL_TYPE.to_string()),
                env::var("CAST_LEVEL_VALUE").unwrap_or_else(|_| DEFAULT_LEVEL_VALUE.to_string()),
            ),
            counter_rollback,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Check that an identity is configured.
    /// Call this before any command that likes, reposts, comments or deletes.
    pub fn require_identity(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            anyhow::bail!(
                "CAST_USER_ID not set. Add it to your .env file.\n\
                 Mutations are sent on behalf of this user id."
            );
        }
        Ok(())
    }

    /// The configured level, with either half overridden by CLI flags.
    pub fn level_with(&self, kind: Option<String>, value: Option<String>) -> Level {
        Level::new(
            kind.unwrap_or_else(|| self.level.kind.clone()),
            value.unwrap_or_else(|| self.level.value.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            user_id: String::new(),
            level: Level::new("county", "Nairobi"),
            counter_rollback: CounterRollback::Consistent,
            request_timeout: Duration::from_secs(15),
        }
    }

    #[test]
    fn identity_required_for_mutations() {
        let mut config = config();
        assert!(config.require_identity().is_err());
        config.user_id = "user_2abc".to_string();
        assert!(config.require_identity().is_ok());
    }

    #[test]
    fn level_flags_override_one_half() {
        let config = config();
        assert_eq!(
            config.level_with(None, Some("Mombasa".to_string())),
            Level::new("county", "Mombasa")
        );
        assert_eq!(config.level_with(None, None), Level::new("county", "Nairobi"));
    }
}
