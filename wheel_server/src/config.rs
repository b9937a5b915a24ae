use std::{env, fmt::Display, str::FromStr};

use chrono::FixedOffset;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://wheel.db";
const DEV_API_KEY: &str = "dev-key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub database_url: String,
    pub api_key: String,
    /// Fixed offset whose calendar days bound the spin limit. Only fixed
    /// offsets are supported: the boundary does not follow daylight saving,
    /// and every day is exactly 24 hours long.
    pub utc_offset: FixedOffset,
    pub invites_per_win: u32,
    pub invite_expiration_days: Option<u32>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY").unwrap_or_else(|| {
            warn!("API_KEY not set, admin routes use the development key");
            DEV_API_KEY.to_string()
        });

        let offset_minutes: i32 = parse_or(&lookup, "WHEEL_UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                key: "WHEEL_UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
                reason: "offset must be within +/- 24h".into(),
            })?;

        let invites_per_win: u32 = parse_or(&lookup, "WHEEL_INVITES_PER_WIN", 1)?;
        if invites_per_win == 0 {
            return Err(ConfigError::Invalid {
                key: "WHEEL_INVITES_PER_WIN",
                value: "0".into(),
                reason: "a win must grant at least one invite".into(),
            });
        }

        // 0 means the grant never expires
        let expiration: u32 = parse_or(&lookup, "WHEEL_INVITE_EXPIRATION_DAYS", 7)?;

        Ok(Self {
            bind: lookup("BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            api_key,
            utc_offset,
            invites_per_win,
            invite_expiration_days: (expiration > 0).then_some(expiration),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.api_key, "dev-key");
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.invites_per_win, 1);
        assert_eq!(config.invite_expiration_days, Some(7));
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("BIND", "0.0.0.0:9000"),
            ("API_KEY", "secret"),
            ("WHEEL_UTC_OFFSET_MINUTES", "-300"),
            ("WHEEL_INVITES_PER_WIN", "2"),
            ("WHEEL_INVITE_EXPIRATION_DAYS", "0"),
        ])
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.utc_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.invites_per_win, 2);
        assert_eq!(config.invite_expiration_days, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[("WHEEL_UTC_OFFSET_MINUTES", "abc")]),
            Err(ConfigError::Invalid { key: "WHEEL_UTC_OFFSET_MINUTES", .. })
        ));
        assert!(config_from(&[("WHEEL_UTC_OFFSET_MINUTES", "2000")]).is_err());
        assert!(config_from(&[("WHEEL_INVITES_PER_WIN", "0")]).is_err());
        assert!(config_from(&[("WHEEL_INVITE_EXPIRATION_DAYS", "-1")]).is_err());
    }
}
