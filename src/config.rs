use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::{Duration, FixedOffset};

use crate::error::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub listen_addr: SocketAddr,
    pub bidding_window: Duration,
    pub expiry_sweep_interval: std::time::Duration,
    pub event_buffer: usize,
    pub market_offset: FixedOffset,
}

pub const DEFAULT_BIDDING_WINDOW_SECS: i64 = 300;

impl Config {
    /// Reads settings from the process environment, after loading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;

        Self::from_lookup(database_url, |key| env::var(key).ok())
    }

    fn from_lookup<F>(database_url: String, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5u32)?;
        let listen_addr = parse_or(
            &lookup,
            "LISTEN_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3000)),
        )?;
        let window_secs = parse_or(&lookup, "BIDDING_WINDOW_SECS", DEFAULT_BIDDING_WINDOW_SECS)?;
        let sweep_secs = parse_or(&lookup, "EXPIRY_SWEEP_INTERVAL_SECS", 5u64)?;
        let event_buffer = parse_or(&lookup, "EVENT_BUFFER", 1024usize)?;
        let offset_minutes = parse_or(&lookup, "MARKET_UTC_OFFSET_MINUTES", 0i32)?;

        if window_secs <= 0 {
            return Err(Error::config_error("BIDDING_WINDOW_SECS must be positive"));
        }

        if sweep_secs == 0 {
            return Err(Error::config_error(
                "EXPIRY_SWEEP_INTERVAL_SECS must be positive",
            ));
        }

        let market_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| Error::config_error("MARKET_UTC_OFFSET_MINUTES out of range"))?;

        let bidding_window = Duration::try_seconds(window_secs)
            .ok_or_else(|| Error::config_error("BIDDING_WINDOW_SECS out of range"))?;

        Ok(Self {
            database_url,
            max_connections,
            listen_addr,
            bidding_window,
            expiry_sweep_interval: std::time::Duration::from_secs(sweep_secs),
            event_buffer,
            market_offset,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::config_error(format!("invalid value for {}", key))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup("postgres://localhost/test".into(), |key| {
            vars.get(key).cloned()
        })
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.max_connections, 5);
        assert_eq!(config.listen_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.bidding_window, Duration::seconds(300));
        assert_eq!(config.expiry_sweep_interval, std::time::Duration::from_secs(5));
        assert_eq!(config.market_offset.local_minus_utc(), 0);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("BIDDING_WINDOW_SECS", "120"),
            ("MARKET_UTC_OFFSET_MINUTES", "330"),
            ("LISTEN_ADDR", "0.0.0.0:8080"),
        ])
        .unwrap();

        assert_eq!(config.bidding_window, Duration::seconds(120));
        assert_eq!(config.market_offset.local_minus_utc(), 330 * 60);
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(config(&[("BIDDING_WINDOW_SECS", "soon")]).is_err());
        assert!(config(&[("BIDDING_WINDOW_SECS", "0")]).is_err());
        assert!(config(&[("EXPIRY_SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("MARKET_UTC_OFFSET_MINUTES", "100000")]).is_err());
    }

    #[test]
    fn oversized_window_is_a_config_error() {
        let err = config(&[("BIDDING_WINDOW_SECS", "9223372036854775807")]).unwrap_err();
        assert_eq!(err.code, 4);

        let err = config(&[("BIDDING_WINDOW_SECS", "99999999999999999999")]).unwrap_err();
        assert!(err.is_internal_error());
    }
}
