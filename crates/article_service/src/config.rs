use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use article_core::BatchLimits;
use article_engine::{EngineConfig, DEFAULT_MAX_WORKERS};
use engine_logging::{engine_warn, parse_level};
use log::LevelFilter;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_URLS: usize = 10;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Runtime settings of the service, read from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Per-URL fetch deadline.
    pub fetch_timeout: Duration,
    /// Whole-request deadline; the batch is cancelled when it elapses.
    pub request_timeout: Duration,
    pub max_concurrency: usize,
    pub max_urls_per_request: usize,
    /// `None` disables authentication.
    pub api_key: Option<String>,
    pub rate_limit_per_minute: u32,
    pub sanitize_text: bool,
    /// Empty selects the built-in user-agent pool.
    pub user_agents: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrency: DEFAULT_MAX_WORKERS,
            max_urls_per_request: DEFAULT_MAX_URLS,
            api_key: None,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            sanitize_text: false,
            user_agents: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`; empty values count as unset, and
    /// values that fail to parse keep the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            port: parse_or(&get, "PORT", defaults.port, |raw| {
                u16::from_str(raw).ok().filter(|port| *port > 0)
            }),
            fetch_timeout: parse_or(&get, "FETCH_TIMEOUT", defaults.fetch_timeout, parse_duration),
            request_timeout: parse_or(
                &get,
                "REQUEST_TIMEOUT",
                defaults.request_timeout,
                parse_duration,
            ),
            max_concurrency: parse_or(&get, "MAX_CONCURRENCY", defaults.max_concurrency, positive),
            max_urls_per_request: parse_or(
                &get,
                "MAX_URLS_PER_REQUEST",
                defaults.max_urls_per_request,
                positive,
            ),
            api_key: get("API_KEY"),
            rate_limit_per_minute: parse_or(
                &get,
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
                positive,
            ),
            sanitize_text: parse_or(&get, "SANITIZE_TEXT", defaults.sanitize_text, parse_bool),
            user_agents: get("USER_AGENTS")
                .map(|raw| {
                    raw.split('|')
                        .map(str::trim)
                        .filter(|agent| !agent.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        engine.fetch.request_timeout = self.fetch_timeout;
        engine.extract.sanitize = self.sanitize_text;
        engine.max_workers = self.max_concurrency;
        engine.limits = BatchLimits {
            max_urls: self.max_urls_per_request,
        };
        engine.user_agents = self.user_agents.clone();
        engine
    }
}

/// Reads `LOG_LEVEL`, defaulting to `info`.
pub fn log_level_from_env() -> LevelFilter {
    std::env::var("LOG_LEVEL")
        .ok()
        .as_deref()
        .and_then(parse_level)
        .unwrap_or(LevelFilter::Info)
}

/// Parses `250ms`, `15s`, `2m` or a bare number of seconds. Zero is rejected.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let duration = if let Some(ms) = raw.strip_suffix("ms") {
        Duration::from_millis(ms.trim().parse().ok()?)
    } else if let Some(secs) = raw.strip_suffix('s') {
        Duration::from_secs(secs.trim().parse().ok()?)
    } else if let Some(mins) = raw.strip_suffix('m') {
        Duration::from_secs(mins.trim().parse::<u64>().ok()?.checked_mul(60)?)
    } else {
        Duration::from_secs(raw.parse().ok()?)
    };
    (!duration.is_zero()).then_some(duration)
}

fn parse_or<G, T, P>(get: &G, key: &str, default: T, parse: P) -> T
where
    G: Fn(&str) -> Option<String>,
    T: std::fmt::Debug,
    P: Fn(&str) -> Option<T>,
{
    let Some(raw) = get(key) else {
        return default;
    };
    match parse(&raw) {
        Some(value) => value,
        None => {
            engine_warn!("config {}={:?} is invalid; using default {:?}", key, raw, default);
            default
        }
    }
}

fn positive<T>(raw: &str) -> Option<T>
where
    T: FromStr + Default + PartialOrd,
{
    raw.parse::<T>().ok().filter(|value| *value > T::default())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(config_from(&[]), Config::default());
        assert_eq!(Config::default().bind_address().port(), 8080);
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = config_from(&[
            ("PORT", "9090"),
            ("FETCH_TIMEOUT", "3s"),
            ("REQUEST_TIMEOUT", "2m"),
            ("MAX_CONCURRENCY", "8"),
            ("MAX_URLS_PER_REQUEST", "25"),
            ("API_KEY", "s3cret"),
            ("RATE_LIMIT_PER_MINUTE", "120"),
            ("SANITIZE_TEXT", "true"),
            ("USER_AGENTS", "agent-a/1.0 | agent-b/2.0||"),
        ]);

        assert_eq!(
            config,
            Config {
                port: 9090,
                fetch_timeout: Duration::from_secs(3),
                request_timeout: Duration::from_secs(120),
                max_concurrency: 8,
                max_urls_per_request: 25,
                api_key: Some("s3cret".to_string()),
                rate_limit_per_minute: 120,
                sanitize_text: true,
                user_agents: vec!["agent-a/1.0".to_string(), "agent-b/2.0".to_string()],
            }
        );
    }

    #[test]
    fn invalid_and_non_positive_values_fall_back() {
        let config = config_from(&[
            ("PORT", "http"),
            ("FETCH_TIMEOUT", "soon"),
            ("REQUEST_TIMEOUT", "0s"),
            ("MAX_CONCURRENCY", "0"),
            ("MAX_URLS_PER_REQUEST", "-3"),
            ("RATE_LIMIT_PER_MINUTE", "lots"),
            ("SANITIZE_TEXT", "maybe"),
            ("API_KEY", "   "),
        ]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn durations_accept_suffixes() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("15s"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("1h"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn engine_config_carries_service_settings() {
        let config = config_from(&[
            ("FETCH_TIMEOUT", "7"),
            ("MAX_CONCURRENCY", "3"),
            ("MAX_URLS_PER_REQUEST", "4"),
            ("SANITIZE_TEXT", "1"),
        ]);
        let engine = config.engine_config();

        assert_eq!(engine.fetch.request_timeout, Duration::from_secs(7));
        assert_eq!(engine.max_workers, 3);
        assert_eq!(engine.limits.max_urls, 4);
        assert!(engine.extract.sanitize);
        assert!(engine.user_agents.is_empty());
    }
}
