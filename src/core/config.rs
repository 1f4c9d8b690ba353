//! Runtime settings, read from the environment (and `.env`) once at start-up.

use crate::core::session::DEFAULT_REPLY_DELAY;
use di::{inject, injectable};
use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    /// Pause between a visitor message and the assistant reply.
    pub reply_delay: Duration,
    pub bind_address: String,
    pub allowed_origins: Vec<String>,
}

#[injectable]
impl AssistantConfig {
    #[inject]
    pub fn create() -> AssistantConfig {
        dotenvy::dotenv().ok();
        AssistantConfig::from_lookup(|key| env::var(key).ok())
    }
}

impl AssistantConfig {
    /// Builds the config from any key lookup; unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AssistantConfig {
        let reply_delay = lookup("ASSISTANT_REPLY_DELAY_MS")
            .and_then(|raw| parse_or_warn::<u64>("ASSISTANT_REPLY_DELAY_MS", &raw))
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REPLY_DELAY);

        let bind_address =
            lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned());

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();

        AssistantConfig {
            reply_delay,
            bind_address,
            allowed_origins,
        }
    }

    pub fn with_reply_delay(mut self, reply_delay: Duration) -> Self {
        self.reply_delay = reply_delay;
        self
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        AssistantConfig::from_lookup(|_| None)
    }
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    let parsed = T::from_str(raw.trim()).ok();
    if parsed.is_none() {
        warn!("ignoring invalid {key}={raw:?}");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();

        assert_eq!(config.reply_delay, Duration::from_millis(1000));
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(
            config.allowed_origins,
            ["http://localhost:3000", "http://localhost:5173"]
        );
    }

    #[test]
    fn test_values_from_environment() {
        let config = AssistantConfig::from_lookup(lookup(&[
            ("ASSISTANT_REPLY_DELAY_MS", "250"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("ALLOWED_ORIGINS", "https://example.com, ,https://foo.dev "),
        ]));

        assert_eq!(config.reply_delay, Duration::from_millis(250));
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.allowed_origins, ["https://example.com", "https://foo.dev"]);
    }

    #[test]
    fn test_invalid_delay_falls_back() {
        let config = AssistantConfig::from_lookup(lookup(&[("ASSISTANT_REPLY_DELAY_MS", "soon")]));
        assert_eq!(config.reply_delay, DEFAULT_REPLY_DELAY);
    }

    #[test]
    fn test_zero_delay_is_allowed() {
        let config = AssistantConfig::from_lookup(lookup(&[("ASSISTANT_REPLY_DELAY_MS", "0")]));
        assert!(config.reply_delay.is_zero());
    }
}
