use std::time::Duration;

use crate::error::ClientError;

const DEFAULT_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_POLL_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    /// Refresh interval while the inbox panel is open.
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read `PULSE_URL`, `PULSE_TOKEN`, `PULSE_POLL_SECS` and
    /// `PULSE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let token = var("PULSE_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Config("PULSE_TOKEN is not set".into()))?;
        let base_url = var("PULSE_URL").unwrap_or_else(|| DEFAULT_URL.into());

        let secs = |key: &str, default: u64| -> Result<Duration, ClientError> {
            match var(key) {
                None => Ok(Duration::from_secs(default)),
                Some(v) => v
                    .parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| ClientError::Config(format!("{} must be a positive integer", key))),
            }
        };

        Ok(Self {
            base_url,
            token,
            poll_interval: secs("PULSE_POLL_SECS", DEFAULT_POLL_SECS)?,
            request_timeout: secs("PULSE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[])),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn intervals_parse_and_default() {
        let cfg = ClientConfig::from_lookup(lookup(&[("PULSE_TOKEN", "t"), ("PULSE_POLL_SECS", "5")])).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cfg.base_url, DEFAULT_URL);

        assert!(ClientConfig::from_lookup(lookup(&[("PULSE_TOKEN", "t"), ("PULSE_POLL_SECS", "0")])).is_err());
    }
}
