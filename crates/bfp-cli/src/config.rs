use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub esplora_url: String,
    /// Satoshis per byte.
    pub fee_rate: u64,

    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,
    pub poll_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            esplora_url: lookup("BFP_ESPLORA_URL")
                .unwrap_or_else(|| "https://blockstream.info/api".to_string()),
            fee_rate: lookup("BFP_FEE_RATE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),

            fetch_retries: lookup("BFP_FETCH_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            retry_backoff_ms: lookup("BFP_RETRY_BACKOFF_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            poll_interval_ms: lookup("BFP_POLL_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000),
        }
    }

    /// Command-line flags win over the environment.
    pub fn with_overrides(mut self, esplora_url: Option<String>, fee_rate: Option<u64>) -> Self {
        if let Some(url) = esplora_url {
            self.esplora_url = url;
        }
        if let Some(rate) = fee_rate {
            self.fee_rate = rate;
        }
        self.esplora_url = self.esplora_url.trim_end_matches('/').to_string();
        self
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.esplora_url, "https://blockstream.info/api");
        assert_eq!(config.fee_rate, 1);
        assert_eq!(config.fetch_retries, 3);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_env_values_and_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BFP_ESPLORA_URL", "http://localhost:3002/"),
            ("BFP_FEE_RATE", "4"),
            ("BFP_FETCH_RETRIES", "nope"),
            ("BFP_RETRY_BACKOFF_MS", "20"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.fee_rate, 4);
        assert_eq!(config.fetch_retries, 3);
        assert_eq!(config.retry_backoff(), Duration::from_millis(20));

        let config = config.with_overrides(None, Some(9));
        assert_eq!(config.esplora_url, "http://localhost:3002");
        assert_eq!(config.fee_rate, 9);

        let config = config.with_overrides(Some("http://other".to_string()), None);
        assert_eq!(config.esplora_url, "http://other");
    }
}
