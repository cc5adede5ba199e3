use std::collections::HashMap;
use std::env;

use sentry_integration::SentryConfig;

use blockchain::{ChainKind, DialParams};
use config_crate::{Config as RawConfig, ConfigError, Environment, File};
use models::*;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: Database,
    pub client: Client,
    pub cpu_pool: CpuPool,
    pub coins: HashMap<CoinSymbol, CoinNode>,
    pub watcher: Watcher,
    pub sweeper: Sweeper,
    pub sentry: Option<SentryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Client {
    pub dns_threads: usize,
    pub rates_url: String,
    pub notifications_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CpuPool {
    pub size: usize,
}

/// Connection settings of one coin node, keyed by coin symbol in `[coins]`
#[derive(Debug, Deserialize, Clone)]
pub struct CoinNode {
    /// Needed only for coins the default registry doesn't know
    pub chain: Option<ChainKind>,
    pub block_interval_secs: Option<u64>,
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

/// Defaults for watcher loops, a coin's `extra` overrides them
#[derive(Debug, Deserialize, Clone)]
pub struct Watcher {
    pub retry_secs: u64,
    pub min_sleep_secs: u64,
    /// Tick of the confirmation check for coins whose adapter has no watcher loop
    pub fallback_tick_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Sweeper {
    pub interval_secs: u64,
    pub max_pending_age_secs: i64,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = RawConfig::new();
        s.merge(File::with_name("config/base"))?;

        // Merge development.toml if RUN_MODE variable is not set
        let env = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        s.merge(File::with_name(&format!("config/{}", env)).required(false))?;
        s.merge(File::with_name("config/secret.toml").required(false))?;

        s.merge(Environment::with_prefix("WALLET_CORE"))?;
        s.try_into()
    }

    /// Dial settings of `coin` with watcher defaults filled in
    pub fn dial_params(&self, coin: &CoinSymbol) -> Option<DialParams> {
        let node = self.coins.get(coin)?.clone();
        let mut extra = node.extra;
        extra
            .entry("retry_secs".to_string())
            .or_insert_with(|| self.watcher.retry_secs.to_string());
        extra
            .entry("min_sleep_secs".to_string())
            .or_insert_with(|| self.watcher.min_sleep_secs.to_string());
        Some(DialParams {
            coin: coin.clone(),
            host: node.host,
            user: node.user,
            pass: node.pass,
            testnet: node.testnet,
            extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_config() -> Config {
        let mut coins = HashMap::new();
        let mut extra = HashMap::new();
        extra.insert("retry_secs".to_string(), "3".to_string());
        coins.insert(
            CoinSymbol::new("btc"),
            CoinNode {
                chain: None,
                block_interval_secs: None,
                host: "http://localhost:18332".to_string(),
                user: "user".to_string(),
                pass: "pass".to_string(),
                testnet: true,
                extra,
            },
        );
        Config {
            database: Database { url: String::new() },
            client: Client {
                dns_threads: 1,
                rates_url: String::new(),
                notifications_url: String::new(),
            },
            cpu_pool: CpuPool { size: 1 },
            coins,
            watcher: Watcher {
                retry_secs: 30,
                min_sleep_secs: 10,
                fallback_tick_secs: 60,
            },
            sweeper: Sweeper {
                interval_secs: 60,
                max_pending_age_secs: 86400,
            },
            sentry: None,
        }
    }

    #[test]
    fn test_dial_params_lookup() {
        let config = create_config();
        let params = config.dial_params(&CoinSymbol::new("Btc")).unwrap();
        assert_eq!(params.coin, CoinSymbol::new("BTC"));
        assert_eq!(params.host, "http://localhost:18332");
        assert!(config.dial_params(&CoinSymbol::new("ETH")).is_none());
    }

    #[test]
    fn test_dial_params_keep_coin_overrides() {
        let config = create_config();
        let params = config.dial_params(&CoinSymbol::new("BTC")).unwrap();
        assert_eq!(params.extra_str("retry_secs"), Some("3".to_string()));
        assert_eq!(params.extra_str("min_sleep_secs"), Some("10".to_string()));
        assert!(params.testnet);
    }
}
