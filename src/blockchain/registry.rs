use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use failure::Fail;

use super::capabilities::{Capabilities, Capability};
use super::error::*;
use super::{asset, bitcoin, ethereum};
use client::HttpClient;
use models::*;

/// Everything needed to connect to one coin node
#[derive(Debug, Clone, PartialEq)]
pub struct DialParams {
    pub coin: CoinSymbol,
    pub host: String,
    pub user: String,
    pub pass: String,
    pub testnet: bool,
    /// Chain specific settings, e.g. `confirmations` or `explorer_url`
    pub extra: HashMap<String, String>,
}

impl DialParams {
    pub fn extra_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, Error> {
        match self.extra.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| ectx!(err ErrorKind::MalformedInput, ErrorContext::Dial, ErrorKind::MalformedInput => key, raw)),
        }
    }

    pub fn extra_str(&self, key: &str) -> Option<String> {
        self.extra.get(key).cloned()
    }
}

/// Chain kind as written in config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Bitcoin,
    Ethereum,
    Asset,
}

pub const DEFAULT_BITCOIN_BLOCK_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_LITECOIN_BLOCK_INTERVAL_SECS: u64 = 150;

/// Node families the coordinator knows how to connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Bitcoin { block_interval_secs: u64 },
    Ethereum,
    Asset,
}

impl Chain {
    pub fn from_kind(kind: ChainKind, block_interval_secs: Option<u64>) -> Self {
        match kind {
            ChainKind::Bitcoin => Chain::Bitcoin {
                block_interval_secs: block_interval_secs.unwrap_or(DEFAULT_BITCOIN_BLOCK_INTERVAL_SECS),
            },
            ChainKind::Ethereum => Chain::Ethereum,
            ChainKind::Asset => Chain::Asset,
        }
    }

    /// Services an adapter of this chain provides once dialed
    pub fn capabilities(&self) -> &'static [Capability] {
        use self::Capability::*;
        match self {
            Chain::Bitcoin { .. } => &[Generator, WalletObserver, AccountObserver, TxsObserver, TxSender, WatcherLoop],
            Chain::Ethereum => &[
                Generator,
                WalletObserver,
                AccountObserver,
                TxsObserver,
                TxSender,
                WatcherLoop,
                TxsHistory,
            ],
            Chain::Asset => &[Generator, WalletObserver, AccountObserver, TxsObserver, TxSender],
        }
    }

    pub fn connect(&self, http_client: Arc<HttpClient>, params: &DialParams) -> Result<Capabilities, Error> {
        match self {
            Chain::Bitcoin { block_interval_secs } => bitcoin::connect(http_client, params, *block_interval_secs),
            Chain::Ethereum => ethereum::connect(http_client, params),
            Chain::Asset => asset::connect(http_client, params),
        }
    }
}

/// Coin symbol to chain table, filled before the coordinator is built
#[derive(Debug, Clone)]
pub struct Registry {
    chains: HashMap<CoinSymbol, Chain>,
}

impl Registry {
    pub fn empty() -> Self {
        Self { chains: HashMap::new() }
    }

    pub fn register(&mut self, coin: CoinSymbol, chain: Chain) {
        if let Some(previous) = self.chains.insert(coin.clone(), chain) {
            warn!("Chain {:?} for coin {} was replaced with {:?}", previous, coin, chain);
        }
    }

    pub fn lookup(&self, coin: &CoinSymbol) -> Option<Chain> {
        self.chains.get(coin).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Registry::empty();
        registry.register(
            CoinSymbol::new("BTC"),
            Chain::Bitcoin {
                block_interval_secs: DEFAULT_BITCOIN_BLOCK_INTERVAL_SECS,
            },
        );
        registry.register(
            CoinSymbol::new("LTC"),
            Chain::Bitcoin {
                block_interval_secs: DEFAULT_LITECOIN_BLOCK_INTERVAL_SECS,
            },
        );
        registry.register(CoinSymbol::new("ETH"), Chain::Ethereum);
        registry
    }
}
