use std::collections::HashMap;
use std::sync::Arc;

use failure::Fail;

use super::capabilities::*;
use super::error::*;
use super::registry::{DialParams, Registry};
use client::HttpClient;
use models::*;
use utils::format_errors;

/// Dialed coin adapters, looked up by coin symbol.
///
/// All `dial` calls happen at startup through `&mut self`. After that the coordinator
/// is shared behind an `Arc` and only read.
pub struct Coordinator {
    registry: Registry,
    http_client: Arc<HttpClient>,
    adapters: HashMap<CoinSymbol, Capabilities>,
}

impl Coordinator {
    pub fn new(registry: Registry, http_client: Arc<HttpClient>) -> Self {
        Self {
            registry,
            http_client,
            adapters: HashMap::new(),
        }
    }

    pub fn dial(&mut self, params: DialParams) -> Result<(), Error> {
        let coin = params.coin.clone();
        let chain = self
            .registry
            .lookup(&coin)
            .ok_or(ectx!(try err ErrorKind::CoinUnsupported, ErrorContext::Dial, ErrorKind::CoinUnsupported => coin))?;
        let capabilities = chain.connect(self.http_client.clone(), &params)?;
        info!(
            "Dialed {} node at {} as {:?}, services: {:?}",
            coin,
            params.host,
            chain,
            capabilities.provided()
        );
        if let Some(previous) = self.adapters.insert(coin.clone(), capabilities) {
            warn!("Coin {} was dialed twice, closing the previous adapter", coin);
            if let Some(closer) = previous.closer {
                closer.close()?;
            }
        }
        Ok(())
    }

    /// Closes every adapter, even if some of them fail to close
    pub fn close(&self) -> Result<(), Error> {
        let errors: Vec<Error> = self
            .adapters
            .iter()
            .filter_map(|(coin, capabilities)| capabilities.closer.as_ref().map(|closer| (coin, closer)))
            .filter_map(|(coin, closer)| {
                debug!("Closing {} adapter", coin);
                closer.close().err()
            }).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            let messages = format_errors(errors.iter());
            Err(ectx!(err ErrorContext::Close(messages), ErrorKind::Internal))
        }
    }

    pub fn dialed(&self) -> Vec<CoinSymbol> {
        let mut coins: Vec<_> = self.adapters.keys().cloned().collect();
        coins.sort();
        coins
    }

    pub fn generator(&self, coin: &CoinSymbol) -> Result<Arc<Generator>, Error> {
        self.capability(coin, Capability::Generator, |c| c.generator.clone())
    }

    pub fn wallet_observer(&self, coin: &CoinSymbol) -> Result<Arc<WalletObserver>, Error> {
        self.capability(coin, Capability::WalletObserver, |c| c.wallet_observer.clone())
    }

    pub fn account_observer(&self, coin: &CoinSymbol) -> Result<Arc<AccountObserver>, Error> {
        self.capability(coin, Capability::AccountObserver, |c| c.account_observer.clone())
    }

    pub fn txs_observer(&self, coin: &CoinSymbol) -> Result<Arc<TxsObserver>, Error> {
        self.capability(coin, Capability::TxsObserver, |c| c.txs_observer.clone())
    }

    pub fn tx_sender(&self, coin: &CoinSymbol) -> Result<Arc<TxSender>, Error> {
        self.capability(coin, Capability::TxSender, |c| c.tx_sender.clone())
    }

    pub fn watcher_loop(&self, coin: &CoinSymbol) -> Result<Arc<WatcherLoop>, Error> {
        self.capability(coin, Capability::WatcherLoop, |c| c.watcher_loop.clone())
    }

    pub fn txs_history(&self, coin: &CoinSymbol) -> Result<Arc<TxsHistory>, Error> {
        self.capability(coin, Capability::TxsHistory, |c| c.txs_history.clone())
    }

    /// Installs prebuilt capabilities, bypassing the registry
    #[cfg(test)]
    pub fn attach(&mut self, coin: CoinSymbol, capabilities: Capabilities) {
        self.adapters.insert(coin, capabilities);
    }

    fn capability<T: ?Sized, F>(&self, coin: &CoinSymbol, capability: Capability, f: F) -> Result<Arc<T>, Error>
    where
        F: FnOnce(&Capabilities) -> Option<Arc<T>>,
    {
        let capabilities = self
            .adapters
            .get(coin)
            .ok_or(ectx!(try err ErrorKind::NoSuchCoin, ErrorKind::NoSuchCoin => coin, capability))?;
        f(capabilities).ok_or(ectx!(err ErrorKind::NotImplemented, ErrorKind::NotImplemented => coin, capability))
    }
}
