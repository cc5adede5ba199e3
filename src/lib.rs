#![allow(proc_macro_derive_resolution_fallback)]

#[macro_use]
extern crate failure;
extern crate futures;
#[macro_use]
extern crate diesel;
extern crate futures_cpupool;
extern crate hyper;
extern crate r2d2;
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate serde_qs;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
extern crate config as config_crate;
extern crate base64;
extern crate chrono;
extern crate env_logger;
extern crate hyper_tls;
#[macro_use]
extern crate lazy_static;
extern crate regex;
#[macro_use]
extern crate validator_derive;
extern crate num;
extern crate validator;
#[macro_use]
extern crate sentry;
extern crate tokio;
extern crate tokio_core;
extern crate tokio_signal;
extern crate uuid;

#[macro_use]
mod macros;
mod blockchain;
mod client;
mod config;
mod logger;
mod models;
mod prelude;
mod repos;
mod schema;
mod sentry_integration;
mod services;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use futures_cpupool::CpuPool;
use tokio::runtime::Runtime;

use self::blockchain::{shutdown_channel, BlockCallback, Chain, Coordinator, NewBlock, Registry, Shutdown, ShutdownTrigger};
use self::client::{HttpClientImpl, NotificationsClientImpl};
use self::models::*;
use self::prelude::*;
use self::repos::{CoinsRepoImpl, DbExecutorImpl, TxStatusesRepoImpl, TxsExternalRepoImpl, TxsRepoImpl, WalletsRepoImpl};
use self::services::{BalancesServiceImpl, ConfirmationsService, ConfirmationsServiceImpl, Sweeper, TxsServiceImpl};
use config::Config;
use utils::{log_and_capture_error, log_error};

pub fn print_config() {
    println!("Parsed config: {:?}", get_config());
}

/// Dials the `coin` node and checks confirmations of its external txs on every new block
/// until ctrl-c. Coins without a watcher loop are checked on a fixed tick instead.
pub fn start_watcher(coin: &str) {
    logger::init();
    let config = get_config();
    // Prepare sentry integration
    let _sentry = sentry_integration::init(config.sentry.as_ref());

    let coin = CoinSymbol::new(coin);
    let params = config
        .dial_params(&coin)
        .unwrap_or_else(|| panic!("No settings for coin {} in [coins] config section", coin));
    let http_client = create_http_client(&config);
    let mut coordinator = Coordinator::new(create_registry(&config), Arc::new(http_client.clone()));
    if let Err(e) = coordinator.dial(params) {
        log_and_capture_error(e);
        panic!("Failed to dial {} node", coin);
    }
    let coordinator = Arc::new(coordinator);

    let confirmations: Arc<dyn ConfirmationsService> = Arc::new(ConfirmationsServiceImpl::new(
        Arc::new(CoinsRepoImpl),
        Arc::new(TxStatusesRepoImpl),
        Arc::new(TxsRepoImpl),
        Arc::new(TxsExternalRepoImpl),
        Arc::new(NotificationsClientImpl::new(&config, http_client)),
        coordinator.clone(),
        create_db_executor(&config),
    ));

    let mut runtime = create_runtime();
    let shutdown = shutdown_on_ctrl_c(&mut runtime);
    let job: Box<Future<Item = (), Error = ()> + Send> = match coordinator.watcher_loop(&coin) {
        Ok(watcher) => {
            watcher.on_new_block_released(confirmations_callback(confirmations, coin.clone()));
            info!("Started {} watcher", coin);
            Box::new(watcher.run(shutdown).map_err(log_and_capture_error))
        }
        Err(ref e) if e.kind() == blockchain::ErrorKind::NotImplemented => {
            let tick = Duration::from_secs(config.watcher.fallback_tick_secs);
            info!("{} adapter has no watcher loop, checking confirmations every {:?}", coin, tick);
            fallback_ticks(confirmations, coin.clone(), shutdown, tick)
        }
        Err(e) => {
            log_error(&e);
            panic!("Failed to start {} watcher", coin);
        }
    };
    let _ = runtime.block_on(job);

    if let Err(e) = coordinator.close() {
        log_error(&e);
    }
    info!("{} watcher stopped", coin);
}

/// Cancels outdated `pending` txs periodically until ctrl-c
pub fn start_sweeper() {
    logger::init();
    let config = get_config();
    // Prepare sentry integration
    let _sentry = sentry_integration::init(config.sentry.as_ref());

    let http_client = create_http_client(&config);
    // cancelling pending txs never touches a node, so nothing is dialed
    let coordinator = Arc::new(Coordinator::new(create_registry(&config), Arc::new(http_client.clone())));
    let db_executor = create_db_executor(&config);
    let balances_service = BalancesServiceImpl::new(coordinator.clone(), Arc::new(TxsRepoImpl), db_executor.clone());
    let txs_service = TxsServiceImpl::new(
        Arc::new(CoinsRepoImpl),
        Arc::new(TxStatusesRepoImpl),
        Arc::new(TxsRepoImpl),
        Arc::new(TxsExternalRepoImpl),
        Arc::new(WalletsRepoImpl),
        Arc::new(balances_service),
        Arc::new(NotificationsClientImpl::new(&config, http_client)),
        coordinator,
        db_executor,
    );
    let sweeper = Sweeper::new(
        Arc::new(txs_service),
        Duration::from_secs(config.sweeper.interval_secs),
        chrono::Duration::seconds(config.sweeper.max_pending_age_secs),
    );

    let mut runtime = create_runtime();
    let shutdown = shutdown_on_ctrl_c(&mut runtime);
    info!("Started sweeper");
    let _ = runtime.block_on(sweeper.run(shutdown).map_err(log_and_capture_error));
    info!("Sweeper stopped");
}

fn confirmations_callback(confirmations: Arc<dyn ConfirmationsService>, coin: CoinSymbol) -> BlockCallback {
    Arc::new(move |block: NewBlock| -> Box<Future<Item = (), Error = ()> + Send> {
        debug!("New {} block {} at height {}", coin, block.hash, block.height);
        let coin = coin.clone();
        Box::new(confirmations.on_new_confirmation(coin.clone()).then(move |res| -> Result<(), ()> {
            match res {
                Ok(ref confirmed) if !confirmed.is_empty() => info!("Confirmed {} txs: {:?}", coin, confirmed),
                Ok(_) => (),
                Err(e) => log_error(&e),
            };
            Ok(())
        }))
    })
}

fn fallback_ticks(
    confirmations: Arc<dyn ConfirmationsService>,
    coin: CoinSymbol,
    shutdown: Shutdown,
    tick: Duration,
) -> Box<Future<Item = (), Error = ()> + Send> {
    let callback = confirmations_callback(confirmations, coin);
    Box::new(future::loop_fn((), move |_| {
        let shutdown = shutdown.clone();
        let block = NewBlock {
            hash: String::new(),
            height: 0,
        };
        shutdown.or_cancel(callback(block)).and_then(move |res| -> Box<Future<Item = Loop<(), ()>, Error = ()> + Send> {
            if res.is_none() {
                return Box::new(future::ok(Loop::Break(())));
            }
            Box::new(shutdown.sleep(tick).then(|res| -> Result<Loop<(), ()>, ()> {
                match res {
                    Ok(false) => Ok(Loop::Continue(())),
                    Ok(true) => Ok(Loop::Break(())),
                    Err(e) => {
                        log_error(&e);
                        Ok(Loop::Break(()))
                    }
                }
            }))
        })
    }))
}

fn shutdown_on_ctrl_c(runtime: &mut Runtime) -> Shutdown {
    let (trigger, shutdown) = shutdown_channel();
    runtime.spawn(fire_on_ctrl_c(trigger));
    shutdown
}

fn fire_on_ctrl_c(trigger: ShutdownTrigger) -> impl Future<Item = (), Error = ()> + Send {
    tokio_signal::ctrl_c().flatten_stream().into_future().then(move |res| -> Result<(), ()> {
        match res {
            Ok(_) => info!("Received ctrl-c, shutting down"),
            Err((e, _)) => error!("Failed to listen for ctrl-c, shutting down: {}", e),
        };
        trigger.fire();
        Ok(())
    })
}

fn get_config() -> Config {
    config::Config::new().unwrap_or_else(|e| panic!("Error parsing config: {}", e))
}

/// Default registry plus coins whose chain is set in config
fn create_registry(config: &Config) -> Registry {
    let mut registry = Registry::default();
    for (coin, node) in &config.coins {
        if let Some(kind) = node.chain {
            registry.register(coin.clone(), Chain::from_kind(kind, node.block_interval_secs));
        }
    }
    registry
}

fn create_http_client(config: &Config) -> HttpClientImpl {
    HttpClientImpl::new(config).unwrap_or_else(|e| {
        log_error(&e);
        panic!("Failed to create http client");
    })
}

fn create_runtime() -> Runtime {
    Runtime::new().unwrap_or_else(|e| panic!("Failed to start tokio runtime: {}", e))
}

fn create_db_executor(config: &Config) -> DbExecutorImpl {
    DbExecutorImpl::new(create_db_pool(config), CpuPool::new(config.cpu_pool.size))
}

fn create_db_pool(config: &Config) -> PgPool {
    let database_url = config.database.url.clone();
    let manager = ConnectionManager::<PgConnection>::new(database_url.clone());
    r2d2::Pool::builder()
        .build(manager)
        .unwrap_or_else(|_| panic!("Failed to connect to db with url: {}", database_url))
}
