use chrono::prelude::*;
use env_logger::Builder as EnvLogBuilder;
use log::LevelFilter as LogLevelFilter;
use std::env;
use std::io::Write;

/// Installs the global stdout logger.
///
/// Default level is `info`, `RUST_LOG` overrides it with the usual env_logger syntax,
/// e.g. `RUST_LOG=wallet_core_lib::blockchain=debug`.
pub fn init() {
    let mut builder = EnvLogBuilder::new();
    builder
        .format(|formatter, record| {
            let now = Utc::now();
            writeln!(
                formatter,
                "{} - {:5} - {} - {}",
                now.to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            )
        }).filter(None, LogLevelFilter::Info);

    if let Ok(v) = env::var("RUST_LOG") {
        builder.parse(&v);
    }

    // tests may init logger more than once
    if let Err(e) = builder.try_init() {
        eprintln!("Logger is already initialized: {}", e);
    }
}
