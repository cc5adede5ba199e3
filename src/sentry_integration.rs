use std::borrow::Cow;

use sentry;

#[derive(Debug, Deserialize, Clone)]
pub struct SentryConfig {
    pub dsn: String,
    /// Reported as sentry `environment`, e.g. `production`
    pub environment: Option<String>,
}

/// Guard must be kept alive for the whole process, events are flushed on drop
pub fn init(sentry_config: Option<&SentryConfig>) -> Option<sentry::internals::ClientInitGuard> {
    sentry_config.map(|config_sentry| {
        info!("Sentry integration is enabled");
        let result = sentry::init((
            config_sentry.dsn.clone(),
            sentry::ClientOptions {
                release: sentry_crate_release!(),
                environment: config_sentry.environment.clone().map(Cow::Owned),
                ..Default::default()
            },
        ));
        sentry::integrations::panic::register_panic_handler();
        result
    })
}
