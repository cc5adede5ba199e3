mod error;
#[cfg(test)]
mod mocks;

use std::sync::Arc;

use failure::Fail;
use futures::prelude::*;
use hyper::{Body, Method, Request};
use serde_json;

pub use self::error::*;
#[cfg(test)]
pub use self::mocks::*;
use super::HttpClient;
use config::Config;
use models::*;

/// Outbound user notifications. Formatting and delivery are up to the notifications service.
pub trait NotificationsClient: Send + Sync + 'static {
    fn processed(&self, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send>;
    fn declined(&self, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send>;
    fn await_recipient(&self, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send>;
}

#[derive(Clone)]
pub struct NotificationsClientImpl {
    cli: Arc<HttpClient>,
    notifications_url: String,
}

impl NotificationsClientImpl {
    pub fn new<C: HttpClient>(config: &Config, cli: C) -> Self {
        Self {
            cli: Arc::new(cli),
            notifications_url: config.client.notifications_url.clone(),
        }
    }

    fn send(&self, kind: NotificationKind, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send> {
        let url = format!("{}/notifications/{}", self.notifications_url, kind.path());
        let url1 = url.clone();
        let cli = self.cli.clone();
        let payload_clone = payload.clone();
        Box::new(
            serde_json::to_string(&payload)
                .map_err(ectx!(ErrorSource::Json, ErrorKind::MalformedInput => payload_clone))
                .and_then(|body| {
                    let mut builder = Request::builder();
                    builder.uri(url.as_str()).method(Method::POST);
                    builder.header("Content-Type", "application/json");
                    builder
                        .body(Body::from(body))
                        .map_err(ectx!(ErrorSource::Hyper, ErrorKind::MalformedInput => url))
                }).into_future()
                .and_then(move |req| cli.request(req).map_err(ectx!(ErrorKind::Internal => url1)))
                .map(|_| ()),
        )
    }
}

impl NotificationsClient for NotificationsClientImpl {
    fn processed(&self, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send> {
        self.send(NotificationKind::Processed, payload)
    }

    fn declined(&self, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send> {
        self.send(NotificationKind::Declined, payload)
    }

    fn await_recipient(&self, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send> {
        self.send(NotificationKind::AwaitRecipient, payload)
    }
}
