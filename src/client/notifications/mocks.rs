use std::sync::{Arc, Mutex};

use super::error::*;
use super::NotificationsClient;
use models::*;
use prelude::*;

#[derive(Clone, Default)]
pub struct NotificationsClientMock {
    sent: Arc<Mutex<Vec<(NotificationKind, TxNotification)>>>,
    failing: Arc<Mutex<bool>>,
}

impl NotificationsClientMock {
    pub fn sent(&self) -> Vec<(NotificationKind, TxNotification)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_kinds(&self) -> Vec<NotificationKind> {
        self.sent().into_iter().map(|(kind, _)| kind).collect()
    }

    /// Makes every following call fail
    pub fn set_failing(&self, is_failing: bool) {
        *self.failing.lock().unwrap() = is_failing;
    }

    fn send(&self, kind: NotificationKind, payload: TxNotification) -> Box<Future<Item = (), Error = Error> + Send> {
        if *self.failing.lock().unwrap() {
            return Box::new(future::err(ectx!(err ErrorKind::Internal, ErrorKind::Internal => kind)));
        }
        self.sent.lock().unwrap().push((kind, payload));
        Box::new(future::ok(()))
    }
}

impl NotificationsClient for NotificationsClientMock {
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
