use std::time::{Duration, Instant};

use futures::future::Shared;
use futures::sync::oneshot;
use tokio::timer::Delay;

use super::error::*;
use prelude::*;

/// Fires the paired `Shutdown`. Dropping the trigger without firing also counts as shutdown.
pub struct ShutdownTrigger {
    sender: oneshot::Sender<()>,
}

impl ShutdownTrigger {
    pub fn fire(self) {
        // receivers may be gone already
        let _ = self.sender.send(());
    }
}

/// Cloneable future that resolves once shutdown is requested
#[derive(Clone)]
pub struct Shutdown {
    inner: Shared<oneshot::Receiver<()>>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (sender, receiver) = oneshot::channel();
    (ShutdownTrigger { sender }, Shutdown { inner: receiver.shared() })
}

impl Future for Shutdown {
    type Item = ();
    type Error = ();

    fn poll(&mut self) -> Poll<(), ()> {
        match self.inner.poll() {
            Ok(Async::NotReady) => Ok(Async::NotReady),
            Ok(Async::Ready(_)) | Err(_) => Ok(Async::Ready(())),
        }
    }
}

impl Shutdown {
    /// Waits for `duration`. Resolves to `true` if shutdown came first.
    pub fn sleep(&self, duration: Duration) -> Box<Future<Item = bool, Error = Error> + Send> {
        let delay = Delay::new(Instant::now() + duration);
        Box::new(delay.select2(self.clone()).then(|res| match res {
            Ok(Either::A(_)) => Ok(false),
            Ok(Either::B(_)) | Err(Either::B(_)) => Ok(true),
            Err(Either::A((e, _))) => Err(ectx!(err e, ErrorSource::Timer, ErrorKind::Internal)),
        }))
    }

    /// Runs `f` unless shutdown comes first, in which case `f` is dropped and `None` is returned
    pub fn or_cancel<F>(&self, f: F) -> Box<Future<Item = Option<F::Item>, Error = F::Error> + Send>
    where
        F: Future + Send + 'static,
        F::Item: Send + 'static,
        F::Error: Send + 'static,
    {
        Box::new(f.select2(self.clone()).then(|res| match res {
            Ok(Either::A((item, _))) => Ok(Some(item)),
            Ok(Either::B(_)) | Err(Either::B(_)) => Ok(None),
            Err(Either::A((e, _))) => Err(e),
        }))
    }
}
