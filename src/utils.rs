use failure::Fail;
use futures::future;
use futures::prelude::*;
use hyper;
use sentry::integrations::failure::capture_error;

/// Cause chain of `error`, the root cause first, followed by backtrace lines of this crate
pub fn format_error<E: Fail>(error: &E) -> String {
    let mut chain: Vec<String> = Vec::new();
    let mut iter: Option<&Fail> = Some(error);
    while let Some(e) = iter {
        chain.push(format!("{}\n", e));
        iter = e.cause();
    }
    chain.reverse();
    let mut result = chain.concat();
    if let Some(bt) = error.backtrace() {
        let bt = format!("{}", bt);
        let lines: Vec<&str> = bt.split('\n').skip(1).collect();
        if lines.is_empty() {
            result.push_str("\nRelevant backtrace:\n");
        }
        lines.chunks(2).for_each(|chunk| {
            if let Some(line1) = chunk.get(0) {
                if line1.contains("wallet_core_lib") {
                    result.push_str(line1);
                    result.push_str("\n");
                    if let Some(line2) = chunk.get(1) {
                        result.push_str(line2);
                        result.push_str("\n");
                    }
                }
            }
        });
    }
    result
}

/// Formats every error of a batch, so that they can be reported as one aggregated error
pub fn format_errors<'a, E: Fail, I: IntoIterator<Item = &'a E>>(errors: I) -> Vec<String> {
    errors.into_iter().map(|e| format_error(e)).collect()
}

pub fn log_error<E: Fail>(error: &E) {
    error!("\n{}", format_error(error));
}

/// Also reports the error to sentry, if it is configured
pub fn log_and_capture_error<E: Fail>(error: E) {
    log_error(&error);
    capture_error(&error.into());
}

pub fn log_warn<E: Fail>(error: &E) {
    warn!("\n{}", format_error(error));
}

pub fn read_body(body: hyper::Body) -> impl Future<Item = Vec<u8>, Error = hyper::Error> {
    body.fold(Vec::new(), |mut acc, chunk| {
        acc.extend_from_slice(&*chunk);
        future::ok::<_, hyper::Error>(acc)
    })
}
