pub mod error;
#[cfg(test)]
mod mocks;

use failure::Fail;
use futures::future::{self, Either};
use futures::prelude::*;
use hyper;
use hyper::{client::HttpConnector, Body, Method, Request, Response};
use hyper_tls::HttpsConnector;
use log::{self, Level};

use config::Config;
pub use self::error::*;
#[cfg(test)]
pub use self::mocks::*;
use utils::read_body;

pub type HttpFuture = Box<Future<Item = Response<Body>, Error = Error> + Send>;

pub trait HttpClient: Send + Sync + 'static {
    /// Sends the request as is, any response status is a success
    fn request_raw(&self, req: Request<Body>) -> HttpFuture;

    /// Sends the request, 4xx and 5xx responses become errors
    fn request(&self, req: Request<Body>) -> HttpFuture {
        Box::new(self.request_raw(req).and_then(check_status))
    }

    fn get(&self, uri: String) -> HttpFuture {
        let mut builder = Request::builder();
        builder.uri(uri.as_str()).method(Method::GET);
        match builder.body(Body::empty()) {
            Ok(req) => self.request(req),
            Err(e) => Box::new(future::err::<Response<Body>, Error>(ectx!(err e, ErrorSource::Hyper, ErrorKind::Internal => uri))),
        }
    }
}

#[derive(Clone)]
pub struct HttpClientImpl {
    cli: hyper::Client<HttpsConnector<HttpConnector>>,
}

impl HttpClientImpl {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let connector = HttpsConnector::new(config.client.dns_threads).map_err(ectx!(try ErrorSource::Hyper, ErrorKind::Internal))?;
        let cli = hyper::Client::builder().build(connector);
        Ok(Self { cli })
    }
}

impl HttpClient for HttpClientImpl {
    fn request_raw(&self, req: Request<Body>) -> HttpFuture {
        let cli = self.cli.clone();
        let level = log::max_level();
        if level != Level::Debug && level != Level::Trace {
            return Box::new(cli.request(req).map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal)));
        }
        let (parts, body) = req.into_parts();
        Box::new(
            read_body(body)
                .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal))
                .and_then(move |body| {
                    debug!(
                        "HttpClient, sent request {} {}, headers: {:#?}, body: {:?}",
                        parts.method,
                        parts.uri,
                        parts.headers,
                        String::from_utf8(body.clone()).ok()
                    );
                    let req = Request::from_parts(parts, body.into());
                    cli.request(req).map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal))
                }).and_then(|resp| {
                    let (parts, body) = resp.into_parts();
                    read_body(body)
                        .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal))
                        .map(|body| (parts, body))
                }).map(|(parts, body)| {
                    debug!(
                        "HttpClient, recieved response with status {} headers: {:#?} and body: {:?}",
                        parts.status.as_u16(),
                        parts.headers,
                        String::from_utf8(body.clone()).ok()
                    );
                    Response::from_parts(parts, body.into())
                }),
        )
    }
}

/// Turns error statuses into `ErrorKind`s. The body of a 422 response is kept in the error.
pub fn check_status(resp: Response<Body>) -> impl Future<Item = Response<Body>, Error = Error> + Send {
    let status = resp.status();
    if !status.is_client_error() && !status.is_server_error() {
        return Either::A(future::ok::<Response<Body>, Error>(resp));
    }
    let kind = match status.as_u16() {
        400 => ErrorKind::BadRequest,
        401 => ErrorKind::Unauthorized,
        404 => ErrorKind::NotFound,
        422 => {
            return Either::B(Either::A(read_body(resp.into_body()).then(|body| match body {
                Ok(body) => match String::from_utf8(body) {
                    Ok(body) => future::err::<Response<Body>, Error>(ectx!(err ErrorSource::Server, ErrorKind::Validation(body))),
                    Err(e) => future::err::<Response<Body>, Error>(ectx!(err e, ErrorSource::Utf8, ErrorKind::Validation(String::new()))),
                },
                Err(e) => future::err::<Response<Body>, Error>(ectx!(err e, ErrorSource::Hyper, ErrorKind::Internal)),
            })))
        }
        429 => ErrorKind::TooManyRequests,
        code => ErrorKind::Server(code),
    };
    Either::B(Either::B(future::err::<Response<Body>, Error>(ectx!(err ErrorSource::Server, kind => status))))
}
