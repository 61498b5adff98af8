//! # Transport Contract
//!
//! The transport performs the network call for a frozen [`Request`]. Naja
//! wraps every call in an abortable future and applies the timeout/attempts
//! policy from the request options, so a transport only has to send once.

use crate::{
    error::BoxError,
    request::{HttpResponse, Request},
};
use futures::future::BoxFuture;
use std::future::Future;

/// Performs HTTP requests.
///
/// This trait uses native `async fn` style for static dispatch. Naja stores
/// transports as [`DynTransport`] trait objects.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a transport",
    label = "missing `Transport` implementation",
    note = "Transports must implement `send` returning an `HttpResponse`."
)]
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and resolve with the raw response.
    ///
    /// Non-2xx statuses are responses, not errors. Errors are reserved for
    /// failures that produced no response at all.
    fn send(&self, request: &Request) -> impl Future<Output = Result<HttpResponse, BoxError>> + Send;
}

/// Object-safe version of [`Transport`].
pub trait DynTransport: Send + Sync + 'static {
    /// Send `request` (dynamic dispatch version).
    fn send_dyn<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<HttpResponse, BoxError>>;
}

impl<T: Transport> DynTransport for T {
    fn send_dyn<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
        Box::pin(self.send(request))
    }
}
