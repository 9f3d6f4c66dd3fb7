use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors reported by a provider, classified so the caller can decide
/// whether to retry.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns how this error should be handled.
    fn kind(&self) -> ErrorKind;
}

/// An entry point for sampling a language model.
///
/// Providers should behave like stateless objects: callers may send
/// requests concurrently, retry them, or drop the provider at any time.
pub trait ModelProvider: Send + Sync {
    /// Connection and stream errors of this provider.
    type Error: ModelProviderError;

    /// The event stream of one request.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a request. The future resolves once the provider accepted it
    /// and the response stream is open.
    ///
    /// The returned future must not borrow `self` or `req`, everything it
    /// needs has to be captured when this method is called.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
