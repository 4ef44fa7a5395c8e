//! HTTP transport used to reach the issuing authority

use std::error;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use thiserror::Error;
use url::Url;

#[cfg(feature = "reqwest")]
mod reqwest_transport;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub use reqwest_transport::ReqwestTransport;

type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// A fully built `POST` request to the token endpoint
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// The token endpoint
    pub url: Url,
    /// Request headers, including authorization
    pub headers: HeaderMap,
    /// The form-encoded request body
    pub body: String,
}

/// A response from the issuing authority
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// The response status
    pub status: StatusCode,
    /// The raw response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// The body decoded as text, replacing invalid UTF-8
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A failure to complete an HTTP exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// The authority could not be reached
    #[error("unable to connect to authority")]
    Connect(#[source] BoxError),
    /// The exchange did not complete in time
    #[error("request to authority timed out")]
    Timeout(#[source] BoxError),
    /// The response body could not be read
    #[error("error reading response body")]
    BodyRead(#[source] BoxError),
    /// The request could not be sent for a reason unrelated to connectivity
    #[error("error sending request to authority")]
    RequestSend(#[source] BoxError),
}

impl TransportError {
    /// Whether this failure happened at the connection level
    pub fn is_connection(&self) -> bool {
        !matches!(self, Self::RequestSend(_))
    }
}

/// Executes a single HTTP request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the status and body of the response
    ///
    /// Unsuccessful statuses are not errors at this layer.
    async fn send(&self, request: TokenRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: TokenRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}
