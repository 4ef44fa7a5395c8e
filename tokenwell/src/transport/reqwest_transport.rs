use std::time::Duration;

use async_trait::async_trait;

use super::{TokenRequest, Transport, TransportError, TransportResponse};
use crate::config::{self, keys, ConfigSource};

/// A transport backed by a [`reqwest::Client`]
///
/// Redirects are not followed: a `3xx` from the token endpoint is returned
/// as the response, so the credentials are only ever sent to the configured
/// endpoint.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl Default for ReqwestTransport {
    /// Constructs a transport with no timeouts that does not follow redirects
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`reqwest::Client::new()`], when
    /// the TLS backend cannot be initialized.
    fn default() -> Self {
        let client = client_builder()
            .build()
            .expect("TLS backend cannot be initialized");

        Self { client }
    }
}

impl ReqwestTransport {
    /// Constructs a transport from an existing client
    ///
    /// The client should be built with [`reqwest::redirect::Policy::none()`].
    /// A client that follows redirects turns a redirected token request
    /// into a `GET` to the redirect target, carrying the credentials with it.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Constructs a transport honouring the connection timeout in `config`
    ///
    /// The timeout is read in milliseconds from
    /// [`http.ConnectionTimeout`][keys::CONNECTION_TIMEOUT] and bounds both
    /// establishing the connection and the whole exchange.
    pub fn from_config<S: ConfigSource + ?Sized>(config: &S) -> Result<Self, crate::Error> {
        let mut builder = client_builder();

        if let Some(millis) = config::parse_u64(config, keys::CONNECTION_TIMEOUT)? {
            let timeout = Duration::from_millis(millis);
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::provider("unable to build HTTP client", e))?;

        Ok(Self { client })
    }
}

fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::none())
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::RequestSend(error.into())
    } else if error.is_timeout() {
        TransportError::Timeout(error.into())
    } else {
        TransportError::Connect(error.into())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TokenRequest) -> Result<TransportResponse, TransportError> {
        let resp = self
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::BodyRead(e.into()))?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use http::{header, HeaderMap, HeaderValue, StatusCode};
    use url::Url;
    use wiremock::{
        matchers::{body_string, header as has_header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn request(url: Url) -> TokenRequest {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        TokenRequest {
            url,
            headers,
            body: "grant_type=client_credentials".to_owned(),
        }
    }

    #[tokio::test]
    async fn returns_unsuccessful_status_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .and(has_header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/v1/oauth2/token", server.uri())).unwrap();
        let resp = ReqwestTransport::default().send(request(url)).await.unwrap();

        assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.body_text(), "try later");
    }

    #[tokio::test]
    async fn redirects_are_returned_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/v1/oauth2/token", server.uri())).unwrap();

        let resp = ReqwestTransport::default().send(request(url.clone())).await.unwrap();
        assert_eq!(resp.status, StatusCode::FOUND);

        let resp = ReqwestTransport::from_config(&HashMap::<String, String>::new())
            .unwrap()
            .send(request(url))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let url = Url::parse(&format!("http://127.0.0.1:{}/v1/oauth2/token", port)).unwrap();
        let err = ReqwestTransport::default()
            .send(request(url))
            .await
            .unwrap_err();

        assert!(err.is_connection(), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn slow_authority_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config: HashMap<String, String> =
            [(keys::CONNECTION_TIMEOUT.to_owned(), "100".to_owned())].into();
        let transport = ReqwestTransport::from_config(&config).unwrap();

        let url = Url::parse(&format!("{}/v1/oauth2/token", server.uri())).unwrap();
        let err = transport.send(request(url)).await.unwrap_err();

        assert!(matches!(err, TransportError::Timeout(_)), "{:?}", err);
    }

    #[test]
    fn invalid_timeout_is_a_config_error() {
        let config: HashMap<String, String> =
            [(keys::CONNECTION_TIMEOUT.to_owned(), "fast".to_owned())].into();

        let err = ReqwestTransport::from_config(&config).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
