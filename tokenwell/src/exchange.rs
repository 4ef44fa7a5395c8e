//! The client credentials token exchange

use http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::Deserialize;
use tokenwell_clock::{Clock, DurationSecs};
use url::Url;

use crate::{
    credentials::EncodedCredentials,
    identification::{latin1_header_value, IdentificationHeaderSource},
    transport::{TokenRequest, Transport, TransportResponse},
    ApplicationId, ClientIdRef, Error, TokenRecord,
};

/// Form body of a client credentials grant
pub const CLIENT_CREDENTIALS_BODY: &str = "grant_type=client_credentials";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    app_id: Option<String>,
}

/// Builds the token request
///
/// Identification headers are attached first so that none of them can
/// replace the authorization or content headers.
pub fn build_request<I: IdentificationHeaderSource + ?Sized>(
    token_url: Url,
    credentials: &EncodedCredentials,
    identification: &I,
) -> Result<TokenRequest, Error> {
    let mut headers = HeaderMap::new();

    for (name, value) in identification.headers() {
        headers.insert(name, latin1_header_value(&value));
    }

    headers.insert(header::AUTHORIZATION, credentials.to_header_value()?);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

    Ok(TokenRequest {
        url: token_url,
        headers,
        body: CLIENT_CREDENTIALS_BODY.to_owned(),
    })
}

/// Maps the authority's response to a token record or a classified error
pub fn classify_response<C: Clock + ?Sized>(
    resp: TransportResponse,
    clock: &C,
) -> Result<TokenRecord, Error> {
    if resp.status == StatusCode::UNAUTHORIZED {
        return Err(Error::Identity {
            body: resp.body_text(),
        });
    }

    if !resp.status.is_success() {
        return Err(Error::Http {
            status: resp.status,
            body: resp.body_text(),
        });
    }

    let body: TokenResponse = serde_json::from_slice(&resp.body)
        .map_err(|e| Error::provider("error deserializing token body from authority", e))?;

    Ok(TokenRecord::new(
        &body.token_type,
        &body.access_token,
        body.app_id.map(ApplicationId::new),
        DurationSecs(body.expires_in),
        clock.now(),
    ))
}

/// Performs one token exchange against the authority
#[tracing::instrument(
    err,
    skip(transport, token_url, client_id, credentials, identification, clock),
    fields(
        token_url = %token_url,
        credentials.client_id = %client_id,
    ),
)]
pub async fn request_token<T, I, C>(
    transport: &T,
    token_url: Url,
    client_id: &ClientIdRef,
    credentials: &EncodedCredentials,
    identification: &I,
    clock: &C,
) -> Result<TokenRecord, Error>
where
    T: Transport + ?Sized,
    I: IdentificationHeaderSource + ?Sized,
    C: Clock + ?Sized,
{
    tracing::trace!("requesting token from authority");

    let req = build_request(token_url, credentials, identification)?;

    let resp = transport.send(req).await.map_err(|e| {
        if e.is_connection() {
            Error::Connection(e)
        } else {
            Error::provider("error sending request to authority", e)
        }
    })?;

    tracing::debug!(
        response.status = resp.status.as_u16(),
        "received token response from issuing authority"
    );

    let token = classify_response(resp, clock)?;

    tracing::info!(
        has_application_id = token.application_id().is_some(),
        lifetime = token.lifetime().0,
        issued = token.issued().0,
        "received new token"
    );

    Ok(token)
}

#[cfg(test)]
mod tests {
    use tokenwell_clock::{TestClock, UnixTime};

    use super::*;
    use crate::{credentials, identification::UserAgent, ClientSecretRef};

    fn encoded() -> EncodedCredentials {
        credentials::encode(
            ClientIdRef::from_str("client"),
            ClientSecretRef::from_str("secret"),
        )
        .unwrap()
    }

    fn response(status: u16, body: &str) -> TransportResponse {
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn request_carries_required_headers() {
        let url = Url::parse("https://api.sandbox.paypal.com/v1/oauth2/token").unwrap();
        let req = build_request(url.clone(), &encoded(), &UserAgent::new("agent/1 ☃")).unwrap();

        assert_eq!(req.url, url);
        assert_eq!(req.body, "grant_type=client_credentials");
        assert_eq!(
            req.headers[header::AUTHORIZATION],
            "Basic Y2xpZW50OnNlY3JldA=="
        );
        assert!(req.headers[header::AUTHORIZATION].is_sensitive());
        assert_eq!(
            req.headers[header::CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(req.headers[header::ACCEPT], "*/*");
        assert_eq!(req.headers[header::USER_AGENT], "agent/1 ");
    }

    #[test]
    fn identification_cannot_override_authorization() {
        struct Sneaky;
        impl IdentificationHeaderSource for Sneaky {
            fn headers(&self) -> Vec<(http::HeaderName, String)> {
                vec![(header::AUTHORIZATION, "Bearer stolen".to_owned())]
            }
        }

        let url = Url::parse("https://example.com/v1/oauth2/token").unwrap();
        let req = build_request(url, &encoded(), &Sneaky).unwrap();

        assert_eq!(req.headers.get_all(header::AUTHORIZATION).iter().count(), 1);
        assert_eq!(
            req.headers[header::AUTHORIZATION],
            "Basic Y2xpZW50OnNlY3JldA=="
        );
    }

    #[test]
    fn successful_response_builds_record() {
        let clock = TestClock::new(UnixTime(42));
        let token = classify_response(
            response(
                200,
                r#"{"token_type":"Bearer","access_token":"XYZ","expires_in":3600,"app_id":"APP-1"}"#,
            ),
            &clock,
        )
        .unwrap();

        assert_eq!(token.value().as_str(), "Bearer XYZ");
        assert_eq!(token.application_id().unwrap().as_str(), "APP-1");
        assert_eq!(token.lifetime(), DurationSecs(3600));
        assert_eq!(token.issued(), UnixTime(42));
    }

    #[test]
    fn application_id_is_optional() {
        let token = classify_response(
            response(
                200,
                r#"{"scope":"openid","token_type":"Bearer","access_token":"XYZ","expires_in":32400}"#,
            ),
            &TestClock::default(),
        )
        .unwrap();

        assert!(token.application_id().is_none());
    }

    #[test]
    fn unauthorized_is_an_identity_error() {
        let err = classify_response(
            response(401, r#"{"error":"invalid_client"}"#),
            &TestClock::default(),
        )
        .unwrap_err();

        match err {
            Error::Identity { body } => assert!(body.contains("invalid_client")),
            other => panic!("expected identity error, got {:?}", other),
        }
    }

    #[test]
    fn other_failures_are_http_errors() {
        let err = classify_response(response(500, "boom"), &TestClock::default()).unwrap_err();

        match err {
            Error::Http { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("expected http error, got {:?}", other),
        }
    }

    #[test]
    fn missing_required_field_is_a_provider_error() {
        let err = classify_response(
            response(200, r#"{"token_type":"Bearer","expires_in":3600}"#),
            &TestClock::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::Provider { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
