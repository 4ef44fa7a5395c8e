//! Encoding of client credentials for HTTP Basic authorization

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::HeaderValue;

use crate::{ClientIdRef, ClientSecretRef, CredentialKind, Error};

/// Client credentials encoded as an HTTP Basic authorization value
///
/// The encoded form is as sensitive as the secret it contains, so it is
/// never revealed through `Debug`.
#[derive(Clone)]
pub struct EncodedCredentials {
    encoded: String,
}

impl EncodedCredentials {
    /// The base64 encoding of `"<client_id>:<client_secret>"`
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Builds the `Authorization` header value, marked as sensitive
    pub fn to_header_value(&self) -> Result<HeaderValue, Error> {
        let mut value = HeaderValue::try_from(format!("Basic {}", self.encoded))
            .map_err(|source| Error::InvalidCredential { source })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for EncodedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("***ENCODED CREDENTIALS***")
    }
}

/// Encodes the client ID and secret for Basic authorization
///
/// Fails with [`Error::MissingCredential`] when either half is empty. The
/// UTF-8 bytes of `"<client_id>:<client_secret>"` are encoded as-is.
pub fn encode(
    client_id: &ClientIdRef,
    client_secret: &ClientSecretRef,
) -> Result<EncodedCredentials, Error> {
    if client_id.as_str().is_empty() {
        return Err(Error::MissingCredential(CredentialKind::ClientId));
    }

    if client_secret.as_str().is_empty() {
        return Err(Error::MissingCredential(CredentialKind::ClientSecret));
    }

    let raw = format!("{}:{}", client_id.as_str(), client_secret.as_str());
    let encoded = EncodedCredentials {
        encoded: STANDARD.encode(raw.as_bytes()),
    };

    encoded.to_header_value()?;

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(encoded: &EncodedCredentials) -> String {
        let bytes = STANDARD.decode(encoded.as_str()).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn encoding_round_trips() {
        let encoded = encode(
            ClientIdRef::from_str("client-id"),
            ClientSecretRef::from_str("s3cr3t:with:colons"),
        )
        .unwrap();

        assert_eq!(decode(&encoded), "client-id:s3cr3t:with:colons");
    }

    #[test]
    fn encoding_is_deterministic() {
        let id = ClientIdRef::from_str("Aa1-ü");
        let secret = ClientSecretRef::from_str("ß€");

        let first = encode(id, secret).unwrap();
        let second = encode(id, secret).unwrap();

        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(decode(&first), "Aa1-ü:ß€");
    }

    #[test]
    fn known_value() {
        let encoded = encode(
            ClientIdRef::from_str("Aladdin"),
            ClientSecretRef::from_str("open sesame"),
        )
        .unwrap();

        assert_eq!(encoded.as_str(), "QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert_eq!(
            encoded.to_header_value().unwrap(),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn no_normalization_is_applied() {
        let encoded = encode(
            ClientIdRef::from_str(" padded "),
            ClientSecretRef::from_str("\tsecret\n"),
        )
        .unwrap();

        assert_eq!(decode(&encoded), " padded :\tsecret\n");
    }

    #[test]
    fn empty_client_id_is_missing() {
        for secret in ["", "secret"] {
            let err = encode(ClientIdRef::from_str(""), ClientSecretRef::from_str(secret))
                .unwrap_err();
            assert!(matches!(
                err,
                Error::MissingCredential(CredentialKind::ClientId)
            ));
        }
    }

    #[test]
    fn empty_client_secret_is_missing() {
        let err = encode(ClientIdRef::from_str("id"), ClientSecretRef::from_str("")).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingCredential(CredentialKind::ClientSecret)
        ));
    }

    #[test]
    fn debug_does_not_leak() {
        let encoded = encode(ClientIdRef::from_str("id"), ClientSecretRef::from_str("pw")).unwrap();
        assert_eq!(format!("{:?}", encoded), "***ENCODED CREDENTIALS***");
    }
}
