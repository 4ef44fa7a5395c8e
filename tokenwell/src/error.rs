//! Errors surfaced while obtaining an access token

use std::{error, fmt};

use http::StatusCode;
use thiserror::Error;

use crate::{config::ConfigError, transport::TransportError};

/// Which half of the client credentials was missing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialKind {
    /// The client ID
    ClientId,
    /// The client secret
    ClientSecret,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::ClientId => "client ID",
            Self::ClientSecret => "client secret",
        })
    }
}

/// An error while attempting to obtain an access token
///
/// A failed attempt never modifies the cached token, and none of these
/// errors is retried internally. [`Error::is_retryable()`] indicates whether
/// a caller-side retry has a chance of succeeding.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The client ID or client secret is empty
    #[error("missing {0}")]
    MissingCredential(CredentialKind),

    /// The client credentials could not be encoded for transmission
    #[error("client credentials could not be encoded")]
    InvalidCredential {
        /// The underlying encoding error
        #[source]
        source: http::header::InvalidHeaderValue,
    },

    /// No usable endpoint configuration is available
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The issuing authority rejected the client credentials
    #[error("authority rejected client credentials: {body}")]
    Identity {
        /// The body of the rejection
        body: String,
    },

    /// The issuing authority responded with an unsuccessful status
    #[error("error requesting token from authority ({status}): {body}")]
    Http {
        /// The response status
        status: StatusCode,
        /// The body of the error
        body: String,
    },

    /// The issuing authority could not be reached
    #[error("unable to reach authority")]
    Connection(#[source] TransportError),

    /// Any other failure while obtaining a token
    #[error("error obtaining token: {message}")]
    Provider {
        /// A description of what was being attempted
        message: &'static str,
        /// The underlying cause
        #[source]
        source: Box<dyn error::Error + Send + Sync + 'static>,
    },
}

impl Error {
    pub(crate) fn provider<E>(message: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync + 'static>>,
    {
        Self::Provider {
            message,
            source: source.into(),
        }
    }

    /// Whether the same request could succeed if retried later
    ///
    /// Only transport failures, server errors, and rate limiting are
    /// considered transient. Retry policy itself is left to the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
