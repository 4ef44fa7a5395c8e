//! A self-refreshing bearer token provider for the OAuth2 client credentials flow
//!
//! A [`CredentialProvider`] exchanges a client ID and secret for a short-lived
//! access token, keeps that token in memory, and transparently performs a new
//! exchange once the token comes within a safety gap of its expiry. Nothing
//! happens in the background: staleness is only checked when a token is
//! requested, and the caller awaits any exchange that is needed.
//!
//! The provider is assembled from a few collaborators, each of which can be
//! replaced:
//!
//! * a [`ConfigSource`][config::ConfigSource] supplying the endpoint, the
//!   deployment mode, and optionally the credentials and safety gap,
//! * a [`Transport`][transport::Transport] that performs the HTTP exchange,
//! * an [`IdentificationHeaderSource`][identification::IdentificationHeaderSource]
//!   naming the calling client, and
//! * a [`Clock`][tokenwell_clock::Clock] used to judge token lifetimes.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use tokenwell::{config::keys, CredentialProvider};
//!
//! # async fn run() -> Result<(), tokenwell::Error> {
//! let config: HashMap<String, String> =
//!     [(keys::MODE.to_owned(), "sandbox".to_owned())].into();
//!
//! let provider = CredentialProvider::with_reqwest(config, "client-id", "client-secret")?;
//!
//! let token = provider.access_token().await?;
//! tracing::info!(token = format_args!("{:#?}", token), "access token");
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every failure surfaces to the caller as an [`Error`], classified so that a
//! caller can distinguish rejected credentials ([`Error::Identity`]) from
//! transient connectivity problems ([`Error::Connection`]). A failed exchange
//! never replaces a cached token, and the next request simply tries again.
//!
//! # Features
//!
//! * `reqwest` (default): Provides [`ReqwestTransport`][transport::ReqwestTransport],
//!   a transport backed by the [reqwest] HTTP client.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod config;
pub mod credentials;
mod error;
pub mod exchange;
pub mod identification;
mod provider;
mod tokens;
pub mod transport;

pub use braids::*;
pub use error::{CredentialKind, Error};
pub use provider::{CredentialProvider, DEFAULT_EXPIRATION_SAFETY_GAP};
pub use tokens::{TokenRecord, TokenStatus};
