//! Configuration lookup and endpoint resolution
//!
//! Configuration is supplied by a [`ConfigSource`] handed to the provider at
//! construction. The provider reads the keys in [`keys`] and nothing else.

use std::{
    borrow::Borrow,
    collections::{BTreeMap, HashMap},
    hash::Hash,
    str::FromStr,
};

use thiserror::Error;
use url::Url;

/// Configuration keys read by the provider
pub mod keys {
    /// Explicit override for the OAuth token endpoint base
    pub const OAUTH_ENDPOINT: &str = "oauth.EndPoint";
    /// Explicit override for the general API endpoint base
    pub const SERVICE_ENDPOINT: &str = "service.EndPoint";
    /// Deployment mode, either `live` or `sandbox`
    pub const MODE: &str = "mode";
    /// Client ID used when none is given at construction
    pub const CLIENT_ID: &str = "clientId";
    /// Client secret used when none is given at construction
    pub const CLIENT_SECRET: &str = "clientSecret";
    /// Override for the default expiration safety gap, in seconds
    pub const EXPIRATION_SAFETY_GAP: &str = "accessTokenExpirationSafetyGapInSeconds";
    /// Connection timeout for the HTTP transport, in milliseconds
    pub const CONNECTION_TIMEOUT: &str = "http.ConnectionTimeout";
}

/// Base URL of the live deployment
pub const LIVE_ENDPOINT: &str = "https://api.paypal.com/";

/// Base URL of the sandbox deployment
pub const SANDBOX_ENDPOINT: &str = "https://api.sandbox.paypal.com/";

/// Path of the token endpoint relative to the resolved base
pub const TOKEN_PATH: &str = "v1/oauth2/token";

/// A source of configuration values
pub trait ConfigSource: Send + Sync {
    /// Looks up the value for `key`, if one is configured
    fn get(&self, key: &str) -> Option<String>;
}

impl<K, S> ConfigSource for HashMap<K, String, S>
where
    K: Borrow<str> + Hash + Eq + Send + Sync,
    S: std::hash::BuildHasher + Send + Sync,
{
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl<K> ConfigSource for BTreeMap<K, String>
where
    K: Borrow<str> + Ord + Send + Sync,
{
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<C: ConfigSource + ?Sized> ConfigSource for std::sync::Arc<C> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Configuration without any values
#[derive(Clone, Copy, Debug, Default)]
pub struct NoConfig;

impl ConfigSource for NoConfig {
    fn get(&self, _: &str) -> Option<String> {
        None
    }
}

/// Configuration read from environment variables
///
/// A key is looked up as `<PREFIX><KEY>`, where the key is upper-cased and
/// `.` is replaced with `_`. With the prefix `TOKENWELL_`, the key
/// `oauth.EndPoint` is read from `TOKENWELL_OAUTH_ENDPOINT`.
#[derive(Clone, Debug)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    /// Constructs a new environment configuration source
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable_name(&self, key: &str) -> String {
        let mut name = String::with_capacity(self.prefix.len() + key.len());
        name.push_str(&self.prefix);
        name.extend(key.chars().map(|c| match c {
            '.' => '_',
            c => c.to_ascii_uppercase(),
        }));
        name
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new("TOKENWELL_")
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// A named deployment of the issuing authority
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The production deployment
    Live,
    /// The sandbox deployment
    Sandbox,
}

impl Mode {
    /// The well-known base URL of this deployment
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Live => LIVE_ENDPOINT,
            Self::Sandbox => SANDBOX_ENDPOINT,
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("live") {
            Ok(Self::Live)
        } else if s.eq_ignore_ascii_case("sandbox") {
            Ok(Self::Sandbox)
        } else {
            Err(ConfigError::UnknownMode(s.to_owned()))
        }
    }
}

/// An error in the provider's configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the endpoint overrides or a deployment mode is configured
    #[error(
        "no token endpoint configured; set `{}`, `{}`, or `{}`",
        keys::OAUTH_ENDPOINT,
        keys::SERVICE_ENDPOINT,
        keys::MODE
    )]
    MissingEndpoint,

    /// The deployment mode is not one of the known deployments
    #[error("unknown mode `{0}`; expected `live` or `sandbox`")]
    UnknownMode(String),

    /// A configured endpoint is not a valid absolute URL
    #[error("invalid endpoint `{value}` in `{key}`")]
    InvalidEndpoint {
        /// The key the endpoint was read from
        key: &'static str,
        /// The configured value
        value: String,
        /// The parse error
        #[source]
        source: url::ParseError,
    },

    /// A configured value could not be parsed
    #[error("invalid value `{value}` in `{key}`")]
    InvalidValue {
        /// The key the value was read from
        key: &'static str,
        /// The configured value
        value: String,
    },
}

/// Resolves the URL of the token endpoint
///
/// The first configured of these wins: the OAuth endpoint override, the
/// general service endpoint override, the deployment mode.
pub fn resolve_token_url<S: ConfigSource + ?Sized>(config: &S) -> Result<Url, ConfigError> {
    let (key, base) = if let Some(base) = non_empty(config, keys::OAUTH_ENDPOINT) {
        (keys::OAUTH_ENDPOINT, base)
    } else if let Some(base) = non_empty(config, keys::SERVICE_ENDPOINT) {
        (keys::SERVICE_ENDPOINT, base)
    } else if let Some(mode) = non_empty(config, keys::MODE) {
        let mode: Mode = mode.parse()?;
        (keys::MODE, mode.base_url().to_owned())
    } else {
        return Err(ConfigError::MissingEndpoint);
    };

    join_token_path(&base).map_err(|source| ConfigError::InvalidEndpoint {
        key,
        value: base,
        source,
    })
}

/// Reads a seconds value, such as the safety gap override
pub(crate) fn parse_u64<S: ConfigSource + ?Sized>(
    config: &S,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match non_empty(config, key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}

pub(crate) fn non_empty<S: ConfigSource + ?Sized>(config: &S, key: &str) -> Option<String> {
    config.get(key).filter(|v| !v.trim().is_empty())
}

fn join_token_path(base: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base.trim())?;
    if base.cannot_be_a_base() {
        return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(TOKEN_PATH)
}
