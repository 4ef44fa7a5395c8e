//! The long-lived credential provider

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokenwell_clock::{Clock, DurationSecs, System, UnixTime};
use tokio::sync::watch;

use crate::{
    config::{self, keys, ConfigError, ConfigSource},
    credentials, exchange,
    identification::{IdentificationHeaderSource, UserAgent},
    transport::Transport,
    AccessToken, ApplicationId, ClientId, ClientSecret, Error, TokenRecord, TokenStatus,
};

/// The default margin before expiry at which a token is renewed
pub const DEFAULT_EXPIRATION_SAFETY_GAP: DurationSecs = DurationSecs(120);

/// A provider of bearer tokens obtained through the client credentials flow
///
/// The provider holds at most one token. Each call to
/// [`access_token()`][Self::access_token()] checks whether the cached token
/// is still valid, and if not, performs a token exchange before returning.
/// There is no background refresh.
///
/// A token is due for renewal once the time elapsed since it was issued
/// reaches its lifetime minus the
/// [expiration safety gap][Self::expiration_safety_gap()]. Elapsed time is
/// measured with the provider's [`Clock`], which for [`System`] is the wall
/// clock; adjustments to the system time while a token is cached shift when
/// it is renewed.
///
/// The provider can be shared between tasks. Concurrent callers that find
/// the cache stale may each perform an exchange; the last token received
/// replaces the others.
pub struct CredentialProvider<T, C = System> {
    client_id: ClientId,
    client_secret: ClientSecret,
    config: Arc<dyn ConfigSource>,
    transport: T,
    identification: Arc<dyn IdentificationHeaderSource>,
    clock: C,
    expiration_safety_gap: AtomicU64,
    cache: watch::Sender<Option<Arc<TokenRecord>>>,
}

impl<T: Transport> CredentialProvider<T, System> {
    /// Constructs a new credential provider
    ///
    /// An empty `client_id` or `client_secret` is replaced by the value
    /// configured under [`clientId`][keys::CLIENT_ID] or
    /// [`clientSecret`][keys::CLIENT_SECRET]. Both must be non-empty by the
    /// time a token is requested.
    ///
    /// The expiration safety gap defaults to 120 seconds unless overridden by
    /// [`accessTokenExpirationSafetyGapInSeconds`][keys::EXPIRATION_SAFETY_GAP].
    pub fn new<S>(
        config: S,
        transport: T,
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
    ) -> Result<Self, ConfigError>
    where
        S: ConfigSource + 'static,
    {
        let config: Arc<dyn ConfigSource> = Arc::new(config);

        let mut client_id = client_id.into();
        if client_id.as_str().is_empty() {
            if let Some(configured) = config::non_empty(&*config, keys::CLIENT_ID) {
                client_id = ClientId::new(configured);
            }
        }

        let mut client_secret = client_secret.into();
        if client_secret.as_str().is_empty() {
            if let Some(configured) = config::non_empty(&*config, keys::CLIENT_SECRET) {
                client_secret = ClientSecret::new(configured);
            }
        }

        let expiration_safety_gap = config::parse_u64(&*config, keys::EXPIRATION_SAFETY_GAP)?
            .unwrap_or(DEFAULT_EXPIRATION_SAFETY_GAP.0);

        let (cache, _) = watch::channel(None);

        Ok(Self {
            client_id,
            client_secret,
            config,
            transport,
            identification: Arc::new(UserAgent::default()),
            clock: System,
            expiration_safety_gap: AtomicU64::new(expiration_safety_gap),
            cache,
        })
    }

    /// Constructs a new credential provider taking both credentials from
    /// configuration
    pub fn from_config<S>(config: S, transport: T) -> Result<Self, ConfigError>
    where
        S: ConfigSource + 'static,
    {
        Self::new(config, transport, String::new(), String::new())
    }
}

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
impl CredentialProvider<crate::transport::ReqwestTransport, System> {
    /// Constructs a new credential provider that talks to the authority
    /// using `reqwest`
    ///
    /// The transport honours the connection timeout in `config`.
    pub fn with_reqwest<S>(
        config: S,
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
    ) -> Result<Self, Error>
    where
        S: ConfigSource + 'static,
    {
        let transport = crate::transport::ReqwestTransport::from_config(&config)?;
        Ok(Self::new(config, transport, client_id, client_secret)?)
    }
}

impl<T, C> CredentialProvider<T, C> {
    /// Replaces the source of identification headers
    ///
    /// By default, a [`UserAgent`] naming this crate is sent.
    pub fn with_identification(
        mut self,
        identification: impl IdentificationHeaderSource + 'static,
    ) -> Self {
        self.identification = Arc::new(identification);
        self
    }

    /// Sets the expiration safety gap
    pub fn with_expiration_safety_gap(self, gap: DurationSecs) -> Self {
        self.set_expiration_safety_gap(gap);
        self
    }

    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> CredentialProvider<T, D> {
        CredentialProvider {
            client_id: self.client_id,
            client_secret: self.client_secret,
            config: self.config,
            transport: self.transport,
            identification: self.identification,
            clock,
            expiration_safety_gap: self.expiration_safety_gap,
            cache: self.cache,
        }
    }

    /// The client ID used to request tokens
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// The margin before a token's expiry at which it is renewed
    pub fn expiration_safety_gap(&self) -> DurationSecs {
        DurationSecs(self.expiration_safety_gap.load(Ordering::Relaxed))
    }

    /// Changes the margin before a token's expiry at which it is renewed
    ///
    /// A gap longer than the lifetime of issued tokens causes an exchange
    /// on every call.
    pub fn set_expiration_safety_gap(&self, gap: DurationSecs) {
        self.expiration_safety_gap.store(gap.0, Ordering::Relaxed);
    }

    /// The most recently obtained token, whether or not it is still valid
    pub fn cached_token(&self) -> Option<Arc<TokenRecord>> {
        self.cache.borrow().clone()
    }

    /// The application ID reported with the most recent token
    pub fn application_id(&self) -> Option<ApplicationId> {
        self.cache
            .borrow()
            .as_ref()
            .and_then(|t| t.application_id().map(ToOwned::to_owned))
    }

    /// The lifetime reported with the most recent token
    pub fn access_token_expiration(&self) -> Option<DurationSecs> {
        self.cache.borrow().as_ref().map(|t| t.lifetime())
    }

    /// The time the most recent token was received
    pub fn access_token_last_creation(&self) -> Option<UnixTime> {
        self.cache.borrow().as_ref().map(|t| t.issued())
    }

    /// Observes every token stored by this provider
    ///
    /// The receiver is notified each time an exchange succeeds.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<TokenRecord>>> {
        self.cache.subscribe()
    }
}

impl<T, C> CredentialProvider<T, C>
where
    T: Transport,
    C: Clock + Send + Sync,
{
    /// Gets the status of the cached token without performing an exchange
    pub fn token_status(&self) -> TokenStatus {
        match &*self.cache.borrow() {
            Some(token) => token.token_status_at(self.clock.now(), self.expiration_safety_gap()),
            None => TokenStatus::Absent,
        }
    }

    /// Gets a valid access token, performing an exchange if required
    ///
    /// The returned value includes the token type, e.g. `Bearer A21A…`, and
    /// can be used as an `Authorization` header as-is. If the exchange fails,
    /// the error is returned and the cache is left as it was; the next call
    /// attempts a new exchange.
    pub async fn access_token(&self) -> Result<AccessToken, Error> {
        let safety_gap = self.expiration_safety_gap();

        if let Some(token) = self.cached_token() {
            let now = self.clock.now();
            if token.is_valid_at(now, safety_gap) {
                tracing::trace!(
                    renew_at = token.renew_at(safety_gap).0,
                    "using cached token"
                );
                return Ok(token.value().to_owned());
            }

            tracing::debug!(
                issued = token.issued().0,
                lifetime = token.lifetime().0,
                safety_gap = safety_gap.0,
                now = now.0,
                "cached token due for renewal"
            );
        } else {
            tracing::debug!("no cached token, requesting one");
        }

        let token = Arc::new(self.exchange().await?);
        let value = token.value().to_owned();
        self.cache.send_replace(Some(token));

        Ok(value)
    }

    async fn exchange(&self) -> Result<TokenRecord, Error> {
        let encoded = credentials::encode(&self.client_id, &self.client_secret)?;
        let token_url = config::resolve_token_url(&*self.config)?;

        exchange::request_token(
            &self.transport,
            token_url,
            &self.client_id,
            &encoded,
            &*self.identification,
            &self.clock,
        )
        .await
    }
}

impl<T, C> fmt::Debug for CredentialProvider<T, C>
where
    T: fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("transport", &self.transport)
            .field("clock", &self.clock)
            .field("expiration_safety_gap", &self.expiration_safety_gap())
            .field("cached_token", &*self.cache.borrow())
            .finish()
    }
}
