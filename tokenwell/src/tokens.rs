use tokenwell_clock::{DurationSecs, UnixTime};

use crate::{AccessToken, AccessTokenRef, ApplicationId, ApplicationIdRef};

/// A token as returned by the authority, along with when it was issued
#[derive(Debug, Clone)]
pub struct TokenRecord {
    value: AccessToken,
    application_id: Option<ApplicationId>,
    lifetime: DurationSecs,
    issued: UnixTime,
}

/// A cached token's status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    /// No token has been obtained yet
    Absent,
    /// The token may still be used
    Fresh,
    /// The token is within the safety gap of its expiry, or past it
    Expired,
}

impl TokenRecord {
    /// Constructs a record for a token issued at `issued`
    ///
    /// The stored value is `"<token_type> <access_token>"`, ready to be used
    /// as an `Authorization` header.
    pub fn new(
        token_type: &str,
        access_token: &str,
        application_id: Option<ApplicationId>,
        lifetime: DurationSecs,
        issued: UnixTime,
    ) -> Self {
        Self {
            value: AccessToken::new(format!("{} {}", token_type, access_token)),
            application_id,
            lifetime,
            issued,
        }
    }

    /// Gets the token value, including its token type
    #[inline]
    pub fn value(&self) -> &AccessTokenRef {
        &self.value
    }

    /// Gets the application ID reported by the authority, if any
    #[inline]
    pub fn application_id(&self) -> Option<&ApplicationIdRef> {
        self.application_id.as_deref()
    }

    /// Gets the token's lifetime as reported by the authority
    #[inline]
    pub fn lifetime(&self) -> DurationSecs {
        self.lifetime
    }

    /// Gets the time that the token was issued
    #[inline]
    pub fn issued(&self) -> UnixTime {
        self.issued
    }

    /// Whether the token may still be used at `time`
    ///
    /// A token is valid while the time elapsed since issue is strictly less
    /// than its lifetime minus `safety_gap`. A gap at least as long as the
    /// lifetime makes the token immediately invalid.
    #[inline]
    pub fn is_valid_at(&self, time: UnixTime, safety_gap: DurationSecs) -> bool {
        let elapsed = i128::from(time.0) - i128::from(self.issued.0);
        let usable = i128::from(self.lifetime.0) - i128::from(safety_gap.0);
        elapsed < usable
    }

    /// Gets the token's status as of the provided time
    #[inline]
    pub fn token_status_at(&self, time: UnixTime, safety_gap: DurationSecs) -> TokenStatus {
        if self.is_valid_at(time, safety_gap) {
            TokenStatus::Fresh
        } else {
            TokenStatus::Expired
        }
    }

    /// Gets the time after which the token is due for renewal
    #[inline]
    pub fn renew_at(&self, safety_gap: DurationSecs) -> UnixTime {
        self.issued + (self.lifetime - safety_gap)
    }
}
