//! Caller identification headers attached to token requests

use http::{header, HeaderName, HeaderValue};

/// A source of headers identifying the calling client
pub trait IdentificationHeaderSource: Send + Sync {
    /// The headers to attach to each token request
    fn headers(&self) -> Vec<(HeaderName, String)>;
}

impl<T: IdentificationHeaderSource + ?Sized> IdentificationHeaderSource for std::sync::Arc<T> {
    fn headers(&self) -> Vec<(HeaderName, String)> {
        (**self).headers()
    }
}

/// Identifies the client with a `User-Agent` header
///
/// The default value names this crate and the platform it runs on, e.g.
/// `tokenwell/0.1.0 (lang=Rust; os=linux; arch=x86_64)`.
#[derive(Clone, Debug)]
pub struct UserAgent {
    value: String,
}

impl UserAgent {
    /// Uses a custom `User-Agent` value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// The header value before sanitization
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Default for UserAgent {
    fn default() -> Self {
        Self::new(format!(
            "{}/{} (lang=Rust; os={}; arch={})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
        ))
    }
}

impl IdentificationHeaderSource for UserAgent {
    fn headers(&self) -> Vec<(HeaderName, String)> {
        vec![(header::USER_AGENT, self.value.clone())]
    }
}

/// Attaches no identification
#[derive(Clone, Copy, Debug, Default)]
pub struct Anonymous;

impl IdentificationHeaderSource for Anonymous {
    fn headers(&self) -> Vec<(HeaderName, String)> {
        Vec::new()
    }
}

/// Converts a value to a single-byte (ISO-8859-1) header value
///
/// Characters above U+00FF have no single-byte representation, and control
/// characters other than tab are not legal in a header; both are dropped.
pub fn latin1_header_value(value: &str) -> HeaderValue {
    let bytes: Vec<u8> = value
        .chars()
        .filter_map(|c| u8::try_from(u32::from(c)).ok())
        .filter(|&b| b == b'\t' || (b >= 0x20 && b != 0x7f))
        .collect();

    // every remaining byte is a legal header byte
    HeaderValue::from_bytes(&bytes).unwrap_or_else(|_| HeaderValue::from_static(""))
}
