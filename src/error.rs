// src/error.rs
//! Error taxonomy for coupon signing, identity provisioning and submission.
//!
//! Each failure class gets its own type so callers can branch on the kind of
//! failure instead of parsing messages:
//! - [`EncodingError`]: the coupon record is malformed (not retryable)
//! - [`SigningError`]: key or primitive fault while signing (not retryable)
//! - [`CryptoFailure`]: key generation fault (fatal to the process)
//! - [`CsrBuildError`]: identity fields rejected while building a CSR
//! - [`TransportFailure`]: network/HTTP fault (retryable by the caller)

use thiserror::Error;

/// The coupon record violates its schema or cannot be framed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// A required field is missing, zero or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A field carries a value outside its allowed range.
    #[error("field `{field}` out of range: {value}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// Base64 text could not be decoded back into bytes.
    #[error("invalid base64 text: {0}")]
    Base64(String),

    /// The bytes do not decode as the expected record.
    #[error("invalid record encoding: {0}")]
    Decode(String),

    /// A QR payload does not contain the `|` delimiter.
    #[error("qr payload has no delimiter")]
    MissingDelimiter,

    /// A framed component contains the protocol delimiter.
    #[error("component `{0}` contains the protocol delimiter")]
    DelimiterInComponent(&'static str),
}

/// Signing or signature verification failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    /// The private key could not be parsed.
    #[error("malformed private key: {0}")]
    MalformedKey(String),

    /// The signature primitive rejected the input.
    #[error("signature primitive failed: {0}")]
    Primitive(String),

    /// The signature text is not valid base64 or has the wrong width.
    #[error("malformed signature text: {0}")]
    MalformedSignature(String),

    /// The signature does not verify against the supplied key.
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Key generation failed. No identity can be established after this.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("key generation failed: {0}")]
pub struct CryptoFailure(pub String);

/// The identity request could not be turned into a CSR.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CsrBuildError {
    /// An identity field is empty or zero.
    #[error("identity field `{0}` is empty")]
    EmptyField(&'static str),

    /// The tax identifier (NUI) is outside the 9-digit range.
    #[error("tax identifier {0} is not a 9-digit number")]
    InvalidTaxId(u64),

    /// The country code is not 2 or 3 uppercase ASCII letters.
    #[error("invalid country code `{0}`")]
    InvalidCountry(String),

    /// The ASN.1 structure could not be built or encoded.
    #[error("csr encoding failed: {0}")]
    Encoding(String),

    /// A CSR subject is missing an expected attribute or has a bad value.
    #[error("csr subject attribute `{0}` missing or malformed")]
    Subject(&'static str),
}

/// Classification of a failed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// The connection could not be established or was dropped.
    Connection,
    /// The caller-supplied deadline expired.
    Timeout,
    /// The request could not be built or sent for another reason.
    Request,
}

/// A submission attempt did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport failure ({kind:?}): {message}")]
pub struct TransportFailure {
    /// What went wrong.
    pub kind: FailureKind,
    /// Underlying cause or response body.
    pub message: String,
}

impl TransportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() {
            FailureKind::Connection
        } else if let Some(status) = err.status() {
            FailureKind::Status(status.as_u16())
        } else {
            FailureKind::Request
        };
        TransportFailure::new(kind, err.to_string())
    }
}

/// Errors raised by the coupon signing pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("unknown environment `{0}` (expected `test` or `production`)")]
    UnknownEnvironment(String),
}
