//! use certbar::error::CertBarError;

use std::fmt;

use thiserror::Error;

/// Represents errors that can occur while building or signing certificates.
///
/// This enum provides detailed error messages for various failure scenarios.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertBarError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The key is neither an RSA nor an elliptic-curve key.
    #[error("Unsupported key kind: {0}")]
    UnsupportedKeyKind(String),

    /// Producing the signed certificate failed.
    #[error("Failed to sign certificate: {0}")]
    SigningError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),
}

impl From<der::Error> for CertBarError {
    /// Converts a `der::Error` into a `CertBarError`.
    fn from(err: der::Error) -> Self {
        CertBarError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertBarError {
    fn from(err: rsa::Error) -> Self {
        CertBarError::RsaError(err.to_string())
    }
}

impl From<x509_cert::spki::Error> for CertBarError {
    fn from(err: x509_cert::spki::Error) -> Self {
        CertBarError::EncodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertBarError {
    fn from(err: pkcs8::Error) -> Self {
        CertBarError::DecodingError(err.to_string())
    }
}

/// Which input of a chain verification a certificate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateRole {
    Root,
    Intermediate(usize),
    Leaf,
}

impl fmt::Display for CertificateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateRole::Root => write!(f, "root"),
            CertificateRole::Intermediate(index) => write!(f, "intermediate #{index}"),
            CertificateRole::Leaf => write!(f, "leaf"),
        }
    }
}

/// Reasons a well-formed certificate is not trusted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("certificate is not valid for host '{hostname}'")]
    HostnameMismatch { hostname: String },

    #[error("certificate '{subject}' has expired")]
    Expired { subject: String },

    #[error("certificate '{subject}' is not yet valid")]
    NotYetValid { subject: String },

    #[error("certificate '{subject}' does not allow the requested extended key usage")]
    IncompatibleUsage { subject: String },

    #[error("certificate '{subject}' is not authorized to sign other certificates")]
    NotAuthorizedToSign { subject: String },

    #[error("certificate '{subject}' exceeds the path length allowed by its issuer")]
    PathLengthExceeded { subject: String },

    #[error("signature on certificate '{subject}' does not verify")]
    BadSignature { subject: String },

    #[error("unsupported signature algorithm {oid}")]
    UnsupportedAlgorithm { oid: String },

    #[error("certificate '{subject}' is signed by an unknown authority")]
    UnknownAuthority { subject: String },

    #[error("certificate chain exceeds the maximum depth of {max}")]
    ChainTooDeep { max: usize },

    #[error("malformed certificate '{subject}': {reason}")]
    Malformed { subject: String, reason: String },
}

/// Outcome of a failed chain verification.
///
/// Parse failures and trust failures are kept apart so callers can tell a
/// broken input apart from a certificate that is simply not trusted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("failed to parse {role} certificate: {reason}")]
    Parse { role: CertificateRole, reason: String },

    #[error("certificate verification failed: {0}")]
    Untrusted(#[from] TrustError),
}

impl VerifyError {
    /// Returns `true` if the failure came from malformed input rather than a trust decision.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, VerifyError::Parse { .. })
    }
}
