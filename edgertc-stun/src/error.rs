use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// STUN/TURN codec error taxonomy (spec.md §4.1, §7).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Shared(#[from] shared::Error),

    #[error("magic cookie mismatch")]
    MagicCookieMismatch,
    #[error("attribute truncated")]
    TruncatedAttribute,
    #[error("more than one MESSAGE-INTEGRITY attribute present")]
    MultipleIntegrityAttributes,
    #[error("more than one FINGERPRINT attribute present")]
    MultipleFingerprintAttributes,
    #[error("MESSAGE-INTEGRITY is not last or second-to-last attribute")]
    IntegrityNotLast,
    #[error("FINGERPRINT is not the last attribute")]
    FingerprintNotLast,
    #[error("an attribute follows FINGERPRINT or MESSAGE-INTEGRITY out of order")]
    AttributeOrderViolation,
    #[error("MESSAGE-INTEGRITY verification failed")]
    IntegrityMismatch,
    #[error("FINGERPRINT verification failed")]
    FingerprintMismatch,
    #[error("invalid length for attribute type {0:#06x}")]
    InvalidAttributeLength(u16),
    #[error("attribute count exceeds the configured maximum")]
    MaxAttributeCount,
    #[error("attribute not found: {0:#06x}")]
    AttributeNotFound(u16),
}
