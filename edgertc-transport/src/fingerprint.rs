//! DTLS certificate fingerprint verification (spec.md §4.4).

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

/// Formats a SHA-256 digest the way SDP's `a=fingerprint` line does:
/// uppercase hex octets separated by colons.
pub fn sha256_fingerprint(certificate_der: &[u8]) -> String {
    let digest = Sha256::digest(certificate_der);
    digest
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Computes the peer certificate's fingerprint and requires an exact
/// match with the value announced over signaling; mismatch aborts the
/// session (spec.md §4.4).
pub fn verify(certificate_der: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_fingerprint(certificate_der);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::FingerprintMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_fingerprint_verifies() {
        let cert = b"fake-der-cert";
        let fp = sha256_fingerprint(cert);
        assert!(verify(cert, &fp).is_ok());
        assert!(verify(cert, &fp.to_lowercase()).is_ok());
    }

    #[test]
    fn mismatched_fingerprint_is_rejected() {
        let cert = b"fake-der-cert";
        let err = verify(cert, "00:11:22").unwrap_err();
        assert!(matches!(err, Error::FingerprintMismatch { .. }));
    }
}
