//! MESSAGE-INTEGRITY attribute (spec.md §4.1): 20-byte HMAC-SHA1 over
//! all preceding bytes, keyed with the short-term or long-term
//! credential.

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const SIZE: usize = 20;

/// Short-term credential key: the plain password bytes.
pub fn short_term_key(password: &str) -> Vec<u8> {
    password.as_bytes().to_vec()
}

/// Long-term credential key: `MD5(username ":" realm ":" password)`
/// (spec.md §4.2 TURN long-term-key flow).
pub fn long_term_key(username: &str, realm: &str, password: &str) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(realm.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

pub fn compute(key: &[u8], data: &[u8]) -> [u8; SIZE] {
    let mut mac = <HmacSha1 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; SIZE];
    out.copy_from_slice(&result);
    out
}

pub fn verify(key: &[u8], data: &[u8], expected: &[u8]) -> bool {
    compute(key, data).as_slice() == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_term_key_matches_rfc_formula() {
        let key = long_term_key("user", "example.com", "pass");
        let mut hasher = Md5::new();
        hasher.update(b"user:example.com:pass");
        assert_eq!(key, hasher.finalize().to_vec());
    }

    #[test]
    fn verify_detects_tampering() {
        let key = short_term_key("pw");
        let data = b"some stun message bytes";
        let mac = compute(&key, data);
        assert!(verify(&key, data, &mac));
        let mut tampered = data.to_vec();
        tampered[0] ^= 1;
        assert!(!verify(&key, &tampered, &mac));
    }
}
