//! # QR Signer
//!
//! Produces and checks authenticity of the canonical intent payload using
//! a shared secret. Stateless; a pure function of the secret key.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer over the canonical payload.
///
/// The payload serialization contract lives in
/// [`qr_core::canonical_payload`]; this type only cares about bytes in,
/// hex MAC out.
#[derive(Clone)]
pub struct QrSigner {
    secret: Vec<u8>,
}

impl QrSigner {
    /// Create a signer from a shared secret.
    ///
    /// Secret presence and minimum length are validated at config load,
    /// before any signer exists; a misconfigured secret is a startup
    /// failure, not a per-request error.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign the canonical payload, returning a hex-encoded MAC
    pub fn sign(&self, canonical: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a signature against the canonical payload.
    ///
    /// Never errors; returns false on any mismatch. The comparison is
    /// constant-time so timing does not correlate with how many bytes
    /// matched.
    pub fn verify(&self, canonical: &str, signature: &str) -> bool {
        constant_time_compare(&self.sign(canonical), signature)
    }
}

impl std::fmt::Debug for QrSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrSigner").finish_non_exhaustive()
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qr_core::{canonical_payload, Currency, Money};

    fn signer() -> QrSigner {
        QrSigner::new("a-signing-secret-of-sufficient-length")
    }

    #[test]
    fn test_sign_produces_hex_mac() {
        let sig = signer().sign("qr_1|nonce|10000|usd|ord_1|1735732800");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let payload = "qr_1|nonce|10000|usd|ord_1|1735732800";
        assert_eq!(signer().sign(payload), signer().sign(payload));
    }

    #[test]
    fn test_round_trip() {
        let payload = canonical_payload(
            "qr_1",
            "nonce123",
            Money::from_minor(10000, Currency::USD),
            "ord_1",
            Utc::now(),
        );
        let s = signer();
        let sig = s.sign(&payload);
        assert!(s.verify(&payload, &sig));
    }

    #[test]
    fn test_single_byte_mutation_fails() {
        let payload = "qr_1|nonce123|10000|usd|ord_1|1735732800".to_string();
        let s = signer();
        let sig = s.sign(&payload);

        for i in 0..payload.len() {
            let mut mutated = payload.clone().into_bytes();
            mutated[i] ^= 0x01;
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(!s.verify(&mutated, &sig), "mutation at byte {i} verified");
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let payload = "qr_1|nonce123|10000|usd|ord_1|1735732800";
        let sig = signer().sign(payload);
        let other = QrSigner::new("a-different-secret-of-sufficient-len");
        assert!(!other.verify(payload, &sig));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
