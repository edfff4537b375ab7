//! ECDSA P-256 signing and verification.

use base64::Engine as _;
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::EncodePublicKey;
use sha2::{Digest, Sha256};

use super::keys::{KeyError, load_signing_key};
use crate::config::SigningConfig;

/// Base64 engine for signature transport.
const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Length of a public-key fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Holds the process's single P-256 keypair and performs all signing and
/// verification.
///
/// The keypair is loaded once at startup and immutable for the process
/// lifetime; key rotation requires a new process. Because key material is
/// validated at construction, [`Signer::sign`] itself cannot fail.
#[derive(Debug)]
pub struct Signer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    fingerprint: String,
}

impl Signer {
    /// Creates a signer from an existing P-256 private key.
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        let fingerprint = fingerprint_of(&verifying_key);
        Self {
            signing_key,
            verifying_key,
            fingerprint,
        }
    }

    /// Creates a signer from configuration (explicit PEM or development
    /// keypair).
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if no usable key material is available.
    /// This is a configuration defect; callers must treat it as fatal for
    /// ledger writes.
    pub fn from_config(config: &SigningConfig) -> Result<Self, KeyError> {
        Ok(Self::new(load_signing_key(config)?))
    }

    /// Generates a signer with a fresh random keypair.
    ///
    /// Intended for tests and in-memory use; nothing is persisted.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Signs a byte payload.
    ///
    /// Returns the standard-base64 encoding of the raw 64-byte `r || s`
    /// ECDSA-over-SHA-256 signature.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(payload);
        ENGINE.encode(signature.to_bytes())
    }

    /// Verifies a base64 signature over a byte payload.
    ///
    /// Verification failure is an expected, frequent outcome: malformed
    /// base64, wrong length, wrong key, and tampered payloads all return
    /// `false`. This method never panics or errors.
    #[must_use]
    pub fn verify(&self, payload: &[u8], signature_b64: &str) -> bool {
        let Ok(bytes) = ENGINE.decode(signature_b64) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&bytes) else {
            return false;
        };
        self.verifying_key.verify(payload, &signature).is_ok()
    }

    /// Returns the signer's public-key fingerprint.
    ///
    /// The first [`FINGERPRINT_LEN`] hex characters of SHA-256 over the
    /// SPKI DER encoding of the public key. Used to correlate signatures
    /// to a signer identity in logs and exports without re-transmitting
    /// the key.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Returns the verifying key for out-of-band distribution.
    #[must_use]
    pub const fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

fn fingerprint_of(key: &VerifyingKey) -> String {
    // SPKI DER is the one fixed encoding of a public key; PEM would drag
    // line-ending variance into the fingerprint.
    let der = key
        .to_public_key_der()
        .expect("P-256 public key SPKI encoding is infallible");
    let mut hex = hex::encode(Sha256::digest(der.as_bytes()));
    hex.truncate(FINGERPRINT_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let signer = Signer::generate();
        let payload = b"ledger payload";

        let signature = signer.sign(payload);
        assert!(signer.verify(payload, &signature));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let signer = Signer::generate();
        let signature = signer.sign(b"original");
        assert!(!signer.verify(b"tampered", &signature));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let signer_a = Signer::generate();
        let signer_b = Signer::generate();

        let signature = signer_a.sign(b"payload");
        assert!(!signer_b.verify(b"payload", &signature));
    }

    #[test]
    fn test_verify_never_errors_on_malformed_input() {
        let signer = Signer::generate();
        assert!(!signer.verify(b"payload", "not base64 !!!"));
        assert!(!signer.verify(b"payload", ""));
        // Valid base64, wrong length for r || s
        assert!(!signer.verify(b"payload", &ENGINE.encode(b"short")));
        // Valid base64, right length, garbage bytes
        assert!(!signer.verify(b"payload", &ENGINE.encode([0u8; 64])));
    }

    #[test]
    fn test_signature_is_standard_base64_of_64_bytes() {
        let signer = Signer::generate();
        let signature = signer.sign(b"payload");

        let bytes = ENGINE.decode(&signature).unwrap();
        assert_eq!(bytes.len(), 64);
    }

    #[test]
    fn test_fingerprint_format() {
        let signer = Signer::generate();
        let fp = signer.fingerprint();

        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fp.to_lowercase());
    }

    #[test]
    fn test_fingerprint_is_stable_per_key() {
        let key = SigningKey::random(&mut rand::thread_rng());
        let a = Signer::new(key.clone());
        let b = Signer::new(key);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let other = Signer::generate();
        assert_ne!(a.fingerprint(), other.fingerprint());
    }
}
