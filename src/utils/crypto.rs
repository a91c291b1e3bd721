// src/utils/crypto.rs
//! Signing capability used by the coupon pipeline.
//!
//! The only mechanism required by the fiscalization authority is ECDSA over
//! NIST P-256 with a SHA-256 pre-hash.
//!
//! # Signature Text
//! Signatures are rendered as standard padded base64 of the fixed-width
//! 64-byte `r || s` encoding (IEEE P1363), always 88 characters long. The
//! authority's verifier depends on this exact format.

use crate::error::SigningError;
use crate::utils::serialization::{from_base64, to_base64};
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;

/// Length in bytes of a P1363 P-256 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Produces a text signature over arbitrary bytes.
///
/// Implementations hold their key material read-only, so one signer can be
/// shared across threads and used concurrently.
pub trait Signer: Send + Sync {
    fn sign_bytes(&self, data: &[u8]) -> Result<String, SigningError>;
}

/// ECDSA P-256 / SHA-256 signer.
#[derive(Clone)]
pub struct EcdsaSigner {
    signing_key: SigningKey,
}

impl EcdsaSigner {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Builds a signer from an unencrypted PKCS#8 PEM private key.
    ///
    /// # Errors
    /// Returns `SigningError::MalformedKey` if the PEM is empty or does not
    /// hold a P-256 key.
    pub fn from_pkcs8_pem(private_key_pem: &str) -> Result<Self, SigningError> {
        if private_key_pem.trim().is_empty() {
            return Err(SigningError::MalformedKey("empty pem".to_string()));
        }
        let signing_key = SigningKey::from_pkcs8_pem(private_key_pem)
            .map_err(|e| SigningError::MalformedKey(e.to_string()))?;
        Ok(Self::new(signing_key))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }
}

impl Signer for EcdsaSigner {
    fn sign_bytes(&self, data: &[u8]) -> Result<String, SigningError> {
        let signature: Signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| SigningError::Primitive(e.to_string()))?;
        Ok(to_base64(&signature.to_bytes()))
    }
}

impl std::fmt::Debug for EcdsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcdsaSigner")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

/// Parses signature text produced by [`EcdsaSigner`].
pub fn decode_signature(signature_text: &str) -> Result<Signature, SigningError> {
    let bytes = from_base64(signature_text)
        .map_err(|e| SigningError::MalformedSignature(e.to_string()))?;
    if bytes.len() != SIGNATURE_LENGTH {
        return Err(SigningError::MalformedSignature(format!(
            "expected {SIGNATURE_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    Signature::from_slice(&bytes).map_err(|e| SigningError::MalformedSignature(e.to_string()))
}

/// Verifies signature text over `data` with the given public key.
///
/// # Errors
/// - `MalformedSignature` if the text is not a 64-byte base64 signature
/// - `VerificationFailed` if the signature does not match
pub fn verify_signature(
    verifying_key: &VerifyingKey,
    data: &[u8],
    signature_text: &str,
) -> Result<(), SigningError> {
    let signature = decode_signature(signature_text)?;
    verifying_key
        .verify(data, &signature)
        .map_err(|_| SigningError::VerificationFailed)
}
