// src/services/coupon_signer.rs
//! Coupon signing pipeline.
//!
//! Both coupon kinds go through the same steps:
//! 1. Encode the coupon to canonical protobuf bytes
//! 2. Render the bytes as base64 text
//! 3. Sign the UTF-8 bytes of that text (never the raw protobuf bytes)
//!
//! They differ only in how the result is assembled: a citizen coupon becomes a
//! single `"<coupon>|<signature>"` QR payload, a POS coupon keeps the two
//! parts as separate fields.

use crate::error::{EncodingError, PipelineError, SigningError};
use crate::models::coupon::{CitizenCoupon, Coupon, PosCoupon};
use crate::utils::crypto::{verify_signature, Signer};
use crate::utils::serialization::{
    deserialize, from_base64, join_qr_payload, serialize, split_qr_payload, to_base64,
    QR_DELIMITER,
};
use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};

/// A signed POS coupon, ready for submission.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedPosCoupon {
    /// Base64 text of the canonical coupon encoding.
    pub details: String,
    /// Signature over the UTF-8 bytes of `details`.
    pub signature: String,
}

/// Encodes a coupon and signs its base64 text.
///
/// Returns `(base64 text, signature text)`.
fn sign_coupon<C: Coupon>(coupon: &C, signer: &dyn Signer) -> Result<(String, String), PipelineError> {
    let encoded = serialize(coupon)?;
    let coupon_text = to_base64(&encoded);
    let signature = signer.sign_bytes(coupon_text.as_bytes())?;

    log::debug!("coupon   : {}", coupon_text);
    log::debug!("signature: {}", signature);
    Ok((coupon_text, signature))
}

/// Signs a citizen coupon and returns the string to encode into its QR code.
///
/// # Errors
/// - `PipelineError::Encoding` if the coupon is invalid
/// - `PipelineError::Signing` if the signer fails
pub fn sign_citizen_coupon(
    coupon: &CitizenCoupon,
    signer: &dyn Signer,
) -> Result<String, PipelineError> {
    let (coupon_text, signature) = sign_coupon(coupon, signer)?;
    let qr_code = join_qr_payload(&coupon_text, &signature)?;
    log::debug!("qr code  : {}", qr_code);
    Ok(qr_code)
}

/// Signs a POS coupon and returns the coupon text and signature separately.
///
/// # Arguments
/// * `coupon` - The POS coupon to encode and sign
/// * `signer` - Signer holding the terminal's private key
///
/// # Errors
/// - `PipelineError::Encoding` if the coupon is invalid or a field would
///   contain the `|` delimiter
/// - `PipelineError::Signing` if the signer fails
pub fn sign_pos_coupon(coupon: &PosCoupon, signer: &dyn Signer) -> Result<SignedPosCoupon, PipelineError> {
    let (details, signature) = sign_coupon(coupon, signer)?;
    if details.contains(QR_DELIMITER) {
        return Err(EncodingError::DelimiterInComponent("details").into());
    }
    if signature.contains(QR_DELIMITER) {
        return Err(EncodingError::DelimiterInComponent("signature").into());
    }
    Ok(SignedPosCoupon { details, signature })
}

fn verify_coupon_text<C: Coupon>(
    coupon_text: &str,
    signature: &str,
    verifying_key: &VerifyingKey,
) -> Result<C, PipelineError> {
    verify_signature(verifying_key, coupon_text.as_bytes(), signature)?;
    let bytes = from_base64(coupon_text)?;
    Ok(deserialize(&bytes)?)
}

/// Checks a QR payload the way a scanner would and returns the coupon it carries.
///
/// # Errors
/// - `PipelineError::Encoding` if the payload is not framed correctly
/// - `PipelineError::Signing` if the signature does not verify
pub fn verify_qr_payload(
    payload: &str,
    verifying_key: &VerifyingKey,
) -> Result<CitizenCoupon, PipelineError> {
    let (coupon_text, signature) = split_qr_payload(payload)?;
    if signature.contains(QR_DELIMITER) {
        return Err(SigningError::MalformedSignature("extra delimiter".to_string()).into());
    }
    verify_coupon_text(coupon_text, signature, verifying_key)
}

/// Checks a signed POS coupon and returns the decoded coupon.
///
/// # Errors
/// - `PipelineError::Signing` if the signature is malformed or does not verify
/// - `PipelineError::Encoding` if `details` is not base64 of a POS coupon
pub fn verify_pos_coupon(
    signed: &SignedPosCoupon,
    verifying_key: &VerifyingKey,
) -> Result<PosCoupon, PipelineError> {
    verify_coupon_text(&signed.details, &signed.signature, verifying_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::coupon_source::{CouponSource, SampleCouponSource};
    use crate::wallet::key_management::KeyPair;

    struct FailingSigner;

    impl Signer for FailingSigner {
        fn sign_bytes(&self, _data: &[u8]) -> Result<String, SigningError> {
            Err(SigningError::MalformedKey("no key".to_string()))
        }
    }

    /// Records whether it was ever asked to sign.
    struct CountingSigner(std::sync::atomic::AtomicUsize);

    impl Signer for CountingSigner {
        fn sign_bytes(&self, _data: &[u8]) -> Result<String, SigningError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok("sig".to_string())
        }
    }

    fn sample() -> SampleCouponSource {
        SampleCouponSource::new(1_700_000_000)
    }

    #[test]
    fn test_citizen_qr_payload_framing() {
        let key_pair = KeyPair::generate().unwrap();
        let coupon = sample().citizen_coupon();
        let qr_code = sign_citizen_coupon(&coupon, &key_pair.signer()).unwrap();

        let parts: Vec<&str> = qr_code.split(QR_DELIMITER).collect();
        assert_eq!(parts.len(), 2);

        // The first part is the base64 of the canonical encoding
        assert_eq!(from_base64(parts[0]).unwrap(), serialize(&coupon).unwrap());

        // The signature covers the base64 text, not the protobuf bytes
        assert!(verify_signature(&key_pair.verifying_key(), parts[0].as_bytes(), parts[1]).is_ok());
        let raw = serialize(&coupon).unwrap();
        assert!(verify_signature(&key_pair.verifying_key(), &raw, parts[1]).is_err());

        assert_eq!(verify_qr_payload(&qr_code, &key_pair.verifying_key()).unwrap(), coupon);
    }

    #[test]
    fn test_pos_fields_are_separate() {
        let key_pair = KeyPair::generate().unwrap();
        let coupon = sample().pos_coupon();
        let signed = sign_pos_coupon(&coupon, &key_pair.signer()).unwrap();

        assert!(!signed.details.contains(QR_DELIMITER));
        assert!(!signed.signature.contains(QR_DELIMITER));
        assert_eq!(from_base64(&signed.details).unwrap(), serialize(&coupon).unwrap());
        assert!(verify_signature(
            &key_pair.verifying_key(),
            signed.details.as_bytes(),
            &signed.signature
        )
        .is_ok());
        assert_eq!(verify_pos_coupon(&signed, &key_pair.verifying_key()).unwrap(), coupon);
    }

    #[test]
    fn test_tampered_qr_payload_rejected() {
        let key_pair = KeyPair::generate().unwrap();
        let qr_code = sign_citizen_coupon(&sample().citizen_coupon(), &key_pair.signer()).unwrap();

        // Swap the first character of the coupon text for a different base64 symbol
        let mut tampered: Vec<char> = qr_code.chars().collect();
        tampered[0] = if tampered[0] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        assert_eq!(
            verify_qr_payload(&tampered, &key_pair.verifying_key()),
            Err(PipelineError::Signing(SigningError::VerificationFailed))
        );
    }

    #[test]
    fn test_qr_payload_from_other_key_rejected() {
        let key_pair = KeyPair::generate().unwrap();
        let other = KeyPair::generate().unwrap();
        let qr_code = sign_citizen_coupon(&sample().citizen_coupon(), &key_pair.signer()).unwrap();

        assert_eq!(
            verify_qr_payload(&qr_code, &other.verifying_key()),
            Err(PipelineError::Signing(SigningError::VerificationFailed))
        );
    }

    #[test]
    fn test_invalid_coupon_never_reaches_signer() {
        let signer = CountingSigner(std::sync::atomic::AtomicUsize::new(0));
        let result = sign_pos_coupon(&PosCoupon::default(), &signer);

        assert_eq!(
            result,
            Err(PipelineError::Encoding(EncodingError::MissingField("business_id")))
        );
        assert_eq!(signer.0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_signer_failure_propagates() {
        assert_eq!(
            sign_citizen_coupon(&sample().citizen_coupon(), &FailingSigner),
            Err(PipelineError::Signing(SigningError::MalformedKey("no key".to_string())))
        );
    }

    #[test]
    fn test_delimiter_in_signature_rejected() {
        struct PipeSigner;
        impl Signer for PipeSigner {
            fn sign_bytes(&self, _data: &[u8]) -> Result<String, SigningError> {
                Ok("a|b".to_string())
            }
        }

        assert_eq!(
            sign_citizen_coupon(&sample().citizen_coupon(), &PipeSigner),
            Err(PipelineError::Encoding(EncodingError::DelimiterInComponent("signature")))
        );
        assert_eq!(
            sign_pos_coupon(&sample().pos_coupon(), &PipeSigner),
            Err(PipelineError::Encoding(EncodingError::DelimiterInComponent("signature")))
        );
    }
}
