// src/utils/serialization.rs
//! Canonical encoding and text framing for signed coupons.
//!
//! Provides:
//! - Deterministic protobuf encoding of validated coupons
//! - Base64 text framing of the encoded bytes
//! - QR payload joining/splitting on the `|` delimiter

use crate::error::EncodingError;
use crate::models::coupon::Coupon;

/// Delimiter between the coupon text and the signature in a QR payload.
pub const QR_DELIMITER: char = '|';

/// Alphabet of the standard (RFC 4648) base64 encoding, padding included.
///
/// Both the coupon text and the signature text are drawn from this alphabet.
pub const BASE64_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

const fn alphabet_contains(alphabet: &str, needle: u8) -> bool {
    let bytes = alphabet.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == needle {
            return true;
        }
        i += 1;
    }
    false
}

const _: () = assert!(
    !alphabet_contains(BASE64_ALPHABET, QR_DELIMITER as u8),
    "base64 alphabet must not contain the QR delimiter"
);

/// Encodes a coupon into its canonical protobuf bytes.
///
/// The coupon is validated first, so schema violations surface here rather
/// than after signing or at the endpoint.
///
/// # Errors
/// Returns `EncodingError` if the coupon fails validation.
pub fn serialize<C: Coupon>(coupon: &C) -> Result<Vec<u8>, EncodingError> {
    coupon.validate()?;
    Ok(coupon.encode_to_vec())
}

/// Decodes canonical protobuf bytes back into a coupon.
///
/// # Errors
/// Returns `EncodingError::Decode` if the bytes are not a valid encoding.
pub fn deserialize<C: Coupon>(bytes: &[u8]) -> Result<C, EncodingError> {
    C::decode(bytes).map_err(|e| EncodingError::Decode(e.to_string()))
}

/// Renders bytes as standard padded base64 text.
pub fn to_base64(bytes: &[u8]) -> String {
    base64::encode(bytes)
}

/// Parses standard padded base64 text.
///
/// # Errors
/// Returns `EncodingError::Base64` for characters outside the alphabet or bad padding.
pub fn from_base64(text: &str) -> Result<Vec<u8>, EncodingError> {
    base64::decode(text).map_err(|e| EncodingError::Base64(e.to_string()))
}

/// Joins coupon text and signature text into a QR payload.
///
/// # Errors
/// Returns `DelimiterInComponent` if either side contains the delimiter.
pub fn join_qr_payload(coupon_text: &str, signature_text: &str) -> Result<String, EncodingError> {
    if coupon_text.contains(QR_DELIMITER) {
        return Err(EncodingError::DelimiterInComponent("coupon"));
    }
    if signature_text.contains(QR_DELIMITER) {
        return Err(EncodingError::DelimiterInComponent("signature"));
    }
    Ok(format!("{coupon_text}{QR_DELIMITER}{signature_text}"))
}

/// Splits a QR payload on the first delimiter into (coupon text, signature text).
///
/// # Errors
/// Returns `EncodingError::MissingDelimiter` if there is no `|`.
pub fn split_qr_payload(payload: &str) -> Result<(&str, &str), EncodingError> {
    payload
        .split_once(QR_DELIMITER)
        .ok_or(EncodingError::MissingDelimiter)
}
