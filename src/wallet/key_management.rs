// src/wallet/key_management.rs
//! Identity provisioning for a point-of-sale terminal.
//!
//! Provides:
//! - P-256 key pair generation from the operating system RNG
//! - PKCS#8 PEM export and import of the private key
//! - PKCS#10 certificate signing requests carrying the merchant identity
//!
//! The private key never leaves this module except through
//! [`KeyPair::to_pkcs8_pem`], and is redacted from `Debug` output.

use crate::error::{CryptoFailure, CsrBuildError, SigningError};
use crate::models::identity::IdentityRequest;
use crate::utils::crypto::EcdsaSigner;
use p256::ecdsa::{DerSignature, SigningKey, VerifyingKey};
use p256::elliptic_curve::zeroize::Zeroizing;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use p256::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::builder::{Builder, RequestBuilder};
use x509_cert::der::asn1::SetOfVec;
use x509_cert::der::oid::ObjectIdentifier;
use x509_cert::der::{Any, DecodePem, EncodePem, Tag, Tagged};
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::request::CertReq;

/// Candidate scalars drawn before key generation gives up.
const MAX_KEY_ATTEMPTS: usize = 16;

/// id-at-countryName
const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
/// id-at-organizationName
const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
/// id-at-organizationalUnitName
const ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
/// id-at-commonName
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// An ECDSA P-256 key pair owned by the POS terminal.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generates a fresh key pair using the operating system RNG.
    ///
    /// # Errors
    /// Returns `CryptoFailure` if the RNG fails. Nothing else can proceed
    /// without a key, so callers treat this as fatal.
    pub fn generate() -> Result<Self, CryptoFailure> {
        Self::generate_with(&mut OsRng)
    }

    /// Draws 32-byte candidates from `rng` until one is a valid P-256 scalar.
    fn generate_with<R: RngCore>(rng: &mut R) -> Result<Self, CryptoFailure> {
        let mut candidate = Zeroizing::new([0u8; 32]);
        for _ in 0..MAX_KEY_ATTEMPTS {
            rng.try_fill_bytes(&mut candidate[..])
                .map_err(|e| CryptoFailure(format!("entropy source failed: {e}")))?;

            // Zero and values at or above the curve order are rejected
            if let Ok(secret_key) = SecretKey::from_slice(&candidate[..]) {
                log::info!("generated new P-256 key pair");
                return Ok(Self {
                    signing_key: SigningKey::from(&secret_key),
                });
            }
        }
        Err(CryptoFailure(format!(
            "no valid scalar after {MAX_KEY_ATTEMPTS} attempts"
        )))
    }

    /// Loads a key pair from an unencrypted PKCS#8 PEM block.
    ///
    /// # Errors
    /// Returns `SigningError::MalformedKey` if the PEM does not hold a P-256 key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, SigningError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| SigningError::MalformedKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Exports the private key as an unencrypted PKCS#8 PEM block.
    ///
    /// This is the only way key material leaves the key pair. The returned
    /// string is wiped from memory when dropped.
    ///
    /// # Errors
    /// Returns `CryptoFailure` if the key cannot be DER-encoded.
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>, CryptoFailure> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoFailure(e.to_string()))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }

    /// Returns a coupon signer backed by this key.
    pub fn signer(&self) -> EcdsaSigner {
        EcdsaSigner::new(self.signing_key.clone())
    }

    /// Builds a PEM-encoded PKCS#10 request for `identity`, signed with this key.
    ///
    /// # Errors
    /// See [`build_csr`].
    pub fn build_csr(&self, identity: &IdentityRequest) -> Result<String, CsrBuildError> {
        build_csr(&self.signing_key, identity)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("verifying_key", &self.signing_key.verifying_key())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

fn encode_err(e: impl std::fmt::Display) -> CsrBuildError {
    CsrBuildError::Encoding(e.to_string())
}

fn rdn(oid: ObjectIdentifier, tag: Tag, value: &str) -> Result<RelativeDistinguishedName, CsrBuildError> {
    let value = Any::new(tag, value.as_bytes()).map_err(encode_err)?;
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }]).map_err(encode_err)?;
    Ok(RelativeDistinguishedName(set))
}

/// Builds the CSR subject for an identity, most general attribute first.
fn subject_name(identity: &IdentityRequest) -> Result<Name, CsrBuildError> {
    Ok(RdnSequence(vec![
        rdn(COUNTRY_NAME, Tag::PrintableString, identity.country())?,
        rdn(ORGANIZATION_NAME, Tag::Utf8String, identity.business_name())?,
        rdn(
            ORGANIZATIONAL_UNIT_NAME,
            Tag::Utf8String,
            &identity.tax_id().to_string(),
        )?,
        rdn(COMMON_NAME, Tag::Utf8String, &identity.application_id())?,
    ]))
}

/// Builds a PEM-encoded PKCS#10 certificate signing request.
///
/// The request binds the public half of `signing_key` to the subject derived
/// from `identity` and is self-signed with ECDSA P-256 / SHA-256.
///
/// # Errors
/// Returns `CsrBuildError` if the identity fails validation or the request
/// cannot be encoded.
pub fn build_csr(signing_key: &SigningKey, identity: &IdentityRequest) -> Result<String, CsrBuildError> {
    identity.validate()?;

    let subject = subject_name(identity)?;
    let builder = RequestBuilder::new(subject, signing_key).map_err(encode_err)?;
    let request = builder.build::<DerSignature>().map_err(encode_err)?;
    let pem = request.to_pem(LineEnding::LF).map_err(encode_err)?;

    log::info!(
        "built certificate signing request for {}",
        identity.application_id()
    );
    Ok(pem)
}

fn attribute_text(atv: &AttributeTypeAndValue, field: &'static str) -> Result<String, CsrBuildError> {
    match atv.value.tag() {
        Tag::Utf8String | Tag::PrintableString => std::str::from_utf8(atv.value.value())
            .map(str::to_owned)
            .map_err(|_| CsrBuildError::Subject(field)),
        _ => Err(CsrBuildError::Subject(field)),
    }
}

fn parse_id(text: &str, field: &'static str) -> Result<u64, CsrBuildError> {
    text.parse().map_err(|_| CsrBuildError::Subject(field))
}

/// Decodes the subject of a PEM CSR back into the identity it was built from.
///
/// The common name must agree with the tax identifier carried in the
/// organizational unit.
///
/// # Errors
/// Returns `CsrBuildError::Subject` naming the first attribute that is
/// missing or malformed, or `CsrBuildError::Encoding` if the PEM is invalid.
pub fn parse_csr_subject(csr_pem: &str) -> Result<IdentityRequest, CsrBuildError> {
    let request = CertReq::from_pem(csr_pem).map_err(encode_err)?;

    let mut country = None;
    let mut business_name = None;
    let mut tax_id = None;
    let mut common_name = None;
    for rdn in request.info.subject.0.iter() {
        for atv in rdn.0.iter() {
            if atv.oid == COUNTRY_NAME {
                country = Some(attribute_text(atv, "C")?);
            } else if atv.oid == ORGANIZATION_NAME {
                business_name = Some(attribute_text(atv, "O")?);
            } else if atv.oid == ORGANIZATIONAL_UNIT_NAME {
                tax_id = Some(parse_id(&attribute_text(atv, "OU")?, "OU")?);
            } else if atv.oid == COMMON_NAME {
                common_name = Some(attribute_text(atv, "CN")?);
            }
        }
    }

    let country = country.ok_or(CsrBuildError::Subject("C"))?;
    let business_name = business_name.ok_or(CsrBuildError::Subject("O"))?;
    let tax_id = tax_id.ok_or(CsrBuildError::Subject("OU"))?;
    let common_name = common_name.ok_or(CsrBuildError::Subject("CN"))?;

    let mut parts = common_name.splitn(3, '-');
    let cn_tax_id = parse_id(parts.next().unwrap_or_default(), "CN")?;
    let branch_id = parse_id(parts.next().unwrap_or_default(), "CN")?;
    let pos_id = parse_id(parts.next().unwrap_or_default(), "CN")?;
    if cn_tax_id != tax_id {
        return Err(CsrBuildError::Subject("CN"));
    }

    Ok(IdentityRequest::new(
        country,
        business_name,
        tax_id,
        branch_id,
        pos_id,
    ))
}
