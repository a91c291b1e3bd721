// src/models/identity.rs
//! Merchant identity attributes used to request a POS signing certificate.

use crate::error::CsrBuildError;
use serde::{Deserialize, Serialize};

/// Smallest 9-digit tax identifier (NUI).
pub const MIN_TAX_ID: u64 = 100_000_000;
/// Largest 9-digit tax identifier (NUI).
pub const MAX_TAX_ID: u64 = 999_999_999;

/// Identity of the point-of-sale terminal requesting a certificate.
///
/// Fields are private and only readable through accessors: once a CSR has
/// been derived from a request, its tax, branch and POS identifiers cannot
/// change underneath it.
///
/// # Subject Layout
/// A request maps onto the CSR subject as:
/// - `C`  = country code
/// - `O`  = business legal name
/// - `OU` = tax identifier (NUI)
/// - `CN` = `<nui>-<branch_id>-<pos_id>`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityRequest {
    country: String,
    business_name: String,
    tax_id: u64,
    branch_id: u64,
    pos_id: u64,
}

impl IdentityRequest {
    pub fn new(
        country: impl Into<String>,
        business_name: impl Into<String>,
        tax_id: u64,
        branch_id: u64,
        pos_id: u64,
    ) -> Self {
        Self {
            country: country.into(),
            business_name: business_name.into(),
            tax_id,
            branch_id,
            pos_id,
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn business_name(&self) -> &str {
        &self.business_name
    }

    pub fn tax_id(&self) -> u64 {
        self.tax_id
    }

    pub fn branch_id(&self) -> u64 {
        self.branch_id
    }

    pub fn pos_id(&self) -> u64 {
        self.pos_id
    }

    /// Application identifier placed in the subject common name.
    pub fn application_id(&self) -> String {
        format!("{}-{}-{}", self.tax_id, self.branch_id, self.pos_id)
    }

    /// Checks the fields against the authority's registration rules.
    ///
    /// # Errors
    /// - `EmptyField` if a text field is blank or an identifier is zero
    /// - `InvalidCountry` if the country is not 2-3 uppercase ASCII letters
    /// - `InvalidTaxId` if the NUI is not a 9-digit number
    pub fn validate(&self) -> Result<(), CsrBuildError> {
        if self.country.is_empty() {
            return Err(CsrBuildError::EmptyField("country"));
        }
        if !(2..=3).contains(&self.country.len())
            || !self.country.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(CsrBuildError::InvalidCountry(self.country.clone()));
        }
        if self.business_name.trim().is_empty() {
            return Err(CsrBuildError::EmptyField("business_name"));
        }
        if self.tax_id == 0 {
            return Err(CsrBuildError::EmptyField("tax_id"));
        }
        if !(MIN_TAX_ID..=MAX_TAX_ID).contains(&self.tax_id) {
            return Err(CsrBuildError::InvalidTaxId(self.tax_id));
        }
        if self.branch_id == 0 {
            return Err(CsrBuildError::EmptyField("branch_id"));
        }
        if self.pos_id == 0 {
            return Err(CsrBuildError::EmptyField("pos_id"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> IdentityRequest {
        IdentityRequest::new("RKS", "TEST CORP", 510_600_700, 1, 1)
    }

    #[test]
    fn test_valid_request() {
        assert!(test_request().validate().is_ok());
        assert_eq!(test_request().application_id(), "510600700-1-1");
    }

    #[test]
    fn test_empty_business_name() {
        let request = IdentityRequest::new("RKS", "", 510_600_700, 1, 1);
        assert_eq!(
            request.validate(),
            Err(CsrBuildError::EmptyField("business_name"))
        );
    }

    #[test]
    fn test_tax_id_range() {
        let short = IdentityRequest::new("RKS", "TEST CORP", 51_060_070, 1, 1);
        assert_eq!(short.validate(), Err(CsrBuildError::InvalidTaxId(51_060_070)));

        let long = IdentityRequest::new("RKS", "TEST CORP", 5_106_007_001, 1, 1);
        assert_eq!(
            long.validate(),
            Err(CsrBuildError::InvalidTaxId(5_106_007_001))
        );
    }

    #[test]
    fn test_zero_pos_id() {
        let request = IdentityRequest::new("RKS", "TEST CORP", 510_600_700, 1, 0);
        assert_eq!(request.validate(), Err(CsrBuildError::EmptyField("pos_id")));
    }

    #[test]
    fn test_lowercase_country() {
        let request = IdentityRequest::new("rks", "TEST CORP", 510_600_700, 1, 1);
        assert!(matches!(
            request.validate(),
            Err(CsrBuildError::InvalidCountry(_))
        ));
    }
}
