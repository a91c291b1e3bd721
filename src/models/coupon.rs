// src/models/coupon.rs
//! Fiscal coupon data model.
//!
//! Coupons are protocol buffer messages so that their binary encoding is
//! field-tagged and deterministic: two coupons with the same field values
//! always encode to the same bytes. The encoding is what gets signed, so the
//! tag numbers below are part of the wire contract with the fiscalization
//! authority and must not be renumbered.
//!
//! Monetary amounts are integers in the smallest currency unit (cents).

use crate::error::EncodingError;
use prost::Message;

/// Kind of fiscal operation a coupon records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum CouponType {
    Sale = 0,
    Return = 1,
    Cancel = 2,
}

/// How a coupon was paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PaymentType {
    Cash = 0,
    CreditCard = 1,
    Voucher = 2,
    Cheque = 3,
    CryptoCurrency = 4,
    Other = 5,
}

/// Totals for a single tax rate.
#[derive(Clone, PartialEq, Message)]
pub struct TaxGroup {
    /// Tax rate label, e.g. "C" for 18%.
    #[prost(string, tag = "1")]
    pub tax_rate: String,
    #[prost(int64, tag = "2")]
    pub total_for_tax: i64,
    #[prost(int64, tag = "3")]
    pub total_tax: i64,
}

/// One line on a POS coupon.
#[derive(Clone, PartialEq, Message)]
pub struct CouponItem {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(int64, tag = "2")]
    pub price: i64,
    #[prost(string, tag = "3")]
    pub unit: String,
    #[prost(int64, tag = "4")]
    pub quantity: i64,
    #[prost(int64, tag = "5")]
    pub total: i64,
    #[prost(string, tag = "6")]
    pub tax_rate: String,
    #[prost(string, tag = "7")]
    pub item_type: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Payment {
    #[prost(enumeration = "PaymentType", tag = "1")]
    pub payment_type: i32,
    #[prost(int64, tag = "2")]
    pub amount: i64,
}

/// Citizen-facing coupon, encoded into the receipt's QR code.
///
/// Carries only the totals a citizen needs to claim the receipt; line items
/// stay on the [`PosCoupon`].
#[derive(Clone, PartialEq, Message)]
pub struct CitizenCoupon {
    #[prost(uint64, tag = "1")]
    pub business_id: u64,
    #[prost(uint64, tag = "2")]
    pub pos_id: u64,
    #[prost(uint64, tag = "3")]
    pub coupon_id: u64,
    #[prost(uint64, tag = "4")]
    pub branch_id: u64,
    #[prost(enumeration = "CouponType", tag = "5")]
    pub coupon_type: i32,
    /// Unix timestamp (seconds) of the sale.
    #[prost(int64, tag = "6")]
    pub time: i64,
    #[prost(int64, tag = "7")]
    pub total: i64,
    #[prost(message, repeated, tag = "8")]
    pub tax_groups: Vec<TaxGroup>,
    #[prost(int64, tag = "9")]
    pub total_tax: i64,
    #[prost(int64, tag = "10")]
    pub total_no_tax: i64,
}

/// Point-of-sale coupon with full line item and payment detail.
#[derive(Clone, PartialEq, Message)]
pub struct PosCoupon {
    #[prost(uint64, tag = "1")]
    pub business_id: u64,
    #[prost(uint64, tag = "2")]
    pub pos_id: u64,
    #[prost(uint64, tag = "3")]
    pub coupon_id: u64,
    #[prost(uint64, tag = "4")]
    pub branch_id: u64,
    #[prost(string, tag = "5")]
    pub location: String,
    #[prost(string, tag = "6")]
    pub operator_id: String,
    #[prost(enumeration = "CouponType", tag = "7")]
    pub coupon_type: i32,
    #[prost(int64, tag = "8")]
    pub time: i64,
    #[prost(message, repeated, tag = "9")]
    pub items: Vec<CouponItem>,
    #[prost(message, repeated, tag = "10")]
    pub payments: Vec<Payment>,
    #[prost(int64, tag = "11")]
    pub total: i64,
    #[prost(message, repeated, tag = "12")]
    pub tax_groups: Vec<TaxGroup>,
    #[prost(int64, tag = "13")]
    pub total_tax: i64,
    #[prost(int64, tag = "14")]
    pub total_no_tax: i64,
    #[prost(int64, tag = "15")]
    pub total_discount: i64,
}

/// A coupon that can be canonically encoded and signed.
pub trait Coupon: Message + Default + Sized {
    /// Checks the schema rules that the protobuf types cannot express.
    fn validate(&self) -> Result<(), EncodingError>;
}

fn require_id(field: &'static str, value: u64) -> Result<(), EncodingError> {
    if value == 0 {
        return Err(EncodingError::MissingField(field));
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<(), EncodingError> {
    if value.trim().is_empty() {
        return Err(EncodingError::MissingField(field));
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: i64) -> Result<(), EncodingError> {
    if value < 0 {
        return Err(EncodingError::OutOfRange { field, value });
    }
    Ok(())
}

fn require_known_coupon_type(value: i32) -> Result<(), EncodingError> {
    CouponType::try_from(value)
        .map(|_| ())
        .map_err(|_| EncodingError::OutOfRange {
            field: "coupon_type",
            value: i64::from(value),
        })
}

fn validate_tax_groups(groups: &[TaxGroup]) -> Result<(), EncodingError> {
    for group in groups {
        require_text("tax_groups.tax_rate", &group.tax_rate)?;
        require_non_negative("tax_groups.total_for_tax", group.total_for_tax)?;
        require_non_negative("tax_groups.total_tax", group.total_tax)?;
    }
    Ok(())
}

impl Coupon for CitizenCoupon {
    fn validate(&self) -> Result<(), EncodingError> {
        require_id("business_id", self.business_id)?;
        require_id("branch_id", self.branch_id)?;
        require_id("pos_id", self.pos_id)?;
        require_id("coupon_id", self.coupon_id)?;
        require_known_coupon_type(self.coupon_type)?;
        if self.time <= 0 {
            return Err(EncodingError::MissingField("time"));
        }
        require_non_negative("total", self.total)?;
        require_non_negative("total_tax", self.total_tax)?;
        require_non_negative("total_no_tax", self.total_no_tax)?;
        validate_tax_groups(&self.tax_groups)
    }
}

impl Coupon for PosCoupon {
    fn validate(&self) -> Result<(), EncodingError> {
        require_id("business_id", self.business_id)?;
        require_id("branch_id", self.branch_id)?;
        require_id("pos_id", self.pos_id)?;
        require_id("coupon_id", self.coupon_id)?;
        require_text("location", &self.location)?;
        require_text("operator_id", &self.operator_id)?;
        require_known_coupon_type(self.coupon_type)?;
        if self.time <= 0 {
            return Err(EncodingError::MissingField("time"));
        }
        if self.items.is_empty() {
            return Err(EncodingError::MissingField("items"));
        }
        for item in &self.items {
            require_text("items.name", &item.name)?;
            require_text("items.tax_rate", &item.tax_rate)?;
            require_non_negative("items.price", item.price)?;
            require_non_negative("items.quantity", item.quantity)?;
            require_non_negative("items.total", item.total)?;
        }
        if self.payments.is_empty() {
            return Err(EncodingError::MissingField("payments"));
        }
        for payment in &self.payments {
            if PaymentType::try_from(payment.payment_type).is_err() {
                return Err(EncodingError::OutOfRange {
                    field: "payments.payment_type",
                    value: i64::from(payment.payment_type),
                });
            }
            require_non_negative("payments.amount", payment.amount)?;
        }
        require_non_negative("total", self.total)?;
        require_non_negative("total_tax", self.total_tax)?;
        require_non_negative("total_no_tax", self.total_no_tax)?;
        require_non_negative("total_discount", self.total_discount)?;
        validate_tax_groups(&self.tax_groups)
    }
}
