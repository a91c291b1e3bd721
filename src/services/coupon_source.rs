// src/services/coupon_source.rs
//! Coupon business data supplied to the signing pipeline.
//!
//! Real deployments plug their till software in behind [`CouponSource`];
//! [`SampleCouponSource`] provides a fixed demo receipt for the test
//! environment.

use crate::models::coupon::{
    CitizenCoupon, CouponItem, CouponType, Payment, PaymentType, PosCoupon, TaxGroup,
};

/// Supplies the coupons for one sale.
pub trait CouponSource {
    fn citizen_coupon(&self) -> CitizenCoupon;
    fn pos_coupon(&self) -> PosCoupon;
}

/// Fixed three-item receipt issued at a given time.
pub struct SampleCouponSource {
    time: i64,
}

impl SampleCouponSource {
    pub fn new(time: i64) -> Self {
        Self { time }
    }

    /// Sample receipt stamped with the current time.
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().timestamp())
    }

    fn items() -> Vec<CouponItem> {
        vec![
            item("Uje Rugove", 150, 2, "C"),
            item("Buke", 50, 3, "D"),
            item("Kafe Espresso", 100, 1, "C"),
        ]
    }

    fn tax_groups() -> Vec<TaxGroup> {
        vec![
            TaxGroup {
                tax_rate: "C".to_string(),
                total_for_tax: 400,
                total_tax: 61,
            },
            TaxGroup {
                tax_rate: "D".to_string(),
                total_for_tax: 150,
                total_tax: 11,
            },
        ]
    }
}

fn item(name: &str, price: i64, quantity: i64, tax_rate: &str) -> CouponItem {
    CouponItem {
        name: name.to_string(),
        price,
        unit: "copë".to_string(),
        quantity,
        total: price * quantity,
        tax_rate: tax_rate.to_string(),
        item_type: "TT".to_string(),
    }
}

const BUSINESS_ID: u64 = 510_600_700;
const BRANCH_ID: u64 = 1;
const POS_ID: u64 = 1;
const COUPON_ID: u64 = 1234;
const TOTAL: i64 = 550;
const TOTAL_TAX: i64 = 72;

impl CouponSource for SampleCouponSource {
    fn citizen_coupon(&self) -> CitizenCoupon {
        CitizenCoupon {
            business_id: BUSINESS_ID,
            pos_id: POS_ID,
            coupon_id: COUPON_ID,
            branch_id: BRANCH_ID,
            coupon_type: CouponType::Sale as i32,
            time: self.time,
            total: TOTAL,
            tax_groups: Self::tax_groups(),
            total_tax: TOTAL_TAX,
            total_no_tax: TOTAL - TOTAL_TAX,
        }
    }

    fn pos_coupon(&self) -> PosCoupon {
        PosCoupon {
            business_id: BUSINESS_ID,
            pos_id: POS_ID,
            coupon_id: COUPON_ID,
            branch_id: BRANCH_ID,
            location: "Prishtine".to_string(),
            operator_id: "Kushtrimi".to_string(),
            coupon_type: CouponType::Sale as i32,
            time: self.time,
            items: Self::items(),
            payments: vec![
                Payment {
                    payment_type: PaymentType::Cash as i32,
                    amount: 300,
                },
                Payment {
                    payment_type: PaymentType::CreditCard as i32,
                    amount: 250,
                },
            ],
            total: TOTAL,
            tax_groups: Self::tax_groups(),
            total_tax: TOTAL_TAX,
            total_no_tax: TOTAL - TOTAL_TAX,
            total_discount: 0,
        }
    }
}
