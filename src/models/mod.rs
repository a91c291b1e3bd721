pub mod coupon;
pub mod identity;
