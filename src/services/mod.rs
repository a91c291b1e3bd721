pub mod coupon_signer;
pub mod coupon_source;
pub mod submission_client;
