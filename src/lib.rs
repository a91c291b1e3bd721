// src/lib.rs

//! # Fiskalizimi - Fiscal Coupon Signing
//!
//! Signs fiscal coupons and submits them to the fiscalization service, and
//! provisions the P-256 identity a point-of-sale terminal signs them with.
//!
//! ## Architecture Overview
//! 1. **Models**: protobuf coupon records and the merchant identity request
//! 2. **Utils**: canonical encoding, base64 framing and the ECDSA signer
//! 3. **Wallet**: key pair generation, PEM export and CSR construction
//! 4. **Services**: the signing pipeline and the submission client

pub mod config;    // Environment selection and settings
pub mod error;     // Error taxonomy
pub mod models;    // Data structures
pub mod services;  // Signing pipeline and submission
pub mod utils;     // Encoding and signing helpers
pub mod wallet;    // Cryptographic key operations
