// src/main.rs

//! # Fiskalizimi - Main Entry Point
//!
//! Demonstrates the full flow against the configured fiscalization service:
//! 1. Generate a P-256 key pair and export it as PKCS#8 PEM
//! 2. Build the PKCS#10 CSR for the terminal identity
//! 3. Sign a POS coupon and a citizen coupon
//! 4. Submit both coupons concurrently and log each outcome
//!
//! ## Environment Variables
//! - `FISKALIZIMI_ENVIRONMENT`: `test` (default) or `production`
//! - `FISKALIZIMI_BASE_URL`: (Optional) endpoint base URL override
//! - `FISKALIZIMI_TIMEOUT_SECS`: (Optional) request deadline in seconds
//! - `FISKALIZIMI_CITIZEN_ID`: (Optional) citizen id for the QR submission
//! - `FISKALIZIMI_OUTPUT_DIR`: (Optional) write PEM files here instead of stdout
//! - `RUST_LOG`: log level (default `info`)

use anyhow::Context;
use dotenv::dotenv;
use fiskalizimi::config::Settings;
use fiskalizimi::models::identity::IdentityRequest;
use fiskalizimi::services::coupon_signer::{sign_citizen_coupon, sign_pos_coupon};
use fiskalizimi::services::coupon_source::{CouponSource, SampleCouponSource};
use fiskalizimi::services::submission_client::{SubmissionClient, SubmissionRequest};
use fiskalizimi::wallet::key_management::KeyPair;
use std::path::Path;

/// Writes exported PEM material to `dir/name`, or to stdout when no directory is configured.
fn export_pem(dir: Option<&Path>, name: &str, title: &str, pem: &str) -> anyhow::Result<()> {
    match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            let path = dir.join(name);
            std::fs::write(&path, pem).with_context(|| format!("writing {}", path.display()))?;
            log::info!("{} written to {}", title, path.display());
        }
        None => {
            println!("Generated {title}:");
            println!("{pem}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("loading settings")?;
    log::info!("using {:?} environment", settings.environment);

    let identity = IdentityRequest::new("RKS", "TEST CORP", 510_600_700, 1, 1);

    // Without a key nothing else can proceed
    let key_pair = KeyPair::generate().context("generating key pair")?;
    let private_key_pem = key_pair.to_pkcs8_pem()?;
    export_pem(
        settings.output_dir.as_deref(),
        "private_key.pem",
        "private key",
        &private_key_pem,
    )?;

    let csr_pem = key_pair.build_csr(&identity).context("building CSR")?;
    export_pem(settings.output_dir.as_deref(), "csr.pem", "CSR", &csr_pem)?;

    let source = SampleCouponSource::now();
    let signer = key_pair.signer();

    let pos_request = SubmissionRequest::from(
        sign_pos_coupon(&source.pos_coupon(), &signer).context("signing pos coupon")?,
    );
    let citizen_request = SubmissionRequest::citizen(
        settings.citizen_id,
        sign_citizen_coupon(&source.citizen_coupon(), &signer)
            .context("signing citizen coupon")?,
    );

    // Independent submissions: one failing does not block the other
    let client = SubmissionClient::new(settings.endpoints.clone(), settings.timeout);
    let (pos_result, citizen_result) = tokio::join!(
        client.submit_logged(&pos_request),
        client.submit_logged(&citizen_request),
    );

    let failed = [pos_result.is_err(), citizen_result.is_err()]
        .iter()
        .filter(|failed| **failed)
        .count();
    if failed > 0 {
        log::warn!("{failed} of 2 submissions failed");
    }
    Ok(())
}
