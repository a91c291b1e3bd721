// src/config.rs
//! Runtime configuration.
//!
//! Settings come from built-in defaults overridden by environment variables
//! prefixed with `FISKALIZIMI_` (a `.env` file is loaded first by `main`):
//! - `FISKALIZIMI_ENVIRONMENT`: `test` (default) or `production`
//! - `FISKALIZIMI_BASE_URL`: (Optional) override of the environment's base URL
//! - `FISKALIZIMI_TIMEOUT_SECS`: request deadline, default 30
//! - `FISKALIZIMI_CITIZEN_ID`: citizen id sent with QR codes, default 1
//! - `FISKALIZIMI_OUTPUT_DIR`: (Optional) directory for exported PEM files

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const PRODUCTION_BASE_URL: &str = "https://fiskalizimi.atk-ks.org";
const TEST_BASE_URL: &str = "https://fiskalizimi-test.atk-ks.org";

const CITIZEN_COUPON_PATH: &str = "/citizen/coupon";
const POS_COUPON_PATH: &str = "/pos/coupon";

/// Fiscalization service environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Production,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Test => TEST_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        }
    }

    pub fn endpoints(self) -> Endpoints {
        Endpoints::from_base_url(self.base_url())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Coupon endpoints of one fiscalization service deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub citizen_url: String,
    pub pos_url: String,
}

impl Endpoints {
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            citizen_url: format!("{base}{CITIZEN_COUPON_PATH}"),
            pos_url: format!("{base}{POS_COUPON_PATH}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    environment: String,
    base_url: Option<String>,
    timeout_secs: u64,
    citizen_id: u64,
    output_dir: Option<PathBuf>,
}

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub citizen_id: u64,
    pub output_dir: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from defaults and `FISKALIZIMI_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let raw: RawSettings = config::Config::builder()
            .set_default("environment", "test")?
            .set_default("timeout_secs", 30)?
            .set_default("citizen_id", 1)?
            .add_source(config::Environment::with_prefix("FISKALIZIMI").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let environment: Environment = raw.environment.parse()?;
        let endpoints = match raw.base_url.as_deref() {
            Some(base_url) if !base_url.trim().is_empty() => Endpoints::from_base_url(base_url),
            _ => environment.endpoints(),
        };
        Ok(Self {
            environment,
            endpoints,
            timeout: Duration::from_secs(raw.timeout_secs),
            citizen_id: raw.citizen_id,
            output_dir: raw.output_dir,
        })
    }
}
