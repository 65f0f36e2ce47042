//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use redsys_lib::{Environment, GatewayConfig, MerchantCredentials};

pub mod currency;
pub mod derive_key;
pub mod sign;
pub mod verify;

/// Environment variables that override the configuration file.
pub const ENV_MERCHANT_CODE: &str = "REDSYS_MERCHANT_CODE";
pub const ENV_TERMINAL: &str = "REDSYS_TERMINAL";
pub const ENV_SECRET_KEY: &str = "REDSYS_SECRET_KEY";
pub const ENV_ENVIRONMENT: &str = "REDSYS_ENVIRONMENT";

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("redsys-demo")
        .join("config.json")
}

/// Read a configuration file.
pub fn read_config(path: &Path) -> Result<GatewayConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration {}", path.display()))
}

/// Apply `REDSYS_*` overrides on top of an optional file configuration.
///
/// `lookup` resolves variable names; pass `std::env::var` in production.
pub fn apply_overrides<F>(base: Option<GatewayConfig>, lookup: F) -> Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let merchant_code = lookup(ENV_MERCHANT_CODE);
    let secret_key = lookup(ENV_SECRET_KEY);

    let mut config = match base {
        Some(mut config) => {
            if let Some(code) = merchant_code {
                config.merchant_code = code;
            }
            if let Some(secret) = secret_key {
                config.secret_key = secret;
            }
            config
        }
        None => match (merchant_code, secret_key) {
            (Some(code), Some(secret)) => GatewayConfig::new(code, secret),
            _ => {
                return Err(anyhow!(
                    "No gateway configuration: pass --config or set {} and {}",
                    ENV_MERCHANT_CODE,
                    ENV_SECRET_KEY
                ))
            }
        },
    };

    if let Some(terminal) = lookup(ENV_TERMINAL) {
        config.terminal = terminal;
    }
    if let Some(environment) = lookup(ENV_ENVIRONMENT) {
        config.environment = environment
            .parse::<Environment>()
            .with_context(|| format!("Invalid {}", ENV_ENVIRONMENT))?;
    }

    Ok(config)
}

/// Load the gateway configuration for a command.
///
/// An explicit path must exist; the default path is optional.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let base = match path {
        Some(path) => Some(read_config(path)?),
        None => {
            let default = default_config_path();
            if default.exists() {
                Some(read_config(&default)?)
            } else {
                None
            }
        }
    };

    let config = apply_overrides(base, |name| std::env::var(name).ok())?;
    tracing::debug!(
        merchant_code = %config.merchant_code,
        environment = config.environment.as_str(),
        "loaded gateway configuration"
    );
    Ok(config)
}

/// Load the configuration and decode its credentials.
pub fn load_credentials(path: Option<&Path>) -> Result<(GatewayConfig, MerchantCredentials)> {
    let config = load_config(path)?;
    let credentials = config
        .credentials()
        .context("Invalid merchant secret in configuration")?;
    Ok((config, credentials))
}
