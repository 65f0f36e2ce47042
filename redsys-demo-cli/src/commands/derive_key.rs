//! Derive-key command - show the per-order signing key

use std::path::Path;

use anyhow::{Context, Result};
use redsys_lib::request::format_order_number;
use redsys_lib::signature;

use crate::ui;

pub fn run(config_path: Option<&Path>, order: &str) -> Result<()> {
    let (config, credentials) = super::load_credentials(config_path)?;
    let padded = format_order_number(order);
    let key = signature::derive_key(credentials.secret(), &padded)
        .context("Failed to derive signing key")?;

    ui::header("Diversified Key");
    ui::key_value("Merchant", &config.merchant_code);
    ui::key_value("Order", &padded);
    ui::key_value("Key", &hex::encode(key.as_slice()));
    ui::warning("This key signs every request for the order; do not share it");
    Ok(())
}
