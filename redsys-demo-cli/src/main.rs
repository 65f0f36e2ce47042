//! Redsys Demo CLI
//!
//! Command-line interface for signing payment requests and checking gateway
//! notifications with redsys-lib.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "redsys-demo")]
#[command(about = "Redsys Demo CLI - Sign payment requests and validate notifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Gateway configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a signed payment form
    Sign {
        /// Order number (padded to four digits)
        #[arg(short, long)]
        order: String,

        /// Amount in minor units (e.g. cents)
        #[arg(short, long)]
        amount: String,

        /// Currency code
        #[arg(short, long, default_value = "EUR")]
        currency: String,

        /// Server-to-server notification URL
        #[arg(long, default_value = "")]
        merchant_url: String,

        /// Return URL after a successful payment
        #[arg(long, default_value = "")]
        ok_url: String,

        /// Return URL after a failed payment
        #[arg(long, default_value = "")]
        ko_url: String,

        /// Transaction type (defaults to 0, authorization)
        #[arg(long)]
        transaction_type: Option<String>,

        /// Product description shown on the payment page
        #[arg(long)]
        description: Option<String>,

        /// Cardholder name
        #[arg(long)]
        titular: Option<String>,

        /// Merchant display name
        #[arg(long)]
        merchant_name: Option<String>,
    },

    /// Validate a gateway notification
    Verify {
        /// Ds_SignatureVersion value
        #[arg(long = "version")]
        signature_version: Option<String>,

        /// Ds_MerchantParameters value
        #[arg(long)]
        params: Option<String>,

        /// Ds_Signature value
        #[arg(long)]
        signature: Option<String>,

        /// JSON file holding the three Ds_* fields
        #[arg(long, conflicts_with_all = ["signature_version", "params", "signature"])]
        form: Option<PathBuf>,
    },

    /// Show the diversified signing key for an order
    DeriveKey {
        /// Order number (padded to four digits)
        #[arg(short, long)]
        order: String,
    },

    /// Show supported currencies
    Currency {
        /// Alphabetic code to look up
        code: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("redsys_demo_cli=debug,redsys_lib=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("redsys_demo_cli=info,redsys_lib=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sign {
            order,
            amount,
            currency,
            merchant_url,
            ok_url,
            ko_url,
            transaction_type,
            description,
            titular,
            merchant_name,
        } => {
            let args = commands::sign::SignArgs {
                order,
                amount,
                currency,
                merchant_url,
                ok_url,
                ko_url,
                transaction_type,
                description,
                titular,
                merchant_name,
            };
            commands::sign::run(config_path, args)?;
        }
        Commands::Verify {
            signature_version,
            params,
            signature,
            form,
        } => {
            let source = match form {
                Some(path) => commands::verify::FieldSource::File(path),
                None => commands::verify::FieldSource::Inline {
                    signature_version,
                    merchant_parameters: params,
                    signature,
                },
            };
            commands::verify::run(config_path, source, cli.verbose)?;
        }
        Commands::DeriveKey { order } => {
            commands::derive_key::run(config_path, &order)?;
        }
        Commands::Currency { code } => {
            commands::currency::run(code.as_deref())?;
        }
    }

    Ok(())
}
