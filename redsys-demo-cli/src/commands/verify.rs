//! Verify command - validate a gateway notification

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use redsys_lib::notification::{
    NotificationFields, NotificationPayload, NotificationValidator, RejectionReason,
    TransactionOutcome,
};

use crate::ui;

/// Where the notification fields come from.
pub enum FieldSource {
    /// A JSON file with `Ds_SignatureVersion`, `Ds_MerchantParameters` and `Ds_Signature`.
    File(PathBuf),
    /// Values given on the command line.
    Inline {
        signature_version: Option<String>,
        merchant_parameters: Option<String>,
        signature: Option<String>,
    },
}

impl FieldSource {
    fn load(self) -> Result<NotificationFields> {
        match self {
            Self::File(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read notification {}", path.display()))?;
                serde_json::from_str(&contents).context("Failed to parse notification form")
            }
            Self::Inline {
                signature_version,
                merchant_parameters,
                signature,
            } => Ok(NotificationFields {
                signature_version,
                merchant_parameters,
                signature,
            }),
        }
    }
}

pub fn run(config_path: Option<&Path>, source: FieldSource, verbose: bool) -> Result<()> {
    let (_, credentials) = super::load_credentials(config_path)?;
    let fields = source.load()?;
    let report = NotificationValidator::new().validate(&credentials, &fields);

    ui::header("Notification");
    ui::key_value("Outcome", &describe(&report.outcome));
    if let Some(payload) = &report.payload {
        print_payload(payload, verbose)?;
    }

    match &report.outcome {
        TransactionOutcome::Accepted => {
            ui::success("Payment accepted");
            Ok(())
        }
        TransactionOutcome::Rejected(RejectionReason::GatewayDeclined { response }) => {
            ui::warning(&format!("Payment declined by the gateway ({})", response));
            bail!("notification declined")
        }
        other => {
            ui::error("Notification could not be authenticated");
            bail!("notification rejected: {}", describe(other))
        }
    }
}

fn describe(outcome: &TransactionOutcome) -> String {
    match outcome {
        TransactionOutcome::Accepted => "accepted".to_string(),
        TransactionOutcome::Rejected(RejectionReason::InvalidSignature) => {
            "invalid signature".to_string()
        }
        TransactionOutcome::Rejected(RejectionReason::GatewayDeclined { response }) => {
            format!("declined (Ds_Response {})", response)
        }
        TransactionOutcome::MalformedPayload { reason } => format!("malformed payload: {}", reason),
        TransactionOutcome::MalformedSignature => "malformed signature".to_string(),
        TransactionOutcome::MissingField { field } => format!("missing field {}", field),
    }
}

fn print_payload(payload: &NotificationPayload, verbose: bool) -> Result<()> {
    ui::key_value("Order", payload.order());
    ui::optional_field("Response", payload.response().as_deref());
    ui::optional_field("Amount", payload.amount().as_deref());
    ui::optional_field("Currency", payload.currency().as_deref());
    ui::optional_field("Authorisation", payload.authorisation_code().as_deref());
    ui::optional_field("Card country", payload.card_country().as_deref());
    if let Some(time) = payload.transaction_time() {
        ui::key_value("Time", &time.to_string());
    }
    ui::flag("3-D Secure", payload.is_secure_payment());

    if verbose {
        ui::separator();
        ui::json(&serde_json::to_value(payload.parameters())?)?;
    }
    Ok(())
}
