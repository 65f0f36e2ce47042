//! Sign command - build a signed payment form

use std::path::Path;

use anyhow::{Context, Result};
use redsys_lib::request::{ExtraFields, PaymentForm, PaymentRequest, RequestBuilder, ReturnUrls};

use crate::ui;

/// Arguments of the `sign` command.
pub struct SignArgs {
    pub order: String,
    pub amount: String,
    pub currency: String,
    pub merchant_url: String,
    pub ok_url: String,
    pub ko_url: String,
    pub transaction_type: Option<String>,
    pub description: Option<String>,
    pub titular: Option<String>,
    pub merchant_name: Option<String>,
}

impl SignArgs {
    fn into_request(self) -> PaymentRequest {
        let extra = ExtraFields {
            transaction_type: self.transaction_type,
            product_description: self.description,
            titular: self.titular,
            merchant_name: self.merchant_name,
        };
        PaymentRequest::new(
            self.order,
            self.amount,
            self.currency,
            ReturnUrls::new(self.merchant_url, self.ok_url, self.ko_url),
        )
        .with_extra(extra)
    }
}

pub fn run(config_path: Option<&Path>, args: SignArgs) -> Result<()> {
    let (config, credentials) = super::load_credentials(config_path)?;
    let request = args.into_request();

    let envelope = RequestBuilder::new()
        .build(&credentials, &request)
        .with_context(|| format!("Failed to sign order {}", request.order))?;
    tracing::info!(order = %request.order, "payment request signed");

    let form = PaymentForm::new(config.action_url(), envelope);
    ui::json(&serde_json::to_value(&form)?)
}
