//! Outbound payment requests.
//!
//! A request is assembled into a fresh [`ParameterSet`] per call, encoded,
//! and signed with a key diversified by the (padded) order number. Nothing
//! about one request outlives the call that builds it.

use serde::{Deserialize, Serialize};

use crate::currency::to_numeric_code;
use crate::params::{keys, ParameterSet};
use crate::signature::{SignatureEngine, SIGNATURE_VERSION};
use crate::{MerchantCredentials, RedsysError, Result};

/// Minimum order length accepted by the gateway.
pub const ORDER_MIN_LEN: usize = 4;

/// Maximum order length accepted by the gateway.
pub const ORDER_MAX_LEN: usize = 12;

/// Default transaction type: standard authorization.
pub const DEFAULT_TRANSACTION_TYPE: &str = "0";

/// Transport form field names.
pub mod fields {
    pub const SIGNATURE_VERSION: &str = "Ds_SignatureVersion";
    pub const MERCHANT_PARAMETERS: &str = "Ds_MerchantParameters";
    pub const SIGNATURE: &str = "Ds_Signature";
}

/// Left-pad an order number with `'0'` to the minimum length.
///
/// Longer numbers are returned unchanged, never truncated.
///
/// ```
/// use redsys_lib::request::format_order_number;
///
/// assert_eq!(format_order_number("1"), "0001");
/// assert_eq!(format_order_number("12345"), "12345");
/// ```
pub fn format_order_number(order_number: &str) -> String {
    format!("{:0>width$}", order_number, width = ORDER_MIN_LEN)
}

/// Callback and return URLs for one payment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnUrls {
    /// Server-to-server notification URL.
    pub merchant_url: String,
    /// Where the customer lands after a successful payment.
    pub ok_url: String,
    /// Where the customer lands after a failed or cancelled payment.
    pub ko_url: String,
}

impl ReturnUrls {
    /// Create the URL triple.
    pub fn new(
        merchant_url: impl Into<String>,
        ok_url: impl Into<String>,
        ko_url: impl Into<String>,
    ) -> Self {
        Self {
            merchant_url: merchant_url.into(),
            ok_url: ok_url.into(),
            ko_url: ko_url.into(),
        }
    }
}

/// Optional request fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraFields {
    /// Transaction type, `"0"` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    /// Product description shown on the payment page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    /// Cardholder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titular: Option<String>,
    /// Merchant display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
}

impl ExtraFields {
    /// Set the transaction type.
    pub fn with_transaction_type(mut self, value: impl Into<String>) -> Self {
        self.transaction_type = Some(value.into());
        self
    }

    /// Set the product description.
    pub fn with_product_description(mut self, value: impl Into<String>) -> Self {
        self.product_description = Some(value.into());
        self
    }

    /// Set the cardholder name.
    pub fn with_titular(mut self, value: impl Into<String>) -> Self {
        self.titular = Some(value.into());
        self
    }

    /// Set the merchant display name.
    pub fn with_merchant_name(mut self, value: impl Into<String>) -> Self {
        self.merchant_name = Some(value.into());
        self
    }
}

/// Everything that varies between payment requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Order number before padding.
    pub order: String,
    /// Amount in minor units (e.g. cents).
    pub amount: String,
    /// Alphabetic currency code.
    pub currency: String,
    /// Notification and return URLs.
    pub urls: ReturnUrls,
    /// Optional fields.
    #[serde(default)]
    pub extra: ExtraFields,
}

impl PaymentRequest {
    /// Create a request with no optional fields.
    pub fn new(
        order: impl Into<String>,
        amount: impl Into<String>,
        currency: impl Into<String>,
        urls: ReturnUrls,
    ) -> Self {
        Self {
            order: order.into(),
            amount: amount.into(),
            currency: currency.into(),
            urls,
            extra: ExtraFields::default(),
        }
    }

    /// Attach optional fields.
    pub fn with_extra(mut self, extra: ExtraFields) -> Self {
        self.extra = extra;
        self
    }
}

/// The three transport fields posted to the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

impl SignedEnvelope {
    /// Fields as `(name, value)` pairs in form order.
    pub fn form_fields(&self) -> [(&'static str, &str); 3] {
        [
            (fields::SIGNATURE_VERSION, &self.signature_version),
            (fields::MERCHANT_PARAMETERS, &self.merchant_parameters),
            (fields::SIGNATURE, &self.signature),
        ]
    }

    /// Decode the embedded parameter set.
    pub fn parameters(&self) -> Result<ParameterSet> {
        ParameterSet::decode(&self.merchant_parameters)
    }
}

/// A signed envelope together with where and how to submit it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentForm {
    /// Form action URL.
    pub action: String,
    /// HTTP method, always `POST`.
    pub method: String,
    /// Hidden form fields.
    pub fields: SignedEnvelope,
}

impl PaymentForm {
    /// Wrap an envelope for submission to `action`.
    pub fn new(action: impl Into<String>, fields: SignedEnvelope) -> Self {
        Self {
            action: action.into(),
            method: "POST".to_string(),
            fields,
        }
    }
}

/// Builds signed payment requests.
#[derive(Clone, Debug, Default)]
pub struct RequestBuilder {
    engine: SignatureEngine,
}

impl RequestBuilder {
    /// Create a builder using the default signature engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder using a specific signature engine.
    pub fn with_engine(engine: SignatureEngine) -> Self {
        Self { engine }
    }

    /// Assemble the outbound parameter set.
    ///
    /// Returns the padded order number alongside the set: that exact string
    /// is both the `DS_MERCHANT_ORDER` value and the key diversifier.
    pub fn parameters(
        &self,
        credentials: &MerchantCredentials,
        request: &PaymentRequest,
    ) -> Result<(String, ParameterSet)> {
        let order = format_order_number(&request.order);
        if order.chars().count() > ORDER_MAX_LEN {
            return Err(RedsysError::invalid_order(
                &request.order,
                format!("longer than {} characters", ORDER_MAX_LEN),
            ));
        }
        if request.amount.is_empty() || !request.amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RedsysError::InvalidAmount(request.amount.clone()));
        }
        let currency = to_numeric_code(&request.currency)?;
        let extra = &request.extra;
        let transaction_type = extra
            .transaction_type
            .as_deref()
            .unwrap_or(DEFAULT_TRANSACTION_TYPE);

        let mut params = ParameterSet::new()
            .with(keys::AMOUNT, request.amount.as_str())
            .with(keys::ORDER, order.as_str())
            .with(keys::MERCHANT_CODE, credentials.merchant_code())
            .with(keys::CURRENCY, currency)
            .with(keys::TERMINAL, credentials.terminal())
            .with(keys::TRANSACTION_TYPE, transaction_type);

        if let Some(description) = &extra.product_description {
            params.insert(keys::PRODUCT_DESCRIPTION, description.as_str());
        }
        if let Some(titular) = &extra.titular {
            params.insert(keys::TITULAR, titular.as_str());
        }
        if let Some(name) = &extra.merchant_name {
            params.insert(keys::MERCHANT_NAME, name.as_str());
        }

        params.insert(keys::MERCHANT_URL, request.urls.merchant_url.as_str());
        params.insert(keys::URL_OK, request.urls.ok_url.as_str());
        params.insert(keys::URL_KO, request.urls.ko_url.as_str());

        Ok((order, params))
    }

    /// Build the signed envelope for a payment request.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, credentials, request), fields(order = %request.order)))]
    pub fn build(
        &self,
        credentials: &MerchantCredentials,
        request: &PaymentRequest,
    ) -> Result<SignedEnvelope> {
        let (order, params) = self.parameters(credentials, request)?;
        let merchant_parameters = params.encode()?;
        let signature =
            self.engine
                .compute_signature(credentials.secret(), &order, &merchant_parameters)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(order = %order, "signed payment request");

        Ok(SignedEnvelope {
            signature_version: SIGNATURE_VERSION.to_string(),
            merchant_parameters,
            signature,
        })
    }
}

/// Build a signed envelope with the default engine.
pub fn build(credentials: &MerchantCredentials, request: &PaymentRequest) -> Result<SignedEnvelope> {
    RequestBuilder::default().build(credentials, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature;

    fn credentials() -> MerchantCredentials {
        MerchantCredentials::from_base64("999008881", "1", "sq7HjrUOBfKmC576ILgskD5srU870gJ7")
            .unwrap()
    }

    fn request(order: &str) -> PaymentRequest {
        PaymentRequest::new(
            order,
            "100",
            "EUR",
            ReturnUrls::new(
                "https://shop.example/notify",
                "https://shop.example/ok/42",
                "https://shop.example/ko/42",
            ),
        )
    }

    #[test]
    fn test_format_order_number() {
        assert_eq!(format_order_number("1"), "0001");
        assert_eq!(format_order_number("123"), "0123");
        assert_eq!(format_order_number("1234"), "1234");
        assert_eq!(format_order_number("12345"), "12345");
        assert_eq!(format_order_number(""), "0000");
    }

    #[test]
    fn test_end_to_end_padded_order() {
        let creds = credentials();
        let envelope = build(&creds, &request("1")).unwrap();

        assert_eq!(envelope.signature_version, "HMAC_SHA256_V1");
        let params = envelope.parameters().unwrap();
        assert_eq!(params.get_text(keys::ORDER).as_deref(), Some("0001"));
        assert_eq!(params.get_text(keys::AMOUNT).as_deref(), Some("100"));
        assert_eq!(params.get_text(keys::CURRENCY).as_deref(), Some("978"));
        assert_eq!(params.get_text(keys::MERCHANT_CODE).as_deref(), Some("999008881"));
        assert_eq!(params.get_text(keys::TERMINAL).as_deref(), Some("1"));
        assert_eq!(params.get_text(keys::TRANSACTION_TYPE).as_deref(), Some("0"));

        assert!(signature::verify(
            &envelope.signature,
            creds.secret(),
            "0001",
            &envelope.merchant_parameters
        ));
        assert!(!signature::verify(
            &envelope.signature,
            creds.secret(),
            "1",
            &envelope.merchant_parameters
        ));
    }

    #[test]
    fn test_key_order_matches_gateway_layout() {
        let extra = ExtraFields::default()
            .with_product_description("Blue mug")
            .with_merchant_name("Mug Shop");
        let (_, params) = RequestBuilder::new()
            .parameters(&credentials(), &request("42").with_extra(extra))
            .unwrap();

        let names: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                keys::AMOUNT,
                keys::ORDER,
                keys::MERCHANT_CODE,
                keys::CURRENCY,
                keys::TERMINAL,
                keys::TRANSACTION_TYPE,
                keys::PRODUCT_DESCRIPTION,
                keys::MERCHANT_NAME,
                keys::MERCHANT_URL,
                keys::URL_OK,
                keys::URL_KO,
            ]
        );
    }

    #[test]
    fn test_optional_fields_absent_by_default() {
        let (_, params) = RequestBuilder::new()
            .parameters(&credentials(), &request("42"))
            .unwrap();
        assert_eq!(params.len(), 9);
        assert!(!params.contains_key(keys::TITULAR));
    }

    #[test]
    fn test_custom_transaction_type() {
        let extra = ExtraFields::default()
            .with_transaction_type("1")
            .with_titular("Jane Doe");
        let envelope = build(&credentials(), &request("42").with_extra(extra)).unwrap();
        let params = envelope.parameters().unwrap();
        assert_eq!(params.get_text(keys::TRANSACTION_TYPE).as_deref(), Some("1"));
        assert_eq!(params.get_text(keys::TITULAR).as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_unsupported_currency_propagates() {
        let mut req = request("42");
        req.currency = "XYZ".to_string();
        assert!(matches!(
            build(&credentials(), &req),
            Err(RedsysError::UnsupportedCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn test_rejects_long_order_and_bad_amount() {
        assert!(build(&credentials(), &request("123456789012")).is_ok());
        assert!(matches!(
            build(&credentials(), &request("1234567890123")),
            Err(RedsysError::InvalidOrder { .. })
        ));

        for amount in ["", "1.50", "-1", "12a"] {
            let mut req = request("42");
            req.amount = amount.to_string();
            assert!(
                matches!(build(&credentials(), &req), Err(RedsysError::InvalidAmount(_))),
                "amount {:?} should be rejected",
                amount
            );
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let creds = credentials();
        let a = build(&creds, &request("42")).unwrap();
        let b = build(&creds, &request("42")).unwrap();
        assert_eq!(a, b);

        let c = build(&creds, &request("43")).unwrap();
        assert_ne!(a.signature, c.signature);
    }

    #[test]
    fn test_envelope_serializes_with_wire_names() {
        let envelope = build(&credentials(), &request("42")).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["Ds_SignatureVersion"], "HMAC_SHA256_V1");
        assert!(json["Ds_MerchantParameters"].is_string());
        assert!(json["Ds_Signature"].is_string());

        let names: Vec<&str> = envelope.form_fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["Ds_SignatureVersion", "Ds_MerchantParameters", "Ds_Signature"]);
    }
}
