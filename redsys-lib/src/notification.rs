//! Inbound payment notifications.
//!
//! Validation is a single pass over the three transport fields:
//!
//! 1. all fields present, else [`TransactionOutcome::MissingField`]
//! 2. parameters decode, else [`TransactionOutcome::MalformedPayload`]
//! 3. signature well-formed and re-derives, else
//!    [`TransactionOutcome::MalformedSignature`] or
//!    [`RejectionReason::InvalidSignature`]
//! 4. `Ds_Response` in `0..=99` is accepted, anything else is declined
//!
//! Unauthenticated notifications never reach step 4 and carry no payload.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::request::{fields, SignedEnvelope};
use crate::signature::{self, SignatureEngine, SIGNATURE_VERSION};
use crate::{MerchantCredentials, RedsysError, Result};

/// Notification payload keys.
pub mod keys {
    pub const RESPONSE: &str = "Ds_Response";
    pub const AMOUNT: &str = "Ds_Amount";
    pub const ORDER: &str = "Ds_Order";
    /// Alternate spelling of [`ORDER`] used by some gateway versions.
    pub const ORDER_UPPER: &str = "DS_ORDER";
    pub const MERCHANT_CODE: &str = "Ds_MerchantCode";
    pub const CURRENCY: &str = "Ds_Currency";
    pub const DATE: &str = "Ds_Date";
    pub const HOUR: &str = "Ds_Hour";
    pub const SECURE_PAYMENT: &str = "Ds_SecurePayment";
    pub const CARD_COUNTRY: &str = "Ds_Card_Country";
    pub const AUTHORISATION_CODE: &str = "Ds_AuthorisationCode";
    pub const CONSUMER_LANGUAGE: &str = "Ds_ConsumerLanguage";
    pub const CARD_TYPE: &str = "Ds_Card_Type";
    pub const MERCHANT_DATA: &str = "Ds_MerchantData";
}

/// Highest response code that still means the payment went through.
pub const MAX_SUCCESS_RESPONSE: i64 = 99;

/// The transport fields of a notification, as received.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFields {
    #[serde(rename = "Ds_SignatureVersion", default)]
    pub signature_version: Option<String>,
    #[serde(rename = "Ds_MerchantParameters", default)]
    pub merchant_parameters: Option<String>,
    #[serde(rename = "Ds_Signature", default)]
    pub signature: Option<String>,
}

impl NotificationFields {
    /// Pick the transport fields out of decoded form pairs.
    ///
    /// Unknown fields are ignored; a repeated field keeps its last value.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut out = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                fields::SIGNATURE_VERSION => out.signature_version = Some(value.into()),
                fields::MERCHANT_PARAMETERS => out.merchant_parameters = Some(value.into()),
                fields::SIGNATURE => out.signature = Some(value.into()),
                _ => {}
            }
        }
        out
    }
}

impl From<SignedEnvelope> for NotificationFields {
    fn from(envelope: SignedEnvelope) -> Self {
        Self {
            signature_version: Some(envelope.signature_version),
            merchant_parameters: Some(envelope.merchant_parameters),
            signature: Some(envelope.signature),
        }
    }
}

/// Decoded and authenticated notification parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NotificationPayload {
    order: String,
    params: ParameterSet,
}

impl NotificationPayload {
    /// Order identifier used as the key diversifier.
    pub fn order(&self) -> &str {
        &self.order
    }

    /// Every decoded parameter.
    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    /// Raw `Ds_Response`.
    pub fn response(&self) -> Option<String> {
        self.params.get_text(keys::RESPONSE)
    }

    /// `Ds_Response` as an integer, when it is one.
    pub fn response_code(&self) -> Option<i64> {
        self.response().and_then(|r| r.trim().parse().ok())
    }

    /// `Ds_Amount` in minor units.
    pub fn amount(&self) -> Option<String> {
        self.params.get_text(keys::AMOUNT)
    }

    /// `Ds_MerchantCode`.
    pub fn merchant_code(&self) -> Option<String> {
        self.params.get_text(keys::MERCHANT_CODE)
    }

    /// `Ds_Currency` as the numeric ISO code.
    pub fn currency(&self) -> Option<String> {
        self.params.get_text(keys::CURRENCY)
    }

    /// Raw `Ds_Date`.
    pub fn date(&self) -> Option<String> {
        self.params.get_text(keys::DATE)
    }

    /// Raw `Ds_Hour`.
    pub fn hour(&self) -> Option<String> {
        self.params.get_text(keys::HOUR)
    }

    /// Raw `Ds_SecurePayment` flag.
    pub fn secure_payment(&self) -> Option<String> {
        self.params.get_text(keys::SECURE_PAYMENT)
    }

    /// True when the gateway reports a 3-D Secure authenticated payment.
    pub fn is_secure_payment(&self) -> bool {
        self.secure_payment().is_some_and(|v| v.trim() == "1")
    }

    /// `Ds_Card_Country`, when the gateway sends it.
    pub fn card_country(&self) -> Option<String> {
        self.params.get_text(keys::CARD_COUNTRY)
    }

    /// `Ds_AuthorisationCode`.
    pub fn authorisation_code(&self) -> Option<String> {
        self.params.get_text(keys::AUTHORISATION_CODE)
    }

    /// `Ds_ConsumerLanguage`.
    pub fn consumer_language(&self) -> Option<String> {
        self.params.get_text(keys::CONSUMER_LANGUAGE)
    }

    /// `Ds_Card_Type` (credit or debit).
    pub fn card_type(&self) -> Option<String> {
        self.params.get_text(keys::CARD_TYPE)
    }

    /// Echoed `Ds_MerchantData`.
    pub fn merchant_data(&self) -> Option<String> {
        self.params.get_text(keys::MERCHANT_DATA)
    }

    /// Transaction timestamp from `Ds_Date` (`dd/mm/yyyy`) and `Ds_Hour` (`HH:MM`).
    ///
    /// The gateway sometimes leaves the separators percent-encoded
    /// (`%2F`, `%3A`); both forms parse.
    pub fn transaction_time(&self) -> Option<NaiveDateTime> {
        let date = unescape_separators(&self.date()?);
        let hour = unescape_separators(&self.hour()?);
        let date = NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y").ok()?;
        let time = NaiveTime::parse_from_str(hour.trim(), "%H:%M").ok()?;
        Some(date.and_time(time))
    }
}

fn unescape_separators(value: &str) -> String {
    value
        .replace("%2F", "/")
        .replace("%2f", "/")
        .replace("%3A", ":")
        .replace("%3a", ":")
}

/// Why an otherwise well-formed notification was not accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The signature does not re-derive: treat as tampering.
    InvalidSignature,
    /// Authenticated, but the response code is not a success.
    GatewayDeclined {
        /// Raw `Ds_Response` (empty when absent)
        response: String,
    },
}

/// Classification of one notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransactionOutcome {
    /// Authenticated, payment succeeded.
    Accepted,
    /// Not accepted; see the reason.
    Rejected(RejectionReason),
    /// `Ds_MerchantParameters` could not be decoded.
    MalformedPayload { reason: String },
    /// `Ds_Signature` is not an encoded HMAC-SHA256 value.
    MalformedSignature,
    /// A required field is absent.
    MissingField { field: String },
}

impl TransactionOutcome {
    /// Check if the payment was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Check if the notification was authenticated (accepted or declined).
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Rejected(RejectionReason::GatewayDeclined { .. })
        )
    }

    /// Map onto the error taxonomy: `Ok(())` only when accepted.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Accepted => Ok(()),
            Self::Rejected(RejectionReason::InvalidSignature) => Err(RedsysError::InvalidSignature),
            Self::Rejected(RejectionReason::GatewayDeclined { response }) => {
                Err(RedsysError::GatewayDeclined { response })
            }
            Self::MalformedPayload { reason } => Err(RedsysError::MalformedPayload(reason)),
            Self::MalformedSignature => Err(RedsysError::MalformedSignature),
            Self::MissingField { field } => Err(RedsysError::MissingField(field)),
        }
    }

    fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }
}

/// Outcome plus, for authenticated notifications, the decoded payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NotificationReport {
    pub outcome: TransactionOutcome,
    pub payload: Option<NotificationPayload>,
}

impl NotificationReport {
    fn unauthenticated(outcome: TransactionOutcome) -> Self {
        Self {
            outcome,
            payload: None,
        }
    }
}

/// Classify a response code: `0..=99` accepted, everything else declined.
///
/// Non-numeric or absent codes are declines, not decoding errors.
pub fn classify_response(response: Option<&str>) -> TransactionOutcome {
    let code = response.and_then(|r| r.trim().parse::<i64>().ok());
    match code {
        Some(c) if (0..=MAX_SUCCESS_RESPONSE).contains(&c) => TransactionOutcome::Accepted,
        _ => TransactionOutcome::Rejected(RejectionReason::GatewayDeclined {
            response: response.unwrap_or_default().to_string(),
        }),
    }
}

/// Validates gateway notifications.
#[derive(Clone, Debug, Default)]
pub struct NotificationValidator {
    engine: SignatureEngine,
}

impl NotificationValidator {
    /// Create a validator using the default signature engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator using a specific signature engine.
    pub fn with_engine(engine: SignatureEngine) -> Self {
        Self { engine }
    }

    /// Validate one notification.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn validate(
        &self,
        credentials: &MerchantCredentials,
        fields: &NotificationFields,
    ) -> NotificationReport {
        let Some(version) = fields.signature_version.as_deref() else {
            return NotificationReport::unauthenticated(TransactionOutcome::missing(
                fields::SIGNATURE_VERSION,
            ));
        };
        let Some(encoded) = fields.merchant_parameters.as_deref() else {
            return NotificationReport::unauthenticated(TransactionOutcome::missing(
                fields::MERCHANT_PARAMETERS,
            ));
        };
        let Some(received_signature) = fields.signature.as_deref() else {
            return NotificationReport::unauthenticated(TransactionOutcome::missing(
                fields::SIGNATURE,
            ));
        };

        if version != SIGNATURE_VERSION {
            #[cfg(feature = "tracing")]
            tracing::warn!(version, "unexpected signature version");
        }

        let params = match ParameterSet::decode(encoded) {
            Ok(params) => params,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("undecodable notification parameters: {}", err);
                let reason = match err {
                    RedsysError::MalformedPayload(reason) => reason,
                    other => other.to_string(),
                };
                return NotificationReport::unauthenticated(TransactionOutcome::MalformedPayload {
                    reason,
                });
            }
        };

        if !signature::is_well_formed(received_signature) {
            #[cfg(feature = "tracing")]
            tracing::warn!("malformed notification signature");
            return NotificationReport::unauthenticated(TransactionOutcome::MalformedSignature);
        }

        let Some(order) = notification_order(&params) else {
            return NotificationReport::unauthenticated(TransactionOutcome::missing(keys::ORDER));
        };

        if !self
            .engine
            .verify(received_signature, credentials.secret(), &order, encoded)
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(order = %order, "notification signature mismatch");
            return NotificationReport::unauthenticated(TransactionOutcome::Rejected(
                RejectionReason::InvalidSignature,
            ));
        }

        let payload = NotificationPayload { order, params };
        let outcome = classify_response(payload.response().as_deref());

        #[cfg(feature = "tracing")]
        {
            if !outcome.is_accepted() {
                tracing::debug!(order = %payload.order, response = ?payload.response(), "payment declined");
            }
        }

        NotificationReport {
            outcome,
            payload: Some(payload),
        }
    }
}

/// Validate one notification with the default engine.
pub fn validate(credentials: &MerchantCredentials, fields: &NotificationFields) -> NotificationReport {
    NotificationValidator::default().validate(credentials, fields)
}

/// `Ds_Order`, or `DS_ORDER` when the former is absent or empty.
fn notification_order(params: &ParameterSet) -> Option<String> {
    params
        .get_text(keys::ORDER)
        .filter(|order| !order.is_empty())
        .or_else(|| params.get_text(keys::ORDER_UPPER))
        .filter(|order| !order.is_empty())
}
