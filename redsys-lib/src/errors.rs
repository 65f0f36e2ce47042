//! Error types for gateway signing and notification handling.
//!
//! Every failure the engine can report is a variant of [`RedsysError`].
//! None of them is fatal to the process and none is worth retrying: each
//! call is an independent, local computation.

/// Stable error codes for FFI and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RedsysErrorCode {
    /// Currency not present in the gateway table
    UnsupportedCurrency = 1000,
    /// Required transport field absent
    MissingField = 2000,
    /// Transport field present but not decodable
    MalformedPayload = 2001,
    /// Signature field is not a well-formed HMAC encoding
    MalformedSignature = 3000,
    /// Signature does not re-derive
    InvalidSignature = 3001,
    /// Authenticated notification reporting a non-success response code
    GatewayDeclined = 4000,
    /// Merchant secret cannot be used as a key
    InvalidSecret = 5000,
    /// Order identifier not accepted by the gateway
    InvalidOrder = 5001,
    /// Amount is not expressed in minor units
    InvalidAmount = 5002,
    /// Configuration value outside the accepted set
    InvalidConfig = 5003,
    /// No order loaded for the payment attempt
    OrderNotFound = 6000,
    /// Serialization error
    Serialization = 9000,
}

/// Error type for every gateway operation.
#[derive(Debug, thiserror::Error)]
pub enum RedsysError {
    /// The currency has no numeric code in the gateway table.
    #[error("currency not supported by the gateway: {0}")]
    UnsupportedCurrency(String),

    /// A required transport field was not received.
    #[error("required field not received: {0}")]
    MissingField(String),

    /// The merchant parameters could not be decoded.
    #[error("malformed merchant parameters: {0}")]
    MalformedPayload(String),

    /// The received signature is not base64url-encoded HMAC-SHA256 output.
    #[error("malformed signature")]
    MalformedSignature,

    /// The received signature does not match the recomputed one.
    #[error("invalid signature")]
    InvalidSignature,

    /// The gateway authenticated the notification but declined the payment.
    #[error("payment declined by gateway with response code {response}")]
    GatewayDeclined {
        /// Raw `Ds_Response` value (empty when absent)
        response: String,
    },

    /// The merchant secret is unusable.
    #[error("invalid merchant secret: {0}")]
    InvalidSecret(String),

    /// The order identifier is unusable.
    #[error("invalid order {order}: {reason}")]
    InvalidOrder {
        /// Order identifier as supplied
        order: String,
        /// Why it was rejected
        reason: String,
    },

    /// The amount is not a plain count of minor units.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    /// A configuration value is not recognised.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The payment bridge has no order for this attempt.
    #[error("payment order not found")]
    OrderNotFound,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RedsysError {
    /// Get the stable error code.
    pub fn code(&self) -> RedsysErrorCode {
        match self {
            Self::UnsupportedCurrency(_) => RedsysErrorCode::UnsupportedCurrency,
            Self::MissingField(_) => RedsysErrorCode::MissingField,
            Self::MalformedPayload(_) => RedsysErrorCode::MalformedPayload,
            Self::MalformedSignature => RedsysErrorCode::MalformedSignature,
            Self::InvalidSignature => RedsysErrorCode::InvalidSignature,
            Self::GatewayDeclined { .. } => RedsysErrorCode::GatewayDeclined,
            Self::InvalidSecret(_) => RedsysErrorCode::InvalidSecret,
            Self::InvalidOrder { .. } => RedsysErrorCode::InvalidOrder,
            Self::InvalidAmount(_) => RedsysErrorCode::InvalidAmount,
            Self::InvalidConfig(_) => RedsysErrorCode::InvalidConfig,
            Self::OrderNotFound => RedsysErrorCode::OrderNotFound,
            Self::Serialization(_) => RedsysErrorCode::Serialization,
        }
    }

    /// Returns true if retrying the same call could succeed.
    ///
    /// Always false: every operation is a pure function of its inputs.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns true if the error indicates a forged or tampered notification.
    ///
    /// Such notifications must never be recorded as a declined payment.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::InvalidSignature | Self::MalformedSignature)
    }

    /// Create an invalid order error.
    pub fn invalid_order(order: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOrder {
            order: order.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RedsysError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
