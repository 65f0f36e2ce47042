//! Merchant parameter set and its transport encoding.
//!
//! On the wire the parameter set travels as base64 of a JSON object. The
//! outbound side uses the standard alphabet; inbound notifications may use
//! the URL-safe one, so decoding accepts both and treats padding as optional.

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{RedsysError, Result};

/// Outbound parameter keys, spelled as the gateway expects them.
pub mod keys {
    pub const AMOUNT: &str = "DS_MERCHANT_AMOUNT";
    pub const ORDER: &str = "DS_MERCHANT_ORDER";
    pub const MERCHANT_CODE: &str = "DS_MERCHANT_MERCHANTCODE";
    pub const CURRENCY: &str = "DS_MERCHANT_CURRENCY";
    pub const TERMINAL: &str = "DS_MERCHANT_TERMINAL";
    pub const TRANSACTION_TYPE: &str = "DS_MERCHANT_TRANSACTIONTYPE";
    pub const MERCHANT_URL: &str = "DS_MERCHANT_MERCHANTURL";
    pub const URL_OK: &str = "DS_MERCHANT_URLOK";
    pub const URL_KO: &str = "DS_MERCHANT_URLKO";
    pub const PRODUCT_DESCRIPTION: &str = "Ds_Merchant_ProductDescription";
    pub const TITULAR: &str = "Ds_Merchant_Titular";
    pub const MERCHANT_NAME: &str = "Ds_Merchant_MerchantName";
}

const LENIENT_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Ordered mapping of parameter names to string or numeric values.
///
/// Keys are case-sensitive and keep insertion order, so encoding the same
/// set twice yields the same text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(Map<String, Value>);

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a value, replacing (in place) any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value under `key` as text.
    ///
    /// Numbers are rendered in decimal; `null`, booleans, arrays and objects
    /// have no text form and yield `None`.
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over parameter names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Encode for transport: base64 (standard alphabet) of compact JSON.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(&self.0)?;
        Ok(STANDARD.encode(json))
    }

    /// Decode a transport-encoded parameter set.
    ///
    /// Accepts the URL-safe alphabet and missing padding. Fails with
    /// [`RedsysError::MalformedPayload`] when the text is not base64, the
    /// bytes are not JSON, or the JSON is not an object.
    pub fn decode(encoded: &str) -> Result<Self> {
        let standard: String = encoded
            .trim()
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();

        let bytes = LENIENT_DECODER
            .decode(standard.as_bytes())
            .map_err(|e| RedsysError::MalformedPayload(format!("base64: {}", e)))?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(RedsysError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(RedsysError::MalformedPayload(format!("json: {}", e))),
        }
    }
}

impl From<Map<String, Value>> for ParameterSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Encode a parameter set for transport.
pub fn encode(params: &ParameterSet) -> Result<String> {
    params.encode()
}

/// Decode a transport-encoded parameter set.
pub fn decode(encoded: &str) -> Result<ParameterSet> {
    ParameterSet::decode(encoded)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
