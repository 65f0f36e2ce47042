//! Merchant credentials and gateway configuration.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::signature::TDES_KEY_LEN;
use crate::{RedsysError, Result};

/// Gateway environment selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Integration/test gateway.
    #[default]
    Test,
    /// Production gateway.
    Live,
}

impl Environment {
    /// Get the environment name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Live => "live",
        }
    }

    /// Form action URL for this environment.
    pub fn action_url(&self) -> &'static str {
        match self {
            Self::Test => "https://sis-t.redsys.es:25443/sis/realizarPago",
            Self::Live => "https://sis.redsys.es/sis/realizarPago",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = RedsysError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "test" | "sandbox" => Ok(Self::Test),
            "live" | "production" => Ok(Self::Live),
            other => Err(RedsysError::InvalidConfig(format!(
                "unknown environment {:?}, expected test or live",
                other
            ))),
        }
    }
}

/// Immutable merchant credentials shared by every signing call.
///
/// The decoded secret is wiped from memory on drop and never printed.
#[derive(Clone)]
pub struct MerchantCredentials {
    merchant_code: String,
    terminal: String,
    secret: Zeroizing<Vec<u8>>,
}

impl MerchantCredentials {
    /// Build credentials from the base64 secret issued by the gateway.
    ///
    /// # Example
    ///
    /// ```
    /// use redsys_lib::MerchantCredentials;
    ///
    /// let creds = MerchantCredentials::from_base64(
    ///     "999008881",
    ///     "1",
    ///     "sq7HjrUOBfKmC576ILgskD5srU870gJ7",
    /// )?;
    /// assert_eq!(creds.secret().len(), 24);
    /// # Ok::<(), redsys_lib::RedsysError>(())
    /// ```
    pub fn from_base64(
        merchant_code: impl Into<String>,
        terminal: impl Into<String>,
        secret_b64: &str,
    ) -> Result<Self> {
        let secret = STANDARD
            .decode(secret_b64.trim())
            .map_err(|e| RedsysError::InvalidSecret(format!("not base64: {}", e)))?;
        Self::from_raw(merchant_code, terminal, secret)
    }

    /// Build credentials from an already decoded secret.
    pub fn from_raw(
        merchant_code: impl Into<String>,
        terminal: impl Into<String>,
        secret: Vec<u8>,
    ) -> Result<Self> {
        let secret = Zeroizing::new(secret);
        if secret.is_empty() {
            return Err(RedsysError::InvalidSecret("secret is empty".into()));
        }
        if secret.len() > TDES_KEY_LEN {
            return Err(RedsysError::InvalidSecret(format!(
                "secret decodes to {} bytes, at most {} allowed",
                secret.len(),
                TDES_KEY_LEN
            )));
        }
        Ok(Self {
            merchant_code: merchant_code.into(),
            terminal: terminal.into(),
            secret,
        })
    }

    /// Merchant code (FUC) assigned by the gateway.
    pub fn merchant_code(&self) -> &str {
        &self.merchant_code
    }

    /// Terminal number.
    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    /// Decoded shared secret.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for MerchantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantCredentials")
            .field("merchant_code", &self.merchant_code)
            .field("terminal", &self.terminal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Integration settings, typically loaded from a JSON file.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Merchant code (FUC).
    pub merchant_code: String,

    /// Terminal number.
    #[serde(default = "default_terminal")]
    pub terminal: String,

    /// Shared secret, base64 as issued by the gateway.
    pub secret_key: String,

    /// Gateway environment.
    #[serde(default)]
    pub environment: Environment,

    /// Override for the form action URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
}

fn default_terminal() -> String {
    "1".to_string()
}

impl GatewayConfig {
    /// Create a configuration for the test environment.
    pub fn new(merchant_code: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            merchant_code: merchant_code.into(),
            terminal: default_terminal(),
            secret_key: secret_key.into(),
            environment: Environment::default(),
            gateway_url: None,
        }
    }

    /// Set the terminal.
    pub fn with_terminal(mut self, terminal: impl Into<String>) -> Self {
        self.terminal = terminal.into();
        self
    }

    /// Set the environment.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Override the form action URL.
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Form action URL, honouring the override.
    pub fn action_url(&self) -> &str {
        self.gateway_url
            .as_deref()
            .unwrap_or_else(|| self.environment.action_url())
    }

    /// Decode the secret into credentials.
    pub fn credentials(&self) -> Result<MerchantCredentials> {
        MerchantCredentials::from_base64(&self.merchant_code, &self.terminal, &self.secret_key)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("merchant_code", &self.merchant_code)
            .field("terminal", &self.terminal)
            .field("secret_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("gateway_url", &self.gateway_url)
            .finish()
    }
}
