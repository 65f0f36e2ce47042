//! Redsys signature library.
//!
//! Builds signed payment requests for a Redsys-style `HMAC_SHA256_V1`
//! gateway and authenticates the asynchronous notifications it sends back.
//! The crate holds no mutable state: every operation takes immutable
//! [`MerchantCredentials`] and produces a fresh result, so one set of
//! credentials can be shared freely across threads.
//!
//! # Features
//!
//! - **Request signing**: Per-order key diversification and HMAC-SHA256 signatures
//! - **Notification validation**: Constant-time verification and outcome classification
//! - **Lifecycle orchestration**: [`manager::PaymentManager`] with pluggable bridges and observers
//!
//! # Example
//!
//! ```
//! use redsys_lib::request::{self, PaymentRequest, ReturnUrls};
//! use redsys_lib::{signature, MerchantCredentials};
//!
//! let creds = MerchantCredentials::from_base64(
//!     "999008881",
//!     "1",
//!     "sq7HjrUOBfKmC576ILgskD5srU870gJ7",
//! )?;
//!
//! let req = PaymentRequest::new(
//!     "1",
//!     "100",
//!     "EUR",
//!     ReturnUrls::new("https://shop/notify", "https://shop/ok", "https://shop/ko"),
//! );
//! let envelope = request::build(&creds, &req)?;
//! assert_eq!(envelope.signature_version, "HMAC_SHA256_V1");
//!
//! // The order is padded to four digits and doubles as the key diversifier.
//! let params = envelope.parameters()?;
//! assert_eq!(params.get_text("DS_MERCHANT_ORDER").as_deref(), Some("0001"));
//! assert!(signature::verify(
//!     &envelope.signature,
//!     creds.secret(),
//!     "0001",
//!     &envelope.merchant_parameters,
//! ));
//! # Ok::<(), redsys_lib::RedsysError>(())
//! ```

pub mod config;
pub mod currency;
pub mod errors;
pub mod events;
pub mod manager;
pub mod notification;
pub mod params;
pub mod prelude;
pub mod request;
pub mod signature;

/// Test fixtures for signing and notification scenarios.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{Environment, GatewayConfig, MerchantCredentials};
pub use errors::{RedsysError, RedsysErrorCode};
pub use notification::{NotificationFields, NotificationReport, TransactionOutcome};
pub use params::ParameterSet;
pub use request::{PaymentRequest, SignedEnvelope};

/// Common result alias for Redsys operations.
pub type Result<T> = std::result::Result<T, RedsysError>;
