//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use redsys_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Credentials and configuration: `MerchantCredentials`, `GatewayConfig`, `Environment`
//! - Error types: `RedsysError`, `RedsysErrorCode`, `Result`
//! - Requests: `PaymentRequest`, `ReturnUrls`, `ExtraFields`, `SignedEnvelope`
//! - Notifications: `NotificationFields`, `NotificationReport`, `TransactionOutcome`
//! - Orchestration: `PaymentManager`, `PaymentBridge`, `UrlFactory`, `LifecycleObserver`

// Configuration
pub use crate::config::{Environment, GatewayConfig, MerchantCredentials};

// Error handling
pub use crate::errors::{RedsysError, RedsysErrorCode};
pub use crate::Result;

// Wire data
pub use crate::params::ParameterSet;

// Requests
pub use crate::request::{
    ExtraFields, PaymentForm, PaymentRequest, RequestBuilder, ReturnUrls, SignedEnvelope,
};

// Notifications
pub use crate::notification::{
    NotificationFields, NotificationPayload, NotificationReport, NotificationValidator,
    RejectionReason, TransactionOutcome,
};

// Signatures
pub use crate::signature::{KeyDiversifier, SignatureEngine, TripleDesDiversifier};

// Orchestration
pub use crate::events::{LifecycleEvent, LifecycleObserver};
pub use crate::manager::{PaymentBridge, PaymentManager, TemplateUrlFactory, UrlFactory};
