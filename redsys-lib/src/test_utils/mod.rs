//! Test utilities for Redsys integrations.
//!
//! Fixtures build credentials and gateway-signed notifications the way the
//! gateway would, so validation can be exercised without a network.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use redsys_lib::test_utils::{signed_notification, test_credentials};
//!
//! let creds = test_credentials();
//! let fields = signed_notification(&creds, "0001", "0000");
//! let report = redsys_lib::notification::validate(&creds, &fields);
//! assert!(report.outcome.is_accepted());
//! ```

mod fixtures;
mod recorder;

pub use fixtures::{
    notification_parameters, sign_parameters, signed_notification, test_credentials,
    TestFixtures,
};

pub use recorder::{RecordingObserver, StaticBridge};
