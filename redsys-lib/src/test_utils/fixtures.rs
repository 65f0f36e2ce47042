//! Test fixtures and data generators.

use crate::notification::{keys, NotificationFields};
use crate::params::ParameterSet;
use crate::signature::{self, SIGNATURE_VERSION};
use crate::MerchantCredentials;

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Merchant code of the public integration terminal.
    pub const MERCHANT_CODE: &'static str = "999008881";

    /// Terminal number of the public integration terminal.
    pub const TERMINAL: &'static str = "1";

    /// Base64 secret of the public integration terminal (24 bytes decoded).
    pub const SECRET_B64: &'static str = "sq7HjrUOBfKmC576ILgskD5srU870gJ7";

    /// Response codes the gateway reports for successful payments.
    pub const ACCEPTED_RESPONSES: &'static [&'static str] = &["0", "0000", "0099", "99"];

    /// Response codes the gateway reports for declined payments.
    pub const DECLINED_RESPONSES: &'static [&'static str] = &["100", "101", "180", "184", "190", "9915"];
}

/// Credentials for the public integration terminal.
pub fn test_credentials() -> MerchantCredentials {
    MerchantCredentials::from_base64(
        TestFixtures::MERCHANT_CODE,
        TestFixtures::TERMINAL,
        TestFixtures::SECRET_B64,
    )
    .unwrap()
}

/// A realistic notification parameter set for `order` with `response`.
pub fn notification_parameters(
    credentials: &MerchantCredentials,
    order: &str,
    response: &str,
) -> ParameterSet {
    ParameterSet::new()
        .with(keys::DATE, "09/11/2015")
        .with(keys::HOUR, "18:03")
        .with(keys::SECURE_PAYMENT, "1")
        .with(keys::CARD_COUNTRY, "724")
        .with(keys::AMOUNT, "100")
        .with(keys::CURRENCY, "978")
        .with(keys::ORDER, order)
        .with(keys::MERCHANT_CODE, credentials.merchant_code())
        .with("Ds_Terminal", credentials.terminal())
        .with(keys::RESPONSE, response)
        .with(keys::MERCHANT_DATA, "")
        .with("Ds_TransactionType", "0")
        .with(keys::CONSUMER_LANGUAGE, "1")
        .with(keys::AUTHORISATION_CODE, "123456")
}

/// Encode and sign `params` as the gateway would, diversifying by `order`.
pub fn sign_parameters(
    credentials: &MerchantCredentials,
    order: &str,
    params: &ParameterSet,
) -> NotificationFields {
    let encoded = params.encode().unwrap();
    let signature = signature::compute_signature(credentials.secret(), order, &encoded).unwrap();
    NotificationFields {
        signature_version: Some(SIGNATURE_VERSION.to_string()),
        merchant_parameters: Some(encoded),
        signature: Some(signature),
    }
}

/// A gateway-signed notification for `order` reporting `response`.
pub fn signed_notification(
    credentials: &MerchantCredentials,
    order: &str,
    response: &str,
) -> NotificationFields {
    let params = notification_parameters(credentials, order, response);
    sign_parameters(credentials, order, &params)
}
