//! End-to-end payment flow tests
//!
//! A merchant signs a request, the "gateway" answers with a notification
//! signed under the same credentials, and the merchant validates it.

use std::sync::{Arc, Mutex};
use std::thread;

use redsys_lib::events::LifecycleEvent;
use redsys_lib::manager::{PaymentBridge, PaymentManager, TemplateUrlFactory};
use redsys_lib::notification::{self, RejectionReason};
use redsys_lib::prelude::*;
use redsys_lib::request;
use redsys_lib::signature::{self, SIGNATURE_VERSION};

const SECRET_B64: &str = "sq7HjrUOBfKmC576ILgskD5srU870gJ7";

fn credentials() -> MerchantCredentials {
    MerchantCredentials::from_base64("999008881", "1", SECRET_B64).unwrap()
}

fn urls() -> ReturnUrls {
    ReturnUrls::new(
        "https://shop.example/notify",
        "https://shop.example/ok",
        "https://shop.example/ko",
    )
}

/// Sign a gateway-side payload the way the gateway does.
fn gateway_notification(
    creds: &MerchantCredentials,
    order: &str,
    params: &ParameterSet,
) -> NotificationFields {
    let encoded = params.encode().unwrap();
    NotificationFields {
        signature_version: Some(SIGNATURE_VERSION.to_string()),
        signature: Some(signature::compute_signature(creds.secret(), order, &encoded).unwrap()),
        merchant_parameters: Some(encoded),
    }
}

fn payload(order_key: &str, order: &str, response: &str) -> ParameterSet {
    ParameterSet::new()
        .with("Ds_Date", "09/11/2015")
        .with("Ds_Hour", "18:03")
        .with("Ds_Amount", "100")
        .with("Ds_Currency", "978")
        .with(order_key, order)
        .with("Ds_MerchantCode", "999008881")
        .with("Ds_Response", response)
        .with("Ds_AuthorisationCode", "000000")
}

#[test]
fn test_request_then_notification_round_trip() {
    let creds = credentials();
    let req = PaymentRequest::new("1", "100", "EUR", urls());
    let envelope = request::build(&creds, &req).unwrap();

    let order = envelope
        .parameters()
        .unwrap()
        .get_text("DS_MERCHANT_ORDER")
        .unwrap();
    assert_eq!(order, "0001");

    let fields = gateway_notification(&creds, &order, &payload("Ds_Order", &order, "0000"));
    let report = notification::validate(&creds, &fields);
    assert_eq!(report.outcome, TransactionOutcome::Accepted);
    assert_eq!(report.payload.unwrap().amount().as_deref(), Some("100"));
}

#[test]
fn test_upper_case_order_key_is_used_as_diversifier() {
    let creds = credentials();
    let fields = gateway_notification(&creds, "4242", &payload("DS_ORDER", "4242", "0"));

    let report = notification::validate(&creds, &fields);
    assert_eq!(report.outcome, TransactionOutcome::Accepted);
    assert_eq!(report.payload.unwrap().order(), "4242");
}

#[test]
fn test_empty_order_falls_back_to_upper_case_key() {
    let creds = credentials();
    let params = ParameterSet::new()
        .with("Ds_Order", "")
        .with("DS_ORDER", "4242")
        .with("Ds_Response", "0");
    let fields = gateway_notification(&creds, "4242", &params);

    let report = notification::validate(&creds, &fields);
    assert_eq!(report.outcome, TransactionOutcome::Accepted);
    assert_eq!(report.payload.unwrap().order(), "4242");
}

#[test]
fn test_missing_order_is_reported() {
    let creds = credentials();
    let params = ParameterSet::new().with("Ds_Response", "0");
    let fields = gateway_notification(&creds, "0001", &params);

    let report = notification::validate(&creds, &fields);
    assert_eq!(
        report.outcome,
        TransactionOutcome::MissingField {
            field: "Ds_Order".into()
        }
    );
}

#[test]
fn test_numeric_values_in_payload() {
    let creds = credentials();
    let params = ParameterSet::new()
        .with("Ds_Order", "0042")
        .with("Ds_Response", 0)
        .with("Ds_Amount", 1999);
    let fields = gateway_notification(&creds, "0042", &params);

    let report = notification::validate(&creds, &fields);
    assert!(report.outcome.is_accepted());
    let payload = report.payload.unwrap();
    assert_eq!(payload.response_code(), Some(0));
    assert_eq!(payload.amount().as_deref(), Some("1999"));
}

#[test]
fn test_reencoded_signature_is_rejected() {
    let creds = credentials();
    let genuine = gateway_notification(&creds, "0001", &payload("Ds_Order", "0001", "0"));
    let transmitted = genuine.signature.clone().unwrap();

    let unpadded = NotificationFields {
        signature: Some(transmitted.trim_end_matches('=').to_string()),
        ..genuine.clone()
    };
    assert_eq!(
        notification::validate(&creds, &unpadded).outcome,
        TransactionOutcome::MalformedSignature
    );

    let spaced = NotificationFields {
        signature: Some(transmitted.replace('=', " ")),
        ..genuine
    };
    assert_eq!(
        notification::validate(&creds, &spaced).outcome,
        TransactionOutcome::MalformedSignature
    );
}

#[test]
fn test_tampered_amount_is_rejected() {
    let creds = credentials();
    let genuine = gateway_notification(&creds, "0001", &payload("Ds_Order", "0001", "0"));
    let mut tampered = payload("Ds_Order", "0001", "0");
    tampered.insert("Ds_Amount", "1");

    let fields = NotificationFields {
        merchant_parameters: Some(tampered.encode().unwrap()),
        ..genuine
    };
    let report = notification::validate(&creds, &fields);
    assert_eq!(
        report.outcome,
        TransactionOutcome::Rejected(RejectionReason::InvalidSignature)
    );
    assert!(report.payload.is_none());
}

#[test]
fn test_concurrent_builds_are_identical() {
    let creds = Arc::new(credentials());
    let req = Arc::new(PaymentRequest::new("123", "4500", "USD", urls()));
    let expected = request::build(&creds, &req).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let creds = Arc::clone(&creds);
            let req = Arc::clone(&req);
            thread::spawn(move || {
                (0..25)
                    .map(|_| request::build(&creds, &req).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for envelope in handle.join().unwrap() {
            assert_eq!(envelope, expected);
        }
    }
}

#[test]
fn test_concurrent_distinct_orders_do_not_interfere() {
    let creds = Arc::new(credentials());

    let handles: Vec<_> = (1..=32u32)
        .map(|n| {
            let creds = Arc::clone(&creds);
            thread::spawn(move || {
                let req = PaymentRequest::new(n.to_string(), "100", "EUR", urls());
                let envelope = request::build(&creds, &req).unwrap();
                (n, envelope)
            })
        })
        .collect();

    for handle in handles {
        let (n, envelope) = handle.join().unwrap();
        let order = format!("{:04}", n);
        let params = envelope.parameters().unwrap();
        assert_eq!(params.get_text("DS_MERCHANT_ORDER"), Some(order.clone()));
        assert!(signature::verify(
            &envelope.signature,
            creds.secret(),
            &order,
            &envelope.merchant_parameters
        ));
    }
}

struct ShopOrder {
    id: u32,
    total_cents: u64,
}

impl PaymentBridge for ShopOrder {
    fn order_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    fn order_number(&self) -> String {
        self.id.to_string()
    }

    fn amount(&self) -> String {
        self.total_cents.to_string()
    }

    fn currency(&self) -> String {
        "EUR".to_string()
    }

    fn extra_data(&self) -> ExtraFields {
        ExtraFields::default().with_product_description("Order from the demo shop")
    }
}

#[test]
fn test_manager_full_lifecycle() {
    let config = GatewayConfig::new("999008881", SECRET_B64);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let manager = PaymentManager::new(
        &config,
        Arc::new(TemplateUrlFactory::new(
            "https://shop.example/notify",
            "https://shop.example/orders/{order_id}/ok",
            "https://shop.example/orders/{order_id}/ko",
        )),
    )
    .unwrap()
    .with_observer(Arc::new(move |event: &LifecycleEvent| {
        sink.lock().unwrap().push(event.name());
    }));

    let attempt = manager
        .process_payment(&ShopOrder {
            id: 77,
            total_cents: 2500,
        })
        .unwrap();
    assert_eq!(attempt.form.action, config.action_url());

    let params = attempt.form.fields.parameters().unwrap();
    assert_eq!(
        params.get_text("DS_MERCHANT_URLOK").as_deref(),
        Some("https://shop.example/orders/77/ok")
    );
    assert_eq!(
        params.get_text("Ds_Merchant_ProductDescription").as_deref(),
        Some("Order from the demo shop")
    );

    let fields = gateway_notification(
        manager.credentials(),
        "0077",
        &payload("Ds_Order", "0077", "0"),
    );
    let handled = manager.process_result(&fields);
    assert!(handled.report.outcome.is_accepted());

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["order_load", "order_created", "order_done", "order_success"]
    );
}
