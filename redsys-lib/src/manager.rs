//! Payment lifecycle orchestration.
//!
//! [`PaymentManager`] ties the request builder and the notification
//! validator to the application's order source ([`PaymentBridge`]) and URL
//! scheme ([`UrlFactory`]), emitting [`LifecycleEvent`]s along the way.
//! It holds only immutable configuration, so one manager can serve
//! concurrent requests.

use std::sync::Arc;

use crate::events::{LifecycleEvent, LifecycleObserver};
use crate::notification::{
    NotificationFields, NotificationReport, NotificationValidator, TransactionOutcome,
};
use crate::request::{
    format_order_number, ExtraFields, PaymentForm, PaymentRequest, RequestBuilder, ReturnUrls,
};
use crate::{GatewayConfig, MerchantCredentials, RedsysError, Result};

/// Source of the order being paid.
pub trait PaymentBridge {
    /// Identifier used in return URLs; `None` when no order is loaded.
    fn order_id(&self) -> Option<String>;

    /// Order number sent to the gateway (padded by the builder).
    fn order_number(&self) -> String;

    /// Amount in minor units.
    fn amount(&self) -> String;

    /// Alphabetic currency code.
    fn currency(&self) -> String;

    /// Optional request fields.
    fn extra_data(&self) -> ExtraFields {
        ExtraFields::default()
    }
}

/// Produces the notification and return URLs for an order.
pub trait UrlFactory: Send + Sync {
    /// Server-to-server notification URL.
    fn merchant_url(&self) -> String;

    /// Return URL after a successful payment.
    fn ok_url(&self, order_id: &str) -> String;

    /// Return URL after a failed payment.
    fn ko_url(&self, order_id: &str) -> String;
}

/// [`UrlFactory`] that substitutes `{order_id}` into fixed templates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateUrlFactory {
    merchant_url: String,
    ok_template: String,
    ko_template: String,
}

impl TemplateUrlFactory {
    /// Placeholder replaced with the order id.
    pub const PLACEHOLDER: &'static str = "{order_id}";

    /// Create a factory from a notification URL and two return templates.
    pub fn new(
        merchant_url: impl Into<String>,
        ok_template: impl Into<String>,
        ko_template: impl Into<String>,
    ) -> Self {
        Self {
            merchant_url: merchant_url.into(),
            ok_template: ok_template.into(),
            ko_template: ko_template.into(),
        }
    }
}

impl UrlFactory for TemplateUrlFactory {
    fn merchant_url(&self) -> String {
        self.merchant_url.clone()
    }

    fn ok_url(&self, order_id: &str) -> String {
        self.ok_template.replace(Self::PLACEHOLDER, order_id)
    }

    fn ko_url(&self, order_id: &str) -> String {
        self.ko_template.replace(Self::PLACEHOLDER, order_id)
    }
}

/// Result of preparing a payment.
#[derive(Clone, Debug)]
pub struct PaymentAttempt {
    /// Signed form ready for rendering.
    pub form: PaymentForm,
    /// Events emitted, in order.
    pub events: Vec<LifecycleEvent>,
}

/// Result of handling a gateway notification.
#[derive(Clone, Debug)]
pub struct ResultHandling {
    /// Validation outcome and payload.
    pub report: NotificationReport,
    /// Events emitted, in order. Empty for unauthenticated notifications.
    pub events: Vec<LifecycleEvent>,
}

/// Orchestrates signing and notification handling for one merchant.
pub struct PaymentManager {
    credentials: MerchantCredentials,
    action_url: String,
    urls: Arc<dyn UrlFactory>,
    builder: RequestBuilder,
    validator: NotificationValidator,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl PaymentManager {
    /// Create a manager from loaded configuration.
    pub fn new(config: &GatewayConfig, urls: Arc<dyn UrlFactory>) -> Result<Self> {
        Ok(Self::from_parts(
            config.credentials()?,
            config.action_url(),
            urls,
        ))
    }

    /// Create a manager from already decoded credentials.
    pub fn from_parts(
        credentials: MerchantCredentials,
        action_url: impl Into<String>,
        urls: Arc<dyn UrlFactory>,
    ) -> Self {
        Self {
            credentials,
            action_url: action_url.into(),
            urls,
            builder: RequestBuilder::default(),
            validator: NotificationValidator::default(),
            observers: Vec::new(),
        }
    }

    /// Register an observer.
    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Merchant credentials in use.
    pub fn credentials(&self) -> &MerchantCredentials {
        &self.credentials
    }

    /// Prepare the signed payment form for the bridge's current order.
    ///
    /// Emits `OrderLoad`, then fails with [`RedsysError::OrderNotFound`] if
    /// the bridge has no order, otherwise emits `OrderCreated`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn process_payment(&self, bridge: &dyn PaymentBridge) -> Result<PaymentAttempt> {
        let mut events = Vec::new();
        self.emit(&mut events, LifecycleEvent::OrderLoad);

        let order_id = bridge.order_id().ok_or(RedsysError::OrderNotFound)?;
        let order_number = bridge.order_number();

        self.emit(
            &mut events,
            LifecycleEvent::OrderCreated {
                order_id: order_id.clone(),
                order_number: format_order_number(&order_number),
            },
        );

        let urls = ReturnUrls::new(
            self.urls.merchant_url(),
            self.urls.ok_url(&order_id),
            self.urls.ko_url(&order_id),
        );
        let request = PaymentRequest::new(order_number, bridge.amount(), bridge.currency(), urls)
            .with_extra(bridge.extra_data());
        let envelope = self.builder.build(&self.credentials, &request)?;

        Ok(PaymentAttempt {
            form: PaymentForm::new(&self.action_url, envelope),
            events,
        })
    }

    /// Validate a gateway notification and emit the matching events.
    ///
    /// Authenticated notifications emit `OrderDone` followed by
    /// `OrderSuccess` or `OrderFail`. Missing, malformed or forged
    /// notifications emit nothing.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn process_result(&self, fields: &NotificationFields) -> ResultHandling {
        let report = self.validator.validate(&self.credentials, fields);
        let mut events = Vec::new();

        if let Some(payload) = &report.payload {
            self.emit(
                &mut events,
                LifecycleEvent::OrderDone {
                    payload: payload.clone(),
                },
            );
            let closing = match &report.outcome {
                TransactionOutcome::Accepted => LifecycleEvent::OrderSuccess {
                    payload: payload.clone(),
                },
                outcome => LifecycleEvent::OrderFail {
                    payload: payload.clone(),
                    outcome: outcome.clone(),
                },
            };
            self.emit(&mut events, closing);
        }

        ResultHandling { report, events }
    }

    fn emit(&self, events: &mut Vec<LifecycleEvent>, event: LifecycleEvent) {
        #[cfg(feature = "tracing")]
        tracing::debug!(event = event.name(), "lifecycle event");
        for observer in &self.observers {
            observer.on_event(&event);
        }
        events.push(event);
    }
}

impl std::fmt::Debug for PaymentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentManager")
            .field("credentials", &self.credentials)
            .field("action_url", &self.action_url)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RejectionReason;
    use crate::test_utils::{
        signed_notification, test_credentials, RecordingObserver, StaticBridge,
    };

    fn manager(observer: Arc<RecordingObserver>) -> PaymentManager {
        PaymentManager::from_parts(
            test_credentials(),
            "https://gateway.test/pay",
            Arc::new(TemplateUrlFactory::new(
                "https://shop.test/notify",
                "https://shop.test/ok/{order_id}",
                "https://shop.test/ko/{order_id}",
            )),
        )
        .with_observer(observer)
    }

    #[test]
    fn test_process_payment_emits_and_signs() {
        let observer = Arc::new(RecordingObserver::default());
        let manager = manager(observer.clone());
        let bridge = StaticBridge::new("order-7", "7", "1999", "EUR");

        let attempt = manager.process_payment(&bridge).unwrap();
        assert_eq!(attempt.form.action, "https://gateway.test/pay");
        assert_eq!(attempt.form.method, "POST");

        let names: Vec<&str> = attempt.events.iter().map(LifecycleEvent::name).collect();
        assert_eq!(names, vec!["order_load", "order_created"]);
        assert_eq!(observer.names(), names);

        let params = attempt.form.fields.parameters().unwrap();
        assert_eq!(params.get_text("DS_MERCHANT_ORDER").as_deref(), Some("0007"));
        assert_eq!(
            params.get_text("DS_MERCHANT_URLOK").as_deref(),
            Some("https://shop.test/ok/order-7")
        );
        assert_eq!(
            params.get_text("DS_MERCHANT_URLKO").as_deref(),
            Some("https://shop.test/ko/order-7")
        );
    }

    #[test]
    fn test_missing_order_fails_once() {
        let observer = Arc::new(RecordingObserver::default());
        let manager = manager(observer.clone());
        let bridge = StaticBridge::without_order();

        assert!(matches!(
            manager.process_payment(&bridge),
            Err(RedsysError::OrderNotFound)
        ));
        assert_eq!(observer.names(), vec!["order_load"]);
    }

    #[test]
    fn test_process_result_success() {
        let observer = Arc::new(RecordingObserver::default());
        let manager = manager(observer.clone());
        let fields = signed_notification(manager.credentials(), "0007", "0");

        let handled = manager.process_result(&fields);
        assert!(handled.report.outcome.is_accepted());
        assert_eq!(observer.names(), vec!["order_done", "order_success"]);
    }

    #[test]
    fn test_process_result_decline() {
        let observer = Arc::new(RecordingObserver::default());
        let manager = manager(observer.clone());
        let fields = signed_notification(manager.credentials(), "0007", "190");

        let handled = manager.process_result(&fields);
        assert_eq!(observer.names(), vec!["order_done", "order_fail"]);
        match handled.events.last() {
            Some(LifecycleEvent::OrderFail { outcome, payload }) => {
                assert_eq!(
                    outcome,
                    &TransactionOutcome::Rejected(RejectionReason::GatewayDeclined {
                        response: "190".into()
                    })
                );
                assert_eq!(payload.order(), "0007");
            }
            other => panic!("expected OrderFail, got {:?}", other),
        }
    }

    #[test]
    fn test_forged_notification_emits_nothing() {
        let observer = Arc::new(RecordingObserver::default());
        let manager = manager(observer.clone());
        let mut fields = signed_notification(manager.credentials(), "0007", "0");
        fields.merchant_parameters = signed_notification(manager.credentials(), "0008", "0")
            .merchant_parameters;

        let handled = manager.process_result(&fields);
        assert_eq!(
            handled.report.outcome,
            TransactionOutcome::Rejected(RejectionReason::InvalidSignature)
        );
        assert!(handled.events.is_empty());
        assert!(observer.names().is_empty());
    }

    #[test]
    fn test_new_from_config() {
        let config = GatewayConfig::new("999008881", "sq7HjrUOBfKmC576ILgskD5srU870gJ7");
        let manager = PaymentManager::new(
            &config,
            Arc::new(TemplateUrlFactory::new("n", "ok", "ko")),
        )
        .unwrap();
        assert_eq!(manager.credentials().merchant_code(), "999008881");

        let broken = GatewayConfig::new("1", "%%%");
        assert!(PaymentManager::new(&broken, Arc::new(TemplateUrlFactory::new("n", "ok", "ko")))
            .is_err());
    }
}
