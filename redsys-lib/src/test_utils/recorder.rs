//! Recording observer and in-memory bridge.

use std::sync::RwLock;

use crate::events::{LifecycleEvent, LifecycleObserver};
use crate::manager::PaymentBridge;
use crate::request::ExtraFields;

/// Observer that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RwLock<Vec<LifecycleEvent>>,
}

impl RecordingObserver {
    /// All recorded events, in order.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.read().unwrap().clone()
    }

    /// Names of the recorded events, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.read().unwrap().iter().map(LifecycleEvent::name).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        self.events.write().unwrap().push(event.clone());
    }
}

/// Bridge serving one fixed order.
#[derive(Clone, Debug, Default)]
pub struct StaticBridge {
    pub order_id: Option<String>,
    pub order_number: String,
    pub amount: String,
    pub currency: String,
    pub extra: ExtraFields,
}

impl StaticBridge {
    /// Bridge for a loaded order.
    pub fn new(
        order_id: impl Into<String>,
        order_number: impl Into<String>,
        amount: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            order_id: Some(order_id.into()),
            order_number: order_number.into(),
            amount: amount.into(),
            currency: currency.into(),
            extra: ExtraFields::default(),
        }
    }

    /// Bridge with no order loaded.
    pub fn without_order() -> Self {
        Self::default()
    }

    /// Attach optional request fields.
    pub fn with_extra(mut self, extra: ExtraFields) -> Self {
        self.extra = extra;
        self
    }
}

impl PaymentBridge for StaticBridge {
    fn order_id(&self) -> Option<String> {
        self.order_id.clone()
    }

    fn order_number(&self) -> String {
        self.order_number.clone()
    }

    fn amount(&self) -> String {
        self.amount.clone()
    }

    fn currency(&self) -> String {
        self.currency.clone()
    }

    fn extra_data(&self) -> ExtraFields {
        self.extra.clone()
    }
}
