//! Payment lifecycle events.
//!
//! The manager reports progress through an explicit list of observers and
//! also returns the events it emitted, so callers can either subscribe or
//! fold over the returned sequence.

use serde::Serialize;

use crate::notification::{NotificationPayload, TransactionOutcome};

/// A step in the life of one payment attempt.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The order is about to be loaded from the bridge.
    OrderLoad,
    /// The order exists and a signed form is being prepared.
    OrderCreated {
        order_id: String,
        order_number: String,
    },
    /// An authenticated notification arrived, whatever its result.
    OrderDone { payload: NotificationPayload },
    /// The gateway declined the payment.
    OrderFail {
        payload: NotificationPayload,
        outcome: TransactionOutcome,
    },
    /// The gateway accepted the payment.
    OrderSuccess { payload: NotificationPayload },
}

impl LifecycleEvent {
    /// Short event name, stable for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderLoad => "order_load",
            Self::OrderCreated { .. } => "order_created",
            Self::OrderDone { .. } => "order_done",
            Self::OrderFail { .. } => "order_fail",
            Self::OrderSuccess { .. } => "order_success",
        }
    }
}

/// Receives lifecycle events as they happen.
pub trait LifecycleObserver: Send + Sync {
    /// Called once per event, in emission order.
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}
