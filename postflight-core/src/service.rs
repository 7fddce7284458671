//! Post-install event tracking facade
//!
//! [`EventService`] is the caller-facing surface of the SDK: a handful of
//! tracking methods that validate their preconditions and forward the event
//! to the shared session. Every call is fire-and-forget. It returns
//! immediately with no error channel, and delivery is entirely the session's
//! concern.

use std::sync::Arc;

use crate::event::{EventParameters, TrackedEvent};
use crate::session::EventSink;

/// Service which provides tracking of user post-install events.
///
/// Obtained via [`Sdk::event_service`](crate::Sdk::event_service); it holds a
/// reference to the shared session and owns no state of its own, so it is
/// cheap to clone and hand around.
///
/// Direct construction is not possible:
///
/// ```compile_fail
/// use postflight_core::EventService;
///
/// // private constructor: the only acquisition path is Sdk::event_service
/// let service = EventService::new();
/// ```
#[derive(Clone)]
pub struct EventService {
    sink: Arc<dyn EventSink>,
}

impl EventService {
    pub(crate) fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Track an event of a given type.
    ///
    /// `event_type` can be one of the constants in
    /// [`event_types`](crate::event::event_types), or a custom string. For
    /// many event types it is preferable to provide additional data with
    /// [`EventService::track_with_parameters`] instead.
    ///
    /// Events with an empty type tag are dropped with a warning.
    pub fn track(&self, event_type: &str) {
        self.forward(event_type, None);
    }

    /// Track an event of a given type with additional key-value data.
    ///
    /// The parameter mapping is forwarded to the session unmodified.
    /// Suggested keys for the well-known event types are documented on the
    /// [`event_types`](crate::event::event_types) constants.
    pub fn track_with_parameters(&self, event_type: &str, parameters: EventParameters) {
        self.forward(event_type, Some(parameters));
    }

    fn forward(&self, event_type: &str, parameters: Option<EventParameters>) {
        if event_type.is_empty() {
            tracing::warn!("ignoring event with empty type tag");
            return;
        }
        self.sink.submit(TrackedEvent::standard(event_type, parameters));
    }

    /// Track an in-app purchase.
    ///
    /// `transaction_id` is the platform's purchase-transaction identifier and
    /// is required; purchases with an empty identifier are dropped with a
    /// warning. You should provide, at a minimum,
    /// [`param_keys::REVENUE_AMOUNT`](crate::event::param_keys::REVENUE_AMOUNT)
    /// and
    /// [`param_keys::REVENUE_CURRENCY`](crate::event::param_keys::REVENUE_CURRENCY).
    /// We also recommend passing
    /// [`param_keys::PRODUCT_IDENTIFIER`](crate::event::param_keys::PRODUCT_IDENTIFIER).
    ///
    /// If you pass a value for
    /// [`param_keys::RECEIPT`](crate::event::param_keys::RECEIPT), it will be
    /// used for validation. Otherwise the session reads the configured
    /// platform receipt location and uses that for validation.
    pub fn track_in_app_purchase(
        &self,
        transaction_id: &str,
        parameters: Option<EventParameters>,
    ) {
        if transaction_id.is_empty() {
            tracing::warn!("ignoring in-app purchase with empty transaction identifier");
            return;
        }
        self.sink
            .submit(TrackedEvent::in_app_purchase(transaction_id, parameters));
    }

    /// Track a checkout / standard purchase.
    ///
    /// `transaction_id` is an optional unique identifier for this
    /// transaction, as generated by you; for wallet transactions, a payment
    /// token identifier works well. Parameter recommendations match
    /// [`EventService::track_in_app_purchase`]; no receipt validation is
    /// performed for checkouts.
    pub fn track_checkout(
        &self,
        transaction_id: Option<&str>,
        parameters: Option<EventParameters>,
    ) {
        self.sink
            .submit(TrackedEvent::checkout(transaction_id, parameters));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{event_types, param_keys, EventKind, ParamValue};
    use std::sync::Mutex;

    /// Sink that records everything the facade forwards
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<TrackedEvent>>,
    }

    impl EventSink for RecordingSink {
        fn submit(&self, event: TrackedEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn service() -> (EventService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let service = EventService::new(Arc::clone(&sink) as Arc<dyn EventSink>);
        (service, sink)
    }

    #[test]
    fn test_track_forwards_tag_only() {
        let (service, sink) = service();

        service.track("purchase");

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "purchase");
        assert_eq!(events[0].kind, EventKind::Standard);
        assert!(events[0].parameters.is_none());
        assert!(events[0].transaction_id.is_none());
    }

    #[test]
    fn test_track_with_parameters_forwards_unmodified() {
        let (service, sink) = service();

        service.track_with_parameters(
            event_types::LEVEL_COMPLETE,
            EventParameters::new().with("level", "5"),
        );

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "level_complete");
        let params = events[0].parameters.as_ref().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(
            params.get("level"),
            Some(&ParamValue::String("5".to_string()))
        );
    }

    #[test]
    fn test_track_empty_tag_dropped() {
        let (service, sink) = service();

        service.track("");
        service.track_with_parameters("", EventParameters::new().with("k", "v"));

        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_in_app_purchase_forwards_unmodified() {
        let (service, sink) = service();

        service.track_in_app_purchase(
            "txn-123",
            Some(
                EventParameters::new()
                    .with(param_keys::REVENUE_AMOUNT, "4.99")
                    .with(param_keys::REVENUE_CURRENCY, "USD"),
            ),
        );

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::InAppPurchase);
        assert_eq!(events[0].transaction_id.as_deref(), Some("txn-123"));

        let params = events[0].parameters.as_ref().unwrap();
        assert_eq!(
            params.get(param_keys::REVENUE_AMOUNT),
            Some(&ParamValue::String("4.99".to_string()))
        );
        assert_eq!(
            params.get(param_keys::REVENUE_CURRENCY),
            Some(&ParamValue::String("USD".to_string()))
        );
        // No receipt key is fine at this layer; the session handles fallback
        assert!(!events[0].has_receipt());
    }

    #[test]
    fn test_in_app_purchase_requires_transaction_id() {
        let (service, sink) = service();

        service.track_in_app_purchase("", Some(EventParameters::new().with("k", "v")));

        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_checkout_transaction_id_optional() {
        let (service, sink) = service();

        service.track_checkout(
            None,
            Some(EventParameters::new().with(param_keys::REVENUE_AMOUNT, "9.99")),
        );
        service.track_checkout(Some("order-42"), None);

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].transaction_id.is_none());
        assert_eq!(
            events[0]
                .parameters
                .as_ref()
                .unwrap()
                .get(param_keys::REVENUE_AMOUNT),
            Some(&ParamValue::String("9.99".to_string()))
        );
        assert_eq!(events[1].transaction_id.as_deref(), Some("order-42"));
    }

    #[test]
    fn test_tracking_never_blocks_without_consumer() {
        // A sink backed by a channel nobody drains: submission must still
        // return immediately for every call.
        struct ChannelSink {
            tx: tokio::sync::mpsc::UnboundedSender<TrackedEvent>,
        }

        impl EventSink for ChannelSink {
            fn submit(&self, event: TrackedEvent) {
                let _ = self.tx.send(event);
            }
        }

        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let service = EventService::new(Arc::new(ChannelSink { tx }));

        for i in 0..1_000 {
            service.track_with_parameters(
                "heartbeat",
                EventParameters::new().with("seq", i as i64),
            );
        }
    }
}
