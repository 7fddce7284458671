//! Event model for post-install tracking
//!
//! A tracked event is a type tag (one of the [`event_types`] constants or any
//! custom string), an optional set of typed parameters, and, for commerce
//! events, an optional transaction identifier. Events are assembled at the
//! call site and handed to the session for delivery; they carry no further
//! lifecycle of their own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Well-known event type tags recognized by the ingest service.
///
/// Any custom string is also a valid tag; these constants cover the
/// categories the backend attributes out of the box.
pub mod event_types {
    /// User logged in to an existing account.
    pub const LOGIN: &str = "login";
    /// User created an account.
    pub const REGISTRATION: &str = "registration";
    /// User finished the onboarding tutorial.
    pub const TUTORIAL_COMPLETE: &str = "tutorial_complete";
    /// User completed a level. Suggested key: [`super::param_keys::CONTENT_IDENTIFIER`].
    pub const LEVEL_COMPLETE: &str = "level_complete";
    /// User unlocked an achievement.
    pub const ACHIEVEMENT: &str = "achievement";
    /// User viewed a product page. Suggested key: [`super::param_keys::PRODUCT_IDENTIFIER`].
    pub const PRODUCT_VIEW: &str = "product_view";
    /// User added an item to the cart.
    pub const CART_ADD: &str = "cart_add";
    /// User added an item to a wishlist.
    pub const WISHLIST_ADD: &str = "wishlist_add";
    /// User began checking out.
    pub const CHECKOUT_BEGIN: &str = "checkout_begin";
    /// User completed a checkout.
    pub const CHECKOUT_COMPLETE: &str = "checkout_complete";
    /// User completed an in-app purchase.
    pub const PURCHASE: &str = "purchase";
    /// User created a reservation.
    pub const RESERVATION: &str = "reservation";
    /// User sent an invitation.
    pub const INVITE: &str = "invite";
    /// User shared a link.
    pub const SHARE: &str = "share";
    /// User performed a search. Suggested key: [`super::param_keys::SEARCH_QUERY`].
    pub const SEARCH: &str = "search";
    /// User rated the app.
    pub const RATE_APP: &str = "rate_app";
}

/// Well-known parameter keys.
///
/// These spellings are part of the ingest compatibility surface and must not
/// change between releases.
pub mod param_keys {
    /// Revenue amount for commerce events, as a decimal number.
    pub const REVENUE_AMOUNT: &str = "revenue_amount";
    /// ISO 4217 currency code for [`REVENUE_AMOUNT`].
    pub const REVENUE_CURRENCY: &str = "revenue_currency";
    /// Store product identifier of the purchased item.
    pub const PRODUCT_IDENTIFIER: &str = "product_identifier";
    /// Platform purchase receipt, hex-encoded. When absent on an in-app
    /// purchase, the session sources the platform default receipt itself.
    pub const RECEIPT: &str = "receipt";
    /// Identifier of the content the event refers to (level, article, ...).
    pub const CONTENT_IDENTIFIER: &str = "content_identifier";
    /// Query string for search events.
    pub const SEARCH_QUERY: &str = "search_query";
    /// Host-app identifier of the acting user.
    pub const USER_IDENTIFIER: &str = "user_identifier";
    /// Free-form description of the event.
    pub const DESCRIPTION: &str = "description";
}

/// A single parameter value: string, number, or boolean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Text value
    String(String),
    /// Numeric value (integers are widened to f64)
    Number(f64),
    /// Boolean flag
    Bool(bool),
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// Typed key-value data attached to an event.
///
/// Keys are ordered so the wire payload is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventParameters {
    entries: BTreeMap<String, ParamValue>,
}

impl EventParameters {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value for the key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Chainable variant of [`EventParameters::set`] for call-site construction
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a parameter by key
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Whether the given key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the parameter set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What delivery treatment an event gets on the server side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Plain post-install event
    Standard,
    /// In-app purchase; eligible for receipt validation
    InAppPurchase,
    /// Checkout / standard purchase; no receipt validation
    Checkout,
}

/// Event envelope handed from the facade to the session.
///
/// This struct matches the schema expected by the ingest `/v1/events` API.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    /// Event type tag
    #[serde(rename = "type")]
    pub event_type: String,

    /// Delivery treatment
    pub kind: EventKind,

    /// When the event was produced at the call site
    pub emitted_at: DateTime<Utc>,

    /// Transaction identifier for commerce events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// Caller-supplied parameters, forwarded unmodified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<EventParameters>,

    /// Content-based hash for deduplication (32-char hex)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_hash: Option<String>,
}

impl TrackedEvent {
    /// Create a plain event
    pub fn standard(event_type: &str, parameters: Option<EventParameters>) -> Self {
        Self::build(event_type, EventKind::Standard, None, parameters)
    }

    /// Create an in-app purchase event
    pub fn in_app_purchase(transaction_id: &str, parameters: Option<EventParameters>) -> Self {
        Self::build(
            event_types::PURCHASE,
            EventKind::InAppPurchase,
            Some(transaction_id.to_string()),
            parameters,
        )
    }

    /// Create a checkout event
    pub fn checkout(transaction_id: Option<&str>, parameters: Option<EventParameters>) -> Self {
        Self::build(
            event_types::CHECKOUT_COMPLETE,
            EventKind::Checkout,
            transaction_id.map(str::to_string),
            parameters,
        )
    }

    fn build(
        event_type: &str,
        kind: EventKind,
        transaction_id: Option<String>,
        parameters: Option<EventParameters>,
    ) -> Self {
        let emitted_at = Utc::now();
        let event_hash = compute_event_hash(event_type, &emitted_at, parameters.as_ref());

        TrackedEvent {
            event_type: event_type.to_string(),
            kind,
            emitted_at,
            transaction_id,
            parameters,
            event_hash: Some(event_hash),
        }
    }

    /// Whether the event already carries a receipt parameter
    pub fn has_receipt(&self) -> bool {
        self.parameters
            .as_ref()
            .is_some_and(|p| p.contains_key(param_keys::RECEIPT))
    }

    /// Recompute the dedup hash after the session amends the event
    pub(crate) fn refresh_hash(&mut self) {
        self.event_hash = Some(compute_event_hash(
            &self.event_type,
            &self.emitted_at,
            self.parameters.as_ref(),
        ));
    }
}

/// Compute a content-based hash for event deduplication
///
/// Returns a 32-character hex digest of SHA-256(type + emitted_at + parameters)
fn compute_event_hash(
    event_type: &str,
    emitted_at: &DateTime<Utc>,
    parameters: Option<&EventParameters>,
) -> String {
    let content = parameters
        .map(|p| serde_json::to_string(p).unwrap_or_default())
        .unwrap_or_default();
    let hash_input = format!("{}:{}:{}", event_type, emitted_at.to_rfc3339(), content);

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    let result = hasher.finalize();

    // Take first 16 bytes (32 hex chars)
    hex::encode(&result[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_serialization() {
        let params = EventParameters::new()
            .with("plan", "pro")
            .with("seats", 4i64)
            .with("price", 4.99)
            .with("trial", false);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["plan"], "pro");
        assert_eq!(json["seats"], 4.0);
        assert_eq!(json["price"], 4.99);
        assert_eq!(json["trial"], false);
    }

    #[test]
    fn test_parameters_accessors() {
        let mut params = EventParameters::new();
        assert!(params.is_empty());

        params.set(param_keys::REVENUE_CURRENCY, "USD");
        assert_eq!(params.len(), 1);
        assert!(params.contains_key(param_keys::REVENUE_CURRENCY));
        assert_eq!(
            params.get(param_keys::REVENUE_CURRENCY),
            Some(&ParamValue::String("USD".to_string()))
        );
        assert!(params.get(param_keys::RECEIPT).is_none());
    }

    #[test]
    fn test_standard_event_envelope() {
        let event = TrackedEvent::standard(
            event_types::LEVEL_COMPLETE,
            Some(EventParameters::new().with(param_keys::CONTENT_IDENTIFIER, "5")),
        );

        assert_eq!(event.event_type, "level_complete");
        assert_eq!(event.kind, EventKind::Standard);
        assert!(event.transaction_id.is_none());
        assert!(event.event_hash.is_some());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "level_complete");
        assert_eq!(json["kind"], "standard");
        assert_eq!(json["parameters"]["content_identifier"], "5");
        assert!(json.get("transaction_id").is_none());
    }

    #[test]
    fn test_purchase_event_envelope() {
        let event = TrackedEvent::in_app_purchase(
            "txn-123",
            Some(
                EventParameters::new()
                    .with(param_keys::REVENUE_AMOUNT, 4.99)
                    .with(param_keys::REVENUE_CURRENCY, "USD"),
            ),
        );

        assert_eq!(event.event_type, event_types::PURCHASE);
        assert_eq!(event.kind, EventKind::InAppPurchase);
        assert_eq!(event.transaction_id.as_deref(), Some("txn-123"));
        assert!(!event.has_receipt());
    }

    #[test]
    fn test_checkout_without_transaction_id() {
        let event = TrackedEvent::checkout(None, None);

        assert_eq!(event.event_type, event_types::CHECKOUT_COMPLETE);
        assert_eq!(event.kind, EventKind::Checkout);
        assert!(event.transaction_id.is_none());

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("parameters").is_none());
    }

    #[test]
    fn test_event_hash_deterministic() {
        let params = EventParameters::new().with("level", "5");
        let mut event1 = TrackedEvent::standard("level_complete", Some(params.clone()));
        let mut event2 = TrackedEvent::standard("level_complete", Some(params));

        // Pin timestamps so only the content drives the hash
        event2.emitted_at = event1.emitted_at;
        event1.refresh_hash();
        event2.refresh_hash();

        assert_eq!(event1.event_hash, event2.event_hash);
    }

    #[test]
    fn test_has_receipt() {
        let with_receipt = TrackedEvent::in_app_purchase(
            "txn-1",
            Some(EventParameters::new().with(param_keys::RECEIPT, "deadbeef")),
        );
        assert!(with_receipt.has_receipt());

        let without = TrackedEvent::in_app_purchase("txn-1", None);
        assert!(!without.has_receipt());
    }
}
