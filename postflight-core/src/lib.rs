//! # postflight-core
//!
//! Core library for Postflight - an SDK for reporting post-install user
//! events (custom events, in-app purchases, checkouts) to a Postflight
//! ingest server.
//!
//! This library provides:
//! - A typed event model with well-known type tags and parameter keys
//! - The [`EventService`] tracking facade, obtained from [`Sdk`]
//! - A background delivery session with batching, retries, and receipt
//!   sourcing for purchase validation
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Tracking calls never block and never fail: the facade validates its
//! preconditions, wraps the call into a [`TrackedEvent`], and enqueues it
//! for the session worker. Delivery, retries, and receipt validation all
//! happen off the caller's thread.
//!
//! ## Example
//!
//! ```rust,no_run
//! use postflight_core::{param_keys, EventParameters, Sdk, SdkConfig};
//!
//! let sdk = Sdk::init(SdkConfig::new("pf_live_xxxxxxxx")).expect("failed to initialize");
//! let events = sdk.event_service();
//!
//! events.track("level_complete");
//!
//! events.track_in_app_purchase(
//!     "txn-123",
//!     Some(
//!         EventParameters::new()
//!             .with(param_keys::REVENUE_AMOUNT, 4.99)
//!             .with(param_keys::REVENUE_CURRENCY, "USD"),
//!     ),
//! );
//!
//! sdk.shutdown();
//! ```

// Re-export commonly used items at the crate root
pub use config::{LoggingConfig, SdkConfig};
pub use error::{Error, Result};
pub use event::{event_types, param_keys, EventParameters, ParamValue, TrackedEvent};
pub use sdk::Sdk;
pub use service::EventService;
pub use session::{EventSink, SessionStats};

// Public modules
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod sdk;
pub mod service;
pub mod session;
