//! SDK entry point
//!
//! [`Sdk`] is the parent object everything else hangs off: it owns the shared
//! event session, and [`Sdk::event_service`] is the factory accessor for the
//! tracking facade. All shared state lives here or below; the facade itself
//! is a plain value referencing the session.

use std::sync::{Arc, OnceLock};

use crate::config::SdkConfig;
use crate::error::{Error, Result};
use crate::service::EventService;
use crate::session::{EventSession, EventSink, SessionStats};

static SHARED: OnceLock<Sdk> = OnceLock::new();

/// The Postflight SDK
///
/// Created once per process with [`Sdk::init`] (or installed globally with
/// [`Sdk::init_shared`]). Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct Sdk {
    session: Arc<EventSession>,
}

impl Sdk {
    /// Initialize the SDK from configuration
    ///
    /// Validates the configuration and starts the delivery session.
    pub fn init(config: SdkConfig) -> Result<Self> {
        let session = Arc::new(EventSession::spawn(&config)?);

        tracing::info!(
            install_id = %session.install_id(),
            endpoint = %config.endpoint,
            "postflight initialized"
        );

        Ok(Self { session })
    }

    /// Initialize the process-wide shared instance
    ///
    /// Fails if the configuration is invalid or the SDK was already
    /// initialized.
    pub fn init_shared(config: SdkConfig) -> Result<&'static Sdk> {
        let sdk = Self::init(config)?;

        if SHARED.set(sdk).is_err() {
            // The losing instance drains and stops on drop
            return Err(Error::Config(
                "postflight is already initialized".to_string(),
            ));
        }

        Self::shared()
    }

    /// The process-wide shared instance
    ///
    /// Fails fast with a configuration error if [`Sdk::init_shared`] has not
    /// run yet.
    pub fn shared() -> Result<&'static Sdk> {
        SHARED.get().ok_or_else(|| {
            Error::Config("postflight is not initialized, call Sdk::init_shared first".to_string())
        })
    }

    /// Factory accessor for the event reporting facade
    ///
    /// The returned service holds a reference to the shared session; it is
    /// the only way to obtain an [`EventService`].
    pub fn event_service(&self) -> EventService {
        EventService::new(Arc::clone(&self.session) as Arc<dyn EventSink>)
    }

    /// The per-install identity attached to every delivered event
    pub fn install_id(&self) -> &str {
        self.session.install_id()
    }

    /// Snapshot of delivery statistics
    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Probe the ingest endpoint (blocking, diagnostic)
    pub fn check_connectivity(&self) -> bool {
        self.session.probe()
    }

    /// Drain pending events and stop the delivery session
    pub fn shutdown(&self) {
        self.session.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_rejects_invalid_config() {
        assert!(Sdk::init(SdkConfig::default()).is_err());
    }

    #[test]
    fn test_shared_requires_init() {
        // Not initialized yet: fail fast with a configuration error
        match Sdk::shared() {
            Err(Error::Config(_)) => {}
            other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
        }

        // A failed init_shared leaves the shared slot empty
        assert!(Sdk::init_shared(SdkConfig::default()).is_err());
        assert!(Sdk::shared().is_err());
    }
}
