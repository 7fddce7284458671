//! Event session: the delivery half of the SDK
//!
//! The facade hands events to an [`EventSession`], which owns the channel to
//! a dedicated worker thread and the HTTP client that talks to the ingest
//! server.
//!
//! ## Architecture
//!
//! The session follows a "never block the app" principle:
//! - Tracking calls enqueue onto an unbounded channel and return immediately
//! - Delivery, retries, and receipt sourcing happen on the worker thread
//! - Delivery failures never reach the tracking caller
//!
//! ## Usage
//!
//! Host binaries can configure the SDK in `~/.config/postflight/config.toml`:
//!
//! ```toml
//! sdk_key = "pf_live_xxxxxxxxxxxx"
//! endpoint = "https://ingest.postflight.io"
//! receipt_path = "/var/app/receipt"
//! ```

mod client;

pub use client::{IngestClient, IngestResponse};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::SdkConfig;
use crate::error::{Error, Result};
use crate::event::{param_keys, EventKind, EventParameters, TrackedEvent};

/// Ingestion seam the facade forwards events through
pub trait EventSink: Send + Sync {
    /// Accept an event for delivery. Must not block the caller.
    fn submit(&self, event: TrackedEvent);
}

/// Commands understood by the session worker
enum Command {
    Track(TrackedEvent),
    Probe(std::sync::mpsc::Sender<bool>),
    Shutdown,
}

/// Delivery statistics snapshot
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Events accepted from the facade
    pub events_submitted: usize,
    /// Events the server accepted
    pub events_sent: usize,
    /// Events the server rejected (duplicates, validation errors)
    pub events_rejected: usize,
    /// Events lost to delivery failure or shutdown
    pub events_dropped: usize,
    /// Number of API calls made
    pub api_calls: usize,
    /// Number of failed API calls
    pub api_failures: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicUsize,
    sent: AtomicUsize,
    rejected: AtomicUsize,
    dropped: AtomicUsize,
    api_calls: AtomicUsize,
    api_failures: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> SessionStats {
        SessionStats {
            events_submitted: self.submitted.load(Ordering::Relaxed),
            events_sent: self.sent.load(Ordering::Relaxed),
            events_rejected: self.rejected.load(Ordering::Relaxed),
            events_dropped: self.dropped.load(Ordering::Relaxed),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            api_failures: self.api_failures.load(Ordering::Relaxed),
        }
    }
}

/// Shared delivery session behind the facade
///
/// Owns the worker thread that batches and ships events. The worker runs its
/// own current-thread tokio runtime, so the host application needs no async
/// runtime of its own.
pub struct EventSession {
    install_id: String,
    tx: mpsc::UnboundedSender<Command>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    counters: Arc<Counters>,
    probe_timeout: Duration,
}

impl EventSession {
    /// Spawn a session from configuration
    ///
    /// Validates the configuration, builds the HTTP client, and starts the
    /// worker thread.
    pub fn spawn(config: &SdkConfig) -> Result<Self> {
        let client = IngestClient::new(config)?;

        let install_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        let worker_counters = Arc::clone(&counters);
        let worker_install_id = install_id.clone();
        let receipt_path = config.receipt_path.clone();
        let batch_size = config.batch_size;

        let handle = thread::Builder::new()
            .name("postflight-session".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to create session runtime");
                        return;
                    }
                };
                runtime.block_on(run_worker(
                    client,
                    worker_install_id,
                    receipt_path,
                    batch_size,
                    rx,
                    worker_counters,
                ));
            })
            .map_err(|e| Error::Transport(format!("failed to spawn session worker: {}", e)))?;

        Ok(Self {
            install_id,
            tx,
            worker: Mutex::new(Some(handle)),
            counters,
            probe_timeout: Duration::from_secs(config.timeout_secs + 5),
        })
    }

    /// The per-install identity attached to every delivered event
    pub fn install_id(&self) -> &str {
        &self.install_id
    }

    /// Snapshot of delivery statistics
    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    /// Probe the ingest endpoint through the worker (blocking, diagnostic)
    pub fn probe(&self) -> bool {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        if self.tx.send(Command::Probe(reply_tx)).is_err() {
            return false;
        }
        reply_rx.recv_timeout(self.probe_timeout).unwrap_or(false)
    }

    /// Drain pending events and stop the worker
    ///
    /// Events submitted after shutdown are dropped with a warning.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        let handle = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("session worker panicked during shutdown");
            }
        }
    }
}

impl EventSink for EventSession {
    fn submit(&self, event: TrackedEvent) {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(Command::Track(event)).is_err() {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("event session is shut down, dropping event");
        }
    }
}

impl Drop for EventSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: batch queued events opportunistically and deliver them
async fn run_worker(
    client: IngestClient,
    install_id: String,
    receipt_path: Option<PathBuf>,
    batch_size: usize,
    mut rx: mpsc::UnboundedReceiver<Command>,
    counters: Arc<Counters>,
) {
    let mut shutting_down = false;

    while !shutting_down {
        let Some(first) = rx.recv().await else { break };

        let mut batch = Vec::new();
        match first {
            Command::Track(event) => batch.push(event),
            Command::Probe(reply) => {
                let ok = client.health_check().await.unwrap_or(false);
                let _ = reply.send(ok);
                continue;
            }
            Command::Shutdown => break,
        }

        // Drain whatever is already queued, up to the batch size
        while batch.len() < batch_size && !shutting_down {
            match rx.try_recv() {
                Ok(Command::Track(event)) => batch.push(event),
                Ok(Command::Probe(reply)) => {
                    let ok = client.health_check().await.unwrap_or(false);
                    let _ = reply.send(ok);
                }
                Ok(Command::Shutdown) => shutting_down = true,
                Err(_) => break,
            }
        }

        deliver(&client, &install_id, receipt_path.as_deref(), batch, &counters).await;
    }
}

async fn deliver(
    client: &IngestClient,
    install_id: &str,
    receipt_path: Option<&Path>,
    mut batch: Vec<TrackedEvent>,
    counters: &Counters,
) {
    for event in &mut batch {
        if event.kind == EventKind::InAppPurchase && !event.has_receipt() {
            attach_default_receipt(event, receipt_path);
        }
    }

    counters.api_calls.fetch_add(1, Ordering::Relaxed);

    match client.send_events_with_retry(install_id, &batch).await {
        Ok(response) => {
            counters.sent.fetch_add(response.accepted, Ordering::Relaxed);
            counters.rejected.fetch_add(response.rejected, Ordering::Relaxed);
            tracing::debug!(
                install_id = %install_id,
                accepted = response.accepted,
                rejected = response.rejected,
                "Delivered events"
            );
        }
        Err(e) => {
            counters.api_failures.fetch_add(1, Ordering::Relaxed);
            counters.dropped.fetch_add(batch.len(), Ordering::Relaxed);
            // Delivery failures never reach the tracking caller
            tracing::warn!(
                install_id = %install_id,
                error = %e,
                "Failed to deliver events"
            );
        }
    }
}

/// Attach the platform default receipt to a purchase event without one
///
/// Reads the configured receipt path and inlines its hex-encoded contents.
/// A missing or unreadable receipt is logged and the event is sent as-is.
fn attach_default_receipt(event: &mut TrackedEvent, receipt_path: Option<&Path>) {
    let Some(path) = receipt_path else {
        tracing::debug!("no platform receipt path configured, sending purchase without receipt");
        return;
    };

    match std::fs::read(path) {
        Ok(bytes) => {
            event
                .parameters
                .get_or_insert_with(EventParameters::new)
                .set(param_keys::RECEIPT, hex::encode(bytes));
            event.refresh_hash();
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read platform receipt, sending purchase without receipt"
            );
        }
    }
}
