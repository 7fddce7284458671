//! postflight - connectivity and test-event tool for the Postflight SDK
//!
//! Lets integrators verify a config file and an ingest endpoint without
//! wiring the SDK into an app first.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use postflight_core::{logging, EventParameters, ParamValue, Sdk, SdkConfig};

#[derive(Parser, Debug)]
#[command(name = "postflight")]
#[command(about = "Send test events to a Postflight ingest endpoint")]
#[command(version)]
struct Args {
    /// Path to a config file (default: ~/.config/postflight/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Probe the ingest endpoint and exit
    #[arg(long)]
    check: bool,

    /// Event type tag to send
    #[arg(long, default_value = "sdk_test")]
    event_type: String,

    /// Event parameter as key=value (repeatable); values that parse as
    /// numbers or booleans are sent typed
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Send as an in-app purchase with this transaction identifier
    #[arg(long, value_name = "TXN_ID", conflicts_with = "checkout")]
    purchase: Option<String>,

    /// Send as a checkout, optionally with a transaction identifier
    #[arg(long, value_name = "TXN_ID", num_args = 0..=1, default_missing_value = "")]
    checkout: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SdkConfig::load_from(path).context("failed to load configuration")?,
        None => SdkConfig::load().context("failed to load configuration")?,
    };
    let _log_guard = logging::init(&config.logging).ok();

    let sdk = Sdk::init(config).context("failed to initialize postflight")?;

    if args.check {
        let reachable = sdk.check_connectivity();
        sdk.shutdown();
        if reachable {
            println!("ingest endpoint is reachable");
            return Ok(());
        }
        anyhow::bail!("ingest endpoint is not reachable");
    }

    let parameters = parse_params(&args.params)?;
    let events = sdk.event_service();

    if let Some(txn) = &args.purchase {
        events.track_in_app_purchase(txn, parameters);
    } else if let Some(txn) = &args.checkout {
        events.track_checkout((!txn.is_empty()).then_some(txn.as_str()), parameters);
    } else {
        match parameters {
            Some(p) => events.track_with_parameters(&args.event_type, p),
            None => events.track(&args.event_type),
        }
    }

    let install_id = sdk.install_id().to_string();
    sdk.shutdown();

    let stats = sdk.stats();
    println!(
        "install {}: {} submitted, {} delivered, {} rejected, {} dropped",
        install_id,
        stats.events_submitted,
        stats.events_sent,
        stats.events_rejected,
        stats.events_dropped
    );

    if stats.events_sent == 0 {
        anyhow::bail!("event was not delivered; check the endpoint and SDK key");
    }
    Ok(())
}

/// Parse repeated `key=value` flags into typed event parameters
fn parse_params(raw: &[String]) -> Result<Option<EventParameters>> {
    if raw.is_empty() {
        return Ok(None);
    }

    let mut params = EventParameters::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("invalid parameter {:?}, expected key=value", entry))?;
        if key.is_empty() {
            anyhow::bail!("invalid parameter {:?}, key must not be empty", entry);
        }
        params.set(key, coerce_value(value));
    }
    Ok(Some(params))
}

/// Send booleans and numbers typed, everything else as a string
fn coerce_value(value: &str) -> ParamValue {
    if let Ok(b) = value.parse::<bool>() {
        return ParamValue::Bool(b);
    }
    if let Ok(n) = value.parse::<f64>() {
        return ParamValue::Number(n);
    }
    ParamValue::String(value.to_string())
}
