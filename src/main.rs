//! snipd: background daemon for global snippet hotkeys
//!
//! Headless runner for the snippet-manager core:
//! - Global summon hotkey via an X11 key grab (input-hook fallback)
//! - Clipboard-based text insertion into the previously focused window
//! - Core events broadcast for a future UI process
//!
//! The snippet selection surface is out of scope here; when the summon
//! hotkey fires the daemon inserts a fixed snippet (`SNIPD_SNIPPET`) so
//! the whole pipeline can be exercised end to end.

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use snipd::config::Config;
use snipd::events::CoreEvent;
use snipd::hotkey::HotkeyListener;
use snipd::insert::TextInserter;
use snipd::lifecycle::ShutdownSignal;

/// Inserted when the summon hotkey fires and no UI is attached
const DEFAULT_SNIPPET: &str = "Hello from snipd!";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "snipd starting");

    // Load configuration
    let config = Config::load();
    info!(summon = %config.hotkey.summon, "configuration loaded");

    let snippet =
        std::env::var("SNIPD_SNIPPET").unwrap_or_else(|_| DEFAULT_SNIPPET.to_string());

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Hotkey listener -> main loop
    let (summon_tx, mut summon_rx) = mpsc::channel::<()>(32);
    // Main loop / insertion worker -> event subscribers
    let (event_tx, _) = broadcast::channel::<CoreEvent>(64);

    // Insertion worker: owns the inserter because insert() is a blocking,
    // timing-sensitive sequence that must stay off the async runtime.
    let (job_tx, job_rx) = std::sync::mpsc::channel::<String>();
    let clipboard_config = config.clipboard.clone();
    let worker_events = event_tx.clone();
    let worker = std::thread::Builder::new()
        .name("insertion".to_string())
        .spawn(move || {
            let mut inserter = TextInserter::new(clipboard_config);
            for text in job_rx {
                inserter.save_active_window();
                if inserter.insert(&text) {
                    let _ = worker_events.send(CoreEvent::SnippetInserted {
                        chars: text.chars().count(),
                    });
                } else {
                    error!("snippet insertion failed");
                    let _ = worker_events.send(CoreEvent::InsertFailed);
                }
            }
        })?;

    // Register the summon hotkey; the callback runs on the listener thread
    // and only forwards the trigger.
    let mut listener = HotkeyListener::new();
    listener.register(config.hotkey.summon.clone(), move || {
        let _ = summon_tx.blocking_send(());
    });
    listener.start();
    if !listener.is_running() {
        warn!("continuing without hotkey support - check the summon pattern and display access");
    }

    let mut event_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Forward summon triggers to the insertion worker
        _ = async {
            while summon_rx.recv().await.is_some() {
                info!("summon hotkey pressed");
                let _ = event_tx.send(CoreEvent::SummonRequested);
                // A selection UI would run here; the headless daemon goes
                // straight to insertion.
                if job_tx.send(snippet.clone()).is_err() {
                    break;
                }
            }
        } => {
            info!("summon channel closed");
        }

        // Log core events as a subscriber would see them
        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "core event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("event stream closed");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    listener.stop();
    drop(job_tx);
    if worker.join().is_err() {
        warn!("insertion worker panicked");
    }

    info!("snipd stopped");

    Ok(())
}
