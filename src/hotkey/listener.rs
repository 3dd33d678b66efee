//! Global hotkey listener
//!
//! Owns the registered pattern/callback set and a single background thread
//! running the selected platform backend. Patterns are parsed when the
//! listener starts; invalid patterns are skipped, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::backend::{self, Backend, ResolvedBinding};
use super::keys::ParsedHotkey;

/// Bound on how long `stop` waits for the listener thread to exit
const STOP_TIMEOUT: Duration = Duration::from_secs(1);
/// Join poll interval inside `stop`
const JOIN_POLL: Duration = Duration::from_millis(25);

/// Errors produced by listener backends
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("backend initialization failed: {0}")]
    BackendInit(String),
}

/// One registered hotkey: the raw pattern plus its callback
struct Registration {
    pattern: String,
    callback: Arc<dyn Fn() + Send + Sync>,
}

/// Handle to the running backend thread
struct ListenerHandle {
    running: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

/// Global hotkey listener: register patterns, then `start` to begin
/// intercepting them system-wide.
///
/// All methods must be called from the one thread that owns the listener;
/// callbacks run on the background listener thread.
pub struct HotkeyListener {
    registrations: Vec<Registration>,
    handle: Option<ListenerHandle>,
}

impl HotkeyListener {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            handle: None,
        }
    }

    /// Register a hotkey pattern.
    ///
    /// Nothing is grabbed until `start`; registering an already-known
    /// pattern replaces its callback.
    pub fn register<F>(&mut self, pattern: impl Into<String>, callback: F) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        let pattern = pattern.into();
        let callback: Arc<dyn Fn() + Send + Sync> = Arc::new(callback);
        match self
            .registrations
            .iter_mut()
            .find(|r| r.pattern == pattern)
        {
            Some(existing) => existing.callback = callback,
            None => self.registrations.push(Registration { pattern, callback }),
        }
        true
    }

    /// Stop listening and drop every registered binding. Idempotent.
    pub fn unregister_all(&mut self) {
        self.stop();
        self.registrations.clear();
    }

    /// Number of registered bindings (parsed or not)
    pub fn binding_count(&self) -> usize {
        self.registrations.len()
    }

    /// Whether the backend thread is currently running
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| h.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Start the background listener with the best available backend.
    ///
    /// An already-running listener is fully stopped first; there are no
    /// partial restarts. Returns as soon as the thread is spawned. With no
    /// usable bindings nothing is grabbed and no thread starts.
    pub fn start(&mut self) {
        self.start_with(backend::select);
    }

    fn start_with<F>(&mut self, make_backend: F)
    where
        F: FnOnce(&[ResolvedBinding]) -> Box<dyn Backend> + Send + 'static,
    {
        self.stop();

        let resolved = self.resolve_bindings();
        if resolved.is_empty() {
            warn!("no usable hotkey bindings, listener not started");
            return;
        }

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let spawned = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                let mut backend = make_backend(&resolved);
                info!(
                    backend = backend.name(),
                    bindings = resolved.len(),
                    "hotkey listener started"
                );
                if let Err(e) = backend.run(Arc::clone(&thread_running)) {
                    error!(error = %e, "hotkey backend failed");
                }
                thread_running.store(false, Ordering::SeqCst);
            });

        match spawned {
            Ok(thread) => self.handle = Some(ListenerHandle { running, thread }),
            Err(e) => error!(error = %e, "failed to spawn hotkey listener thread"),
        }
    }

    /// Parse every registration, skipping patterns the grammar rejects.
    fn resolve_bindings(&self) -> Vec<ResolvedBinding> {
        let mut resolved = Vec::new();
        for registration in &self.registrations {
            match ParsedHotkey::parse(&registration.pattern) {
                Some(hotkey) => resolved.push(ResolvedBinding {
                    pattern: registration.pattern.clone(),
                    hotkey,
                    callback: Arc::clone(&registration.callback),
                }),
                None => {
                    warn!(pattern = %registration.pattern, "skipping invalid hotkey pattern");
                }
            }
        }
        resolved
    }

    /// Signal the backend thread to exit and join it with a bounded wait.
    /// A no-op when the listener is not running; safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        handle.running.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + STOP_TIMEOUT;
        while !handle.thread.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL);
        }

        if handle.thread.is_finished() {
            if handle.thread.join().is_err() {
                warn!("hotkey listener thread panicked");
            }
            info!("hotkey listener stopped");
        } else {
            // The input hook cannot be interrupted; the loop is inert now
            // that the running flag is cleared, so the thread is abandoned.
            warn!(
                timeout = ?STOP_TIMEOUT,
                "hotkey listener thread did not exit in time, leaking it"
            );
        }
    }
}

impl Default for HotkeyListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    /// Backend fed synthetic key chords over a channel
    struct TestBackend {
        bindings: Vec<ResolvedBinding>,
        events: mpsc::Receiver<ParsedHotkey>,
    }

    impl Backend for TestBackend {
        fn name(&self) -> &'static str {
            "test"
        }

        fn run(&mut self, running: Arc<AtomicBool>) -> Result<(), HotkeyError> {
            while running.load(Ordering::SeqCst) {
                match self.events.recv_timeout(Duration::from_millis(10)) {
                    Ok(chord) => {
                        for binding in &self.bindings {
                            if binding.hotkey == chord {
                                (binding.callback)();
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
            Ok(())
        }
    }

    fn chord(pattern: &str) -> ParsedHotkey {
        ParsedHotkey::parse(pattern).unwrap()
    }

    fn start_with_test_backend(
        listener: &mut HotkeyListener,
    ) -> mpsc::Sender<ParsedHotkey> {
        let (tx, rx) = mpsc::channel();
        listener.start_with(move |bindings| {
            Box::new(TestBackend {
                bindings: bindings.to_vec(),
                events: rx,
            })
        });
        tx
    }

    fn wait_for_count(counter: &Arc<AtomicUsize>, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if counter.load(Ordering::SeqCst) == expected {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_dispatches_once_then_stops() {
        let mut listener = HotkeyListener::new();
        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = Arc::clone(&count);
        listener.register("Ctrl+Shift+Space", move || {
            cb_count.fetch_add(1, Ordering::SeqCst);
        });

        let tx = start_with_test_backend(&mut listener);
        assert!(listener.is_running());

        tx.send(chord("shift+ctrl+space")).unwrap();
        assert!(wait_for_count(&count, 1));

        listener.stop();
        assert!(!listener.is_running());

        // Events after stop reach nobody
        let _ = tx.send(chord("shift+ctrl+space"));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reregistering_replaces_callback() {
        let mut listener = HotkeyListener::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let cb = Arc::clone(&first);
        listener.register("ctrl+d", move || {
            cb.fetch_add(1, Ordering::SeqCst);
        });
        let cb = Arc::clone(&second);
        listener.register("ctrl+d", move || {
            cb.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(listener.binding_count(), 1);

        let tx = start_with_test_backend(&mut listener);
        tx.send(chord("ctrl+d")).unwrap();
        assert!(wait_for_count(&second, 1));
        assert_eq!(first.load(Ordering::SeqCst), 0);

        listener.stop();
    }

    #[test]
    fn test_unregister_all_then_start_grabs_nothing() {
        let mut listener = HotkeyListener::new();
        listener.register("ctrl+shift+space", || {});
        listener.unregister_all();
        assert_eq!(listener.binding_count(), 0);

        listener.start();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut listener = HotkeyListener::new();
        listener.stop();
        listener.stop();
        assert!(!listener.is_running());
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let mut listener = HotkeyListener::new();
        let count = Arc::new(AtomicUsize::new(0));

        listener.register("ctrl+shift", || {});
        let cb = Arc::clone(&count);
        listener.register("ctrl+k", move || {
            cb.fetch_add(1, Ordering::SeqCst);
        });

        let tx = start_with_test_backend(&mut listener);
        assert!(listener.is_running());

        tx.send(chord("ctrl+k")).unwrap();
        assert!(wait_for_count(&count, 1));

        listener.stop();
    }

    #[test]
    fn test_only_invalid_patterns_means_no_listener() {
        let mut listener = HotkeyListener::new();
        listener.register("ctrl+alt", || {});
        let _tx = start_with_test_backend(&mut listener);
        assert!(!listener.is_running());
    }

    #[test]
    fn test_restart_replaces_previous_backend() {
        let mut listener = HotkeyListener::new();
        let count = Arc::new(AtomicUsize::new(0));
        let cb = Arc::clone(&count);
        listener.register("ctrl+g", move || {
            cb.fetch_add(1, Ordering::SeqCst);
        });

        let first_tx = start_with_test_backend(&mut listener);
        let second_tx = start_with_test_backend(&mut listener);
        assert!(listener.is_running());

        // The first backend is gone; only the second dispatches
        assert!(first_tx.send(chord("ctrl+g")).is_err());
        second_tx.send(chord("ctrl+g")).unwrap();
        assert!(wait_for_count(&count, 1));

        listener.stop();
    }

    #[test]
    fn test_callback_feeds_async_channel() {
        let mut listener = HotkeyListener::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(8);
        listener.register("ctrl+shift+v", move || {
            let _ = tx.blocking_send(());
        });

        let event_tx = start_with_test_backend(&mut listener);
        event_tx.send(chord("Ctrl+Shift+V")).unwrap();

        let received = tokio_test::block_on(async {
            tokio::time::timeout(Duration::from_secs(2), rx.recv()).await
        });
        assert!(received.expect("timed out waiting for hotkey").is_some());

        listener.stop();
    }
}
