use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use stratum_core::{StrategyMap, SyncConfig, SyncError, SyncOutcome};
use stratum_sync::{HttpTransport, Reconciler, StrategyTransport};

use crate::error::{io_err, DaemonError};
use crate::notifier::Notifier;

const WORKER_THREAD_NAME: &str = "stratum-sync";

/// Lifecycle of a [`Syncer`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncerState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SyncerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncerState::Idle => "idle",
            SyncerState::Running => "running",
            SyncerState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Keeps a component's strategy map synchronized in the background.
///
/// The application only ever calls [`start`](Self::start) and
/// [`stop`](Self::stop); results arrive on the notify channel given in the
/// [`SyncConfig`].
pub struct Syncer {
    reconciler: Arc<Reconciler>,
    notifier: Notifier,
    interval: Duration,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl Syncer {
    /// Syncer talking HTTP to the configured target.
    pub fn new(config: SyncConfig) -> Self {
        let transport = Arc::new(HttpTransport::from_config(&config));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: SyncConfig, transport: Arc<dyn StrategyTransport>) -> Self {
        let reconciler = Reconciler::new(&config, transport);
        Self::from_reconciler(&config, reconciler)
    }

    /// Use a pre-built reconciler, e.g. one with a custom observer.
    pub fn from_reconciler(config: &SyncConfig, reconciler: Reconciler) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            notifier: Notifier::new(config.notify().clone()),
            interval: config.interval(),
            cancel: CancellationToken::new(),
            worker: None,
        }
    }

    pub fn state(&self) -> SyncerState {
        match &self.worker {
            _ if self.cancel.is_cancelled() => SyncerState::Stopped,
            Some(handle) if handle.is_finished() => SyncerState::Stopped,
            Some(_) => SyncerState::Running,
            None => SyncerState::Idle,
        }
    }

    /// Seed from the durable cache and begin scheduling.
    ///
    /// The cache-seeded outcome, if any, is delivered before the first tick.
    /// The first tick fires one interval after this call.
    pub fn start(&mut self) -> Result<(), DaemonError> {
        let state = self.state();
        if state != SyncerState::Idle {
            return Err(DaemonError::InvalidState(state));
        }

        let seeded = self.reconciler.seed_from_cache();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| io_err("tokio-runtime", e))?;
        let worker = SyncWorker {
            reconciler: self.reconciler.clone(),
            notifier: self.notifier.clone(),
            interval: self.interval,
            cancel: self.cancel.clone(),
        };
        let handle = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(worker.run(seeded)))
            .map_err(|e| io_err(WORKER_THREAD_NAME, e))?;
        self.worker = Some(handle);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "strategy sync started"
        );
        Ok(())
    }

    /// Halt scheduling. Never blocks; safe to call any number of times.
    ///
    /// A cycle already in flight runs to completion and its outcome is still
    /// delivered, as is the cache-seeded outcome of `start`. No new tick fires.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("stopping strategy sync");
        }
        self.cancel.cancel();
    }

    /// Stop and wait for the background thread to exit.
    ///
    /// Blocks until any in-flight cycle finishes and its outcome has been
    /// accepted by the notify channel, so keep draining the receiver (or leave
    /// it capacity) while joining. Do not call from inside an async task.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("strategy sync thread panicked");
            }
        }
    }
}

impl Drop for Syncer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State moved onto the background thread.
struct SyncWorker {
    reconciler: Arc<Reconciler>,
    notifier: Notifier,
    interval: Duration,
    cancel: CancellationToken,
}

impl SyncWorker {
    async fn run(self, seeded: Option<Arc<StrategyMap>>) {
        if let Some(map) = seeded {
            if !self.deliver(SyncOutcome::Success(map)).await {
                self.cancel.cancel();
                return;
            }
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        // A cycle that overruns the interval delays the next tick; ticks never overlap.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let outcome = self.cycle().await;
                    if !self.deliver(outcome).await {
                        break;
                    }
                }
            }
        }

        self.cancel.cancel();
        tracing::info!("strategy sync loop exited");
    }

    /// One reconciliation on the blocking pool; a panic becomes a failure outcome.
    async fn cycle(&self) -> SyncOutcome {
        let started = Instant::now();
        let reconciler = self.reconciler.clone();
        let outcome = match tokio::task::spawn_blocking(move || reconciler.reconcile()).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic());
                tracing::error!(panic = %message, "reconciliation cycle panicked; scheduler continues");
                SyncOutcome::Failure(SyncError::Panicked(message))
            }
            Err(err) => {
                tracing::error!(error = %err, "reconciliation cycle aborted; scheduler continues");
                SyncOutcome::Failure(SyncError::Panicked(err.to_string()))
            }
        };
        tracing::debug!(
            success = outcome.is_success(),
            duration_ms = started.elapsed().as_millis() as u64,
            "reconciliation cycle finished",
        );
        outcome
    }

    /// Hand `outcome` to the application. Not raced against cancellation:
    /// once produced, an outcome is always delivered unless the receiver is
    /// gone. Returns `false` when the loop should exit.
    async fn deliver(&self, outcome: SyncOutcome) -> bool {
        match self.notifier.deliver(outcome).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "application dropped its receiver; stopping strategy sync");
                false
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Install a stderr fmt subscriber honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use stratum_core::{StrategyDetail, StrategyName, SyncRequest, SyncResponse};
    use stratum_sync::{fingerprint, MockTransport};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn config(dir: &TempDir, tx: mpsc::Sender<SyncOutcome>) -> SyncConfig {
        SyncConfig::builder()
            .with_target_url("http://authority.test/sync")
            .with_component("demo")
            .with_basic_auth("password")
            .with_interval_secs(60)
            .with_cache_path(dir.path().join("strategies.json"))
            .with_notify(tx)
            .build()
            .expect("config")
    }

    fn one(content: &str) -> StrategyMap {
        let mut map = StrategyMap::new();
        map.insert(
            StrategyName::from("A"),
            StrategyDetail {
                id: 1,
                alias: "a".to_string(),
                content: content.as_bytes().to_vec(),
                fingerprint: fingerprint(content.as_bytes()),
            },
        );
        map
    }

    fn worker(config: &SyncConfig, transport: Arc<dyn StrategyTransport>) -> SyncWorker {
        SyncWorker {
            reconciler: Arc::new(Reconciler::new(config, transport)),
            notifier: Notifier::new(config.notify().clone()),
            interval: config.interval(),
            cancel: CancellationToken::new(),
        }
    }

    /// Panics on the first exchange, then delegates to a mock.
    struct PanicOnce {
        calls: AtomicUsize,
        inner: MockTransport,
    }

    impl StrategyTransport for PanicOnce {
        fn exchange(&self, request: &SyncRequest) -> Result<SyncResponse, SyncError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("transport blew up");
            }
            self.inner.exchange(request)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_outcome_precedes_ticks_and_ticks_stay_ordered() {
        let dir = TempDir::new().expect("tempdir");
        let (tx, mut rx) = mpsc::channel(8);
        let cfg = config(&dir, tx);
        let mock = Arc::new(MockTransport::new());
        mock.push_response(SyncResponse::with_data(one("x")));
        mock.push_response(SyncResponse::with_data(one("y")));
        let worker = worker(&cfg, mock);
        let cancel = worker.cancel.clone();

        let task = tokio::spawn(worker.run(Some(Arc::new(one("cached")))));

        let seeded = rx.recv().await.expect("seeded");
        assert_eq!(seeded.strategies(), Some(&one("cached")));
        assert_eq!(rx.recv().await.expect("tick 1").strategies(), Some(&one("x")));
        assert_eq!(rx.recv().await.expect("tick 2").strategies(), Some(&one("y")));
        // Script exhausted: the mock reports a transport failure.
        assert!(matches!(
            rx.recv().await.expect("tick 3").error(),
            Some(SyncError::Transport(_))
        ));

        cancel.cancel();
        task.await.expect("worker exits");
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_cycle_is_reported_and_loop_continues() {
        let dir = TempDir::new().expect("tempdir");
        let (tx, mut rx) = mpsc::channel(8);
        let cfg = config(&dir, tx);
        let inner = MockTransport::new();
        inner.push_response(SyncResponse::with_data(one("x")));
        let transport = Arc::new(PanicOnce {
            calls: AtomicUsize::new(0),
            inner,
        });
        let worker = worker(&cfg, transport);
        let cancel = worker.cancel.clone();

        let task = tokio::spawn(worker.run(None));

        match rx.recv().await.expect("tick 1").error() {
            Some(SyncError::Panicked(msg)) => assert!(msg.contains("transport blew up")),
            other => panic!("expected panic failure, got {other:?}"),
        }
        assert_eq!(rx.recv().await.expect("tick 2").strategies(), Some(&one("x")));

        cancel.cancel();
        task.await.expect("worker exits");
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_outcome_is_delivered_even_when_already_cancelled() {
        let dir = TempDir::new().expect("tempdir");
        let (tx, mut rx) = mpsc::channel(8);
        let cfg = config(&dir, tx);
        let mock = Arc::new(MockTransport::new());
        let worker = worker(&cfg, mock.clone());
        worker.cancel.cancel();

        worker.run(Some(Arc::new(one("cached")))).await;

        let seeded = rx.try_recv().expect("seeded");
        assert_eq!(seeded.strategies(), Some(&one("cached")));
        assert!(rx.try_recv().is_err());
        assert!(mock.requests().is_empty(), "no tick after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_ends_the_loop() {
        let dir = TempDir::new().expect("tempdir");
        let (tx, rx) = mpsc::channel(1);
        let cfg = config(&dir, tx);
        let mock = Arc::new(MockTransport::new());
        let worker = worker(&cfg, mock);
        let cancel = worker.cancel.clone();
        drop(rx);

        worker.run(None).await;

        assert!(cancel.is_cancelled());
    }

    #[test]
    fn stop_before_start_is_terminal() {
        let dir = TempDir::new().expect("tempdir");
        let (tx, _rx) = mpsc::channel(1);
        let mut syncer = Syncer::with_transport(config(&dir, tx), Arc::new(MockTransport::new()));
        assert_eq!(syncer.state(), SyncerState::Idle);

        syncer.stop();
        syncer.stop();

        assert_eq!(syncer.state(), SyncerState::Stopped);
        assert!(matches!(
            syncer.start(),
            Err(DaemonError::InvalidState(SyncerState::Stopped))
        ));
    }

    #[test]
    fn state_labels() {
        assert_eq!(SyncerState::Idle.to_string(), "idle");
        assert_eq!(SyncerState::Running.to_string(), "running");
        assert_eq!(SyncerState::Stopped.to_string(), "stopped");
    }
}
