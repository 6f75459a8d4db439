//! # Reassembler Service
//!
//! Public face of the reorder engine: construction, lifecycle, and the
//! submit/receive conduits.
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──start()──→ Running ──cancel / all handles dropped──→ Stopped
//! ```
//!
//! Submitting before `start` fails fast with `NotStarted`; receiving before
//! `start` returns `None` immediately. After stop, submitting fails with
//! `Closed` and receiving drains what was already delivered, then returns
//! `None`.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::handles::{ReassembledStream, Submitter};
use super::stats::{Counters, ReassemblerStats};
use super::worker::Worker;
use crate::config::ReassemblerConfig;
use crate::domain::{Issue, ReassemblerError, ReorderBuffer, SequenceValue};

/// Extracts the sequence value from an item.
pub type SequenceFn<T, S> = Arc<dyn Fn(&T) -> S + Send + Sync>;

/// Receives every item the reassembler drops, with the reason.
pub type DropObserver<T, S> = Arc<dyn Fn(T, Issue<S>) + Send + Sync>;

/// Where a reassembler is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReassemblerState {
    /// Built, not started.
    Created,
    /// Worker is processing items.
    Running,
    /// Worker has been told to stop or has exited. Terminal.
    Stopped,
}

/// Conduits that exist only once the worker is running.
struct Conduits<T> {
    intake: mpsc::Sender<T>,
    delivery: mpsc::Receiver<T>,
    shutdown: CancellationToken,
    /// Taken by `closed` once awaited.
    worker: Option<JoinHandle<()>>,
}

/// Re-emits submitted items strictly in sequence order.
///
/// Early items are held until the gap before them fills; items behind the
/// cursor are handed to the drop observer.
pub struct Reassembler<T, S: SequenceValue> {
    name: Arc<str>,
    config: ReassemblerConfig,
    sequence_fn: SequenceFn<T, S>,
    observer: Arc<RwLock<DropObserver<T, S>>>,
    counters: Arc<Counters>,
    conduits: Option<Conduits<T>>,
}

impl<T: Send + 'static, S: SequenceValue> Reassembler<T, S> {
    /// Create a reassembler with the default configuration and drop observer.
    pub fn new<F>(name: impl Into<Arc<str>>, sequence_fn: F) -> Self
    where
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        let name = name.into();
        Self::assemble(
            Arc::clone(&name),
            ReassemblerConfig::default(),
            Arc::new(sequence_fn),
            log_drop(name),
        )
    }

    /// Start building a reassembler.
    pub fn builder(name: impl Into<Arc<str>>) -> ReassemblerBuilder<T, S> {
        ReassemblerBuilder {
            name: name.into(),
            config: ReassemblerConfig::default(),
            sequence_fn: None,
            observer: None,
        }
    }

    fn assemble(
        name: Arc<str>,
        config: ReassemblerConfig,
        sequence_fn: SequenceFn<T, S>,
        observer: DropObserver<T, S>,
    ) -> Self {
        Self {
            name,
            config,
            sequence_fn,
            observer: Arc::new(RwLock::new(observer)),
            counters: Arc::new(Counters::default()),
            conduits: None,
        }
    }

    /// Diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ReassemblerConfig {
        &self.config
    }

    /// Replace the drop observer. Takes effect for the next dropped item,
    /// whether or not the reassembler is running.
    pub fn on_drop<F>(&self, observer: F)
    where
        F: Fn(T, Issue<S>) + Send + Sync + 'static,
    {
        let mut slot = self
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(observer);
        debug!(name = %self.name, "Drop observer replaced");
    }

    /// Set the cursor to `initial` and spawn the worker on the current
    /// Tokio runtime. The worker stops when `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// - `AlreadyStarted` if called more than once
    /// - `NoRuntime` if there is no Tokio runtime to spawn on
    pub fn start(
        &mut self,
        initial: S,
        shutdown: CancellationToken,
    ) -> Result<(), ReassemblerError> {
        if self.conduits.is_some() {
            return Err(ReassemblerError::AlreadyStarted {
                name: Arc::clone(&self.name),
            });
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ReassemblerError::NoRuntime {
                name: Arc::clone(&self.name),
            }
        })?;

        let (intake_tx, intake_rx) = mpsc::channel(self.config.intake_capacity);
        let (delivery_tx, delivery_rx) = mpsc::channel(self.config.delivery_capacity);

        let worker = Worker {
            name: Arc::clone(&self.name),
            sequence_fn: Arc::clone(&self.sequence_fn),
            observer: Arc::clone(&self.observer),
            counters: Arc::clone(&self.counters),
            report_collisions: self.config.report_collisions,
            buffer: ReorderBuffer::new(initial),
            intake: intake_rx,
            delivery: delivery_tx,
            shutdown: shutdown.clone(),
        };

        self.conduits = Some(Conduits {
            intake: intake_tx,
            delivery: delivery_rx,
            shutdown,
            worker: Some(runtime.spawn(worker.run())),
        });
        Ok(())
    }

    /// Hand `item` to the worker, waiting until it is accepted.
    ///
    /// # Errors
    ///
    /// - `NotStarted` before `start`
    /// - `Closed` once the reassembler has stopped
    pub async fn submit(&self, item: T) -> Result<(), ReassemblerError> {
        self.submitter()?.submit(item).await
    }

    /// A cloneable handle for submitting from other tasks.
    ///
    /// # Errors
    ///
    /// `NotStarted` before `start`.
    pub fn submitter(&self) -> Result<Submitter<T>, ReassemblerError> {
        let conduits = self.conduits.as_ref().ok_or_else(|| ReassemblerError::NotStarted {
            name: Arc::clone(&self.name),
        })?;

        Ok(Submitter::new(
            Arc::clone(&self.name),
            conduits.intake.clone(),
            conduits.shutdown.clone(),
        ))
    }

    /// Receive the next in-order item.
    ///
    /// # Returns
    ///
    /// - `Some(item)` - The next item in sequence
    /// - `None` - Not started, or stopped with every delivered item drained
    ///
    /// Items the worker handed over before it stopped are still returned;
    /// the worker drops its end on exit, which ends the stream.
    pub async fn recv(&mut self) -> Option<T> {
        self.conduits.as_mut()?.delivery.recv().await
    }

    /// Turn the receiving side into a `Stream`. Grab a [`Submitter`] first.
    ///
    /// # Errors
    ///
    /// `NotStarted` before `start`.
    pub fn into_stream(self) -> Result<ReassembledStream<T>, ReassemblerError> {
        match self.conduits {
            Some(conduits) => Ok(ReassembledStream::new(conduits.delivery)),
            None => Err(ReassemblerError::NotStarted { name: self.name }),
        }
    }

    /// Wait until the worker task has exited.
    ///
    /// The reassembler holds an intake sender itself, so this waits for the
    /// shutdown token; it never returns if the token is not cancelled.
    pub async fn closed(&mut self) {
        let Some(worker) = self.conduits.as_mut().and_then(|conduits| conduits.worker.take()) else {
            return;
        };

        if let Err(e) = worker.await {
            if !e.is_cancelled() {
                warn!(name = %self.name, error = %e, "Reassembler worker failed");
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReassemblerState {
        match &self.conduits {
            None => ReassemblerState::Created,
            Some(conduits)
                if conduits.shutdown.is_cancelled()
                    || conduits.worker.as_ref().map_or(true, JoinHandle::is_finished) =>
            {
                ReassemblerState::Stopped
            }
            Some(_) => ReassemblerState::Running,
        }
    }

    /// Snapshot of the worker's counters.
    #[must_use]
    pub fn stats(&self) -> ReassemblerStats {
        self.counters.snapshot()
    }
}

impl<T, S: SequenceValue> fmt::Debug for Reassembler<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reassembler")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("started", &self.conduits.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Reassembler`].
pub struct ReassemblerBuilder<T, S: SequenceValue> {
    name: Arc<str>,
    config: ReassemblerConfig,
    sequence_fn: Option<SequenceFn<T, S>>,
    observer: Option<DropObserver<T, S>>,
}

impl<T: Send + 'static, S: SequenceValue> ReassemblerBuilder<T, S> {
    /// Set the sequence extraction function (required).
    #[must_use]
    pub fn sequence_fn<F>(mut self, sequence_fn: F) -> Self
    where
        F: Fn(&T) -> S + Send + Sync + 'static,
    {
        self.sequence_fn = Some(Arc::new(sequence_fn));
        self
    }

    /// Set the drop observer. Defaults to logging each drop.
    #[must_use]
    pub fn on_drop<F>(mut self, observer: F) -> Self
    where
        F: Fn(T, Issue<S>) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Override the configuration.
    #[must_use]
    pub fn config(mut self, config: ReassemblerConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// - `MissingSequenceFn` if no extraction function was set
    /// - `InvalidConfig` if the configuration fails validation
    pub fn build(self) -> Result<Reassembler<T, S>, ReassemblerError> {
        let Some(sequence_fn) = self.sequence_fn else {
            return Err(ReassemblerError::MissingSequenceFn { name: self.name });
        };
        self.config.validate()?;

        let observer = self
            .observer
            .unwrap_or_else(|| log_drop(Arc::clone(&self.name)));
        Ok(Reassembler::assemble(
            self.name,
            self.config,
            sequence_fn,
            observer,
        ))
    }
}

fn log_drop<T, S: SequenceValue>(name: Arc<str>) -> DropObserver<T, S> {
    Arc::new(move |_item: T, issue: Issue<S>| {
        warn!(
            name = %name,
            kind = %issue.kind,
            next_seq = %issue.next_seq,
            cause = %issue.cause,
            "Dropped item"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IssueKind;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Package {
        sequence: u32,
        data: char,
    }

    fn pkg(sequence: u32, data: char) -> Package {
        Package { sequence, data }
    }

    fn recorder() -> (
        Arc<Mutex<Vec<(Package, Issue<u32>)>>>,
        impl Fn(Package, Issue<u32>) + Send + Sync + 'static,
    ) {
        let drops = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&drops);
        (drops, move |item: Package, issue: Issue<u32>| {
            sink.lock().unwrap().push((item, issue));
        })
    }

    fn started(
        drops: impl Fn(Package, Issue<u32>) + Send + Sync + 'static,
    ) -> (Reassembler<Package, u32>, CancellationToken) {
        let mut reassembler = Reassembler::builder("order")
            .sequence_fn(|p: &Package| p.sequence)
            .on_drop(drops)
            .config(ReassemblerConfig::for_testing())
            .build()
            .unwrap();
        let shutdown = CancellationToken::new();
        reassembler.start(0, shutdown.clone()).unwrap();
        (reassembler, shutdown)
    }

    async fn next(reassembler: &mut Reassembler<Package, u32>) -> Option<Package> {
        timeout(Duration::from_millis(500), reassembler.recv())
            .await
            .expect("timeout")
    }

    #[test]
    fn test_build_without_sequence_fn_fails() {
        let result = Reassembler::<Package, u32>::builder("order").build();
        assert!(matches!(
            result,
            Err(ReassemblerError::MissingSequenceFn { .. })
        ));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = Reassembler::<Package, u32>::builder("order")
            .sequence_fn(|p| p.sequence)
            .config(ReassemblerConfig {
                intake_capacity: 0,
                ..ReassemblerConfig::default()
            })
            .build();
        assert!(matches!(result, Err(ReassemblerError::InvalidConfig(_))));
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let mut reassembler = Reassembler::new("order", |p: &Package| p.sequence);
        let result = reassembler.start(0, CancellationToken::new());
        assert!(matches!(result, Err(ReassemblerError::NoRuntime { .. })));
        assert_eq!(reassembler.state(), ReassemblerState::Created);
    }

    #[tokio::test]
    async fn test_submit_before_start_fails_fast() {
        let mut reassembler = Reassembler::new("order", |p: &Package| p.sequence);

        let result = reassembler.submit(pkg(0, 'A')).await;
        assert!(matches!(result, Err(ReassemblerError::NotStarted { .. })));
        assert_eq!(reassembler.recv().await, None);
        assert_eq!(reassembler.state(), ReassemblerState::Created);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (_, sink) = recorder();
        let (mut reassembler, _shutdown) = started(sink);

        let result = reassembler.start(5, CancellationToken::new());
        assert!(matches!(
            result,
            Err(ReassemblerError::AlreadyStarted { .. })
        ));
        assert_eq!(reassembler.state(), ReassemblerState::Running);
    }

    #[tokio::test]
    async fn test_out_of_order_example() {
        let (drops, sink) = recorder();
        let (mut reassembler, _shutdown) = started(sink);

        reassembler.submit(pkg(2, 'C')).await.unwrap();
        reassembler.submit(pkg(0, 'A')).await.unwrap();
        reassembler.submit(pkg(1, 'B')).await.unwrap();

        let received: Vec<char> = [
            next(&mut reassembler).await,
            next(&mut reassembler).await,
            next(&mut reassembler).await,
        ]
        .into_iter()
        .flatten()
        .map(|p| p.data)
        .collect();

        assert_eq!(received, vec!['A', 'B', 'C']);
        assert!(drops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_is_reported_stale() {
        let (drops, sink) = recorder();
        let (mut reassembler, _shutdown) = started(sink);

        reassembler.submit(pkg(0, 'A')).await.unwrap();
        reassembler.submit(pkg(0, '2')).await.unwrap();
        reassembler.submit(pkg(1, 'B')).await.unwrap();

        assert_eq!(next(&mut reassembler).await, Some(pkg(0, 'A')));
        assert_eq!(next(&mut reassembler).await, Some(pkg(1, 'B')));

        let drops = drops.lock().unwrap();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].0, pkg(0, '2'));
        assert!(drops[0].1.is(IssueKind::Stale));
        assert_eq!(drops[0].1.next_seq, 1);
    }

    #[tokio::test]
    async fn test_replaced_observer_receives_later_drops() {
        let (first, first_sink) = recorder();
        let (second, second_sink) = recorder();
        let (mut reassembler, _shutdown) = started(first_sink);

        reassembler.submit(pkg(0, 'A')).await.unwrap();
        assert_eq!(next(&mut reassembler).await, Some(pkg(0, 'A')));

        reassembler.on_drop(second_sink);
        reassembler.submit(pkg(0, 'x')).await.unwrap();
        reassembler.submit(pkg(1, 'B')).await.unwrap();
        assert_eq!(next(&mut reassembler).await, Some(pkg(1, 'B')));

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_collision_reported() {
        let (drops, sink) = recorder();
        let (mut reassembler, _shutdown) = started(sink);

        reassembler.submit(pkg(1, 'x')).await.unwrap();
        reassembler.submit(pkg(1, 'B')).await.unwrap();
        reassembler.submit(pkg(0, 'A')).await.unwrap();

        assert_eq!(next(&mut reassembler).await, Some(pkg(0, 'A')));
        assert_eq!(next(&mut reassembler).await, Some(pkg(1, 'B')));

        let drops = drops.lock().unwrap();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].0, pkg(1, 'x'));
        assert!(drops[0].1.is(IssueKind::PendingCollision));
        assert_eq!(reassembler.stats().collisions, 1);
    }

    #[tokio::test]
    async fn test_stats_track_delivery() {
        let (_, sink) = recorder();
        let (mut reassembler, shutdown) = started(sink);

        reassembler.submit(pkg(3, 'D')).await.unwrap();
        reassembler.submit(pkg(0, 'A')).await.unwrap();
        assert_eq!(next(&mut reassembler).await, Some(pkg(0, 'A')));

        reassembler.submit(pkg(0, 'z')).await.unwrap();
        reassembler.submit(pkg(1, 'B')).await.unwrap();
        assert_eq!(next(&mut reassembler).await, Some(pkg(1, 'B')));

        assert_eq!(reassembler.stats().buffered, 1);

        shutdown.cancel();
        reassembler.closed().await;

        let stats = reassembler.stats();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.faults, 0);
        assert_eq!(stats.buffered, 0);
    }

    #[tokio::test]
    async fn test_delivered_item_survives_cancel() {
        let (_, sink) = recorder();
        let (mut reassembler, shutdown) = started(sink);

        reassembler.submit(pkg(0, 'A')).await.unwrap();
        timeout(Duration::from_millis(500), async {
            while reassembler.stats().delivered == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("timeout");
        shutdown.cancel();
        reassembler.closed().await;

        assert_eq!(reassembler.stats().delivered, 1);
        assert_eq!(next(&mut reassembler).await, Some(pkg(0, 'A')));
        assert_eq!(next(&mut reassembler).await, None);
        assert_eq!(next(&mut reassembler).await, None);
    }

    #[tokio::test]
    async fn test_cancel_stops_and_rejects() {
        let (_, sink) = recorder();
        let (mut reassembler, shutdown) = started(sink);

        reassembler.submit(pkg(5, 'F')).await.unwrap();
        shutdown.cancel();
        shutdown.cancel();
        reassembler.closed().await;

        assert_eq!(reassembler.state(), ReassemblerState::Stopped);
        assert_eq!(next(&mut reassembler).await, None);
        assert!(matches!(
            reassembler.submit(pkg(0, 'A')).await,
            Err(ReassemblerError::Closed { .. })
        ));
        assert_eq!(reassembler.stats().buffered, 0);
    }

    #[test]
    fn test_debug_output_names_reassembler() {
        let reassembler = Reassembler::new("order", |p: &Package| p.sequence);
        let rendered = format!("{reassembler:?}");
        assert!(rendered.contains("order"));
        assert!(rendered.contains("started: false"));
    }
}
