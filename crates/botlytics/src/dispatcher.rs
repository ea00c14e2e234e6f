//! 📦 The batching dispatcher: buffer records, ship them in bulk, never lose a failed batch.
//!
//! 🧠 Knowledge graph:
//! - The buffer and the Idle/Delivering phase share one `std::sync::Mutex`. Taking a
//!   snapshot and flipping to Delivering happen under the same lock ([`Shared::try_begin`]),
//!   so there is never a moment where two callers both think they own the next delivery.
//! - A [`Snapshot`] is always a prefix of the buffer: its length, plus the composed JSON
//!   array body. Only the worker settles it. Success drains exactly that prefix; failure
//!   drains nothing. Records appended in between stay behind the prefix, untouched.
//! - [`Dispatcher::append`] is synchronous and never waits on I/O. When the threshold is
//!   reached it hands the snapshot to the worker over an unbounded channel and moves on.
//! - The worker (see `workers::dispatch_worker`) owns the backend and the interval timer.
//! - Dropping the dispatcher stops the worker. Whatever is still buffered is lost; call
//!   [`Dispatcher::flush`] first if that matters.
//!
//! ⚠️ No backoff, no retry cap. A collector that is down for an hour gets a retry at every
//! trigger for an hour, and the buffer grows unless `max_buffered_records` is set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::backends::{DeliveryBackend, HttpDelivery};
use crate::composers::JsonArrayComposer;
use crate::config::DispatcherConfig;
use crate::field_filter::FieldFilter;
use crate::schema::NormalizedRecord;
use crate::workers::{DispatchJob, DispatchWorker, Worker};

/// 🚦 Is a delivery in flight?
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Delivering,
}

/// 📬 What happened to a flush request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The collector accepted this many records; they are gone from the buffer.
    Delivered { records: usize },
    /// The attempt failed; these records are still buffered.
    Failed { records: usize, reason: String },
    /// Nothing buffered.
    Empty,
    /// Another delivery is in flight. Nothing was started.
    Busy,
    /// `dispatch` only: the buffer hasn't reached the threshold yet.
    BelowThreshold,
    /// The worker is gone (dispatcher shutting down).
    Closed,
}

/// 📊 Counters since construction, plus the buffer as it stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Records accepted into the buffer.
    pub appended: u64,
    /// Records the collector acknowledged.
    pub delivered: u64,
    /// Delivery attempts that failed (transport, timeout, non-2xx).
    pub failed_attempts: u64,
    /// Records refused at append time: buffer full, or the record would not render.
    pub dropped: u64,
    pub buffered: usize,
    pub phase: Phase,
}

#[derive(Debug, Default)]
struct Counters {
    appended: AtomicU64,
    delivered: AtomicU64,
    failed_attempts: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Default)]
struct DispatchState {
    buffer: Vec<String>,
    phase: Phase,
}

/// 📸 The head of the buffer, frozen for one delivery attempt.
#[derive(Debug)]
pub(crate) struct Snapshot {
    records: usize,
    payload: String,
}

impl Snapshot {
    pub(crate) fn into_parts(self) -> (usize, String) {
        (self.records, self.payload)
    }
}

/// 🔒 What the dispatcher handle and its worker both need to see.
#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<DispatchState>,
    filter: FieldFilter,
    composer: JsonArrayComposer,
    threshold: usize,
    max_buffered_records: Option<usize>,
    log: bool,
    counters: Counters,
}

impl Shared {
    /// A panic while holding the lock leaves the buffer as it was; keep using it.
    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn log_enabled(&self) -> bool {
        self.log
    }

    /// 🚦 The gate. Flip Idle → Delivering and freeze the current buffer as a snapshot, or
    /// explain why not. `min_records` is 1 for unconditional flushes and the threshold for
    /// threshold-triggered ones.
    pub(crate) fn try_begin(&self, min_records: usize) -> Result<Snapshot, FlushOutcome> {
        let mut state = self.lock();
        if state.phase == Phase::Delivering {
            return Err(FlushOutcome::Busy);
        }
        if state.buffer.is_empty() {
            return Err(FlushOutcome::Empty);
        }
        if state.buffer.len() < min_records {
            return Err(FlushOutcome::BelowThreshold);
        }
        state.phase = Phase::Delivering;
        Ok(Snapshot {
            records: state.buffer.len(),
            payload: self.composer.compose(&state.buffer),
        })
    }

    /// ✅/💀 Settle a delivery: drain the prefix on success, keep everything on failure.
    /// Either way the gate goes back to Idle.
    pub(crate) fn complete(&self, records: usize, sent: Result<()>) -> FlushOutcome {
        let mut state = self.lock();
        state.phase = Phase::Idle;
        match sent {
            Ok(()) => {
                let records = records.min(state.buffer.len());
                state.buffer.drain(..records);
                drop(state);
                self.counters
                    .delivered
                    .fetch_add(records as u64, Ordering::Relaxed);
                FlushOutcome::Delivered { records }
            }
            Err(err) => {
                drop(state);
                self.counters.failed_attempts.fetch_add(1, Ordering::Relaxed);
                FlushOutcome::Failed {
                    records,
                    reason: format!("{err:#}"),
                }
            }
        }
    }

    /// 🔙 Put the gate back without delivering (the worker never got the snapshot).
    fn abandon(&self) {
        self.lock().phase = Phase::Idle;
    }
}

/// 📦 Buffers normalized records and ships them to the collector in batches.
///
/// Must be created inside a tokio runtime; it spawns its worker on construction.
#[derive(Debug)]
pub struct Dispatcher {
    shared: Arc<Shared>,
    tx: Sender<DispatchJob>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl Dispatcher {
    /// 🏗️ Validate the config, spin up the worker, and start the interval clock.
    pub fn new(config: DispatcherConfig, delivery: impl Into<DeliveryBackend>) -> Result<Self> {
        config
            .validate()
            .context("💀 The dispatcher config didn't survive validation")?;
        let filter = FieldFilter::from_config(&config)
            .context("💀 The include/exclude lists didn't make a usable filter")?;
        tokio::runtime::Handle::try_current().context(
            "💀 A dispatcher needs a tokio runtime to put its worker in, and there isn't one here",
        )?;

        let shared = Arc::new(Shared {
            state: Mutex::new(DispatchState::default()),
            filter,
            composer: JsonArrayComposer,
            threshold: config.threshold,
            max_buffered_records: config.max_buffered_records,
            log: config.log,
            counters: Counters::default(),
        });
        let (tx, rx) = async_channel::unbounded();
        let worker = DispatchWorker::new(
            rx,
            Arc::clone(&shared),
            delivery.into(),
            config.interval(),
            config.request_timeout(),
        )
        .start();
        if config.log {
            debug!(
                threshold = config.threshold,
                interval_ms = config.interval_ms,
                "🚀 dispatcher up"
            );
        }
        Ok(Self {
            shared,
            tx,
            worker: Some(worker),
        })
    }

    /// 📡 The usual setup: POST to `config.endpoint`.
    pub fn http(config: DispatcherConfig) -> Result<Self> {
        let endpoint = config
            .endpoint_url()
            .context("💀 The collector endpoint is not a URL we can POST to")?;
        let delivery =
            HttpDelivery::new(endpoint, config.request_timeout())?.with_logging(config.log);
        Self::new(config, delivery)
    }

    /// 📥 Filter, render, buffer. Then, if the threshold is reached and nothing is in
    /// flight, hand the buffer to the worker. Never waits on I/O.
    pub fn append(&self, record: &NormalizedRecord) {
        let rendered = match self.shared.filter.render(record) {
            Ok(rendered) => rendered,
            Err(err) => {
                self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                if self.shared.log {
                    warn!("💀 record dropped, it would not render: {:#}", err);
                }
                return;
            }
        };

        {
            let mut state = self.shared.lock();
            if let Some(cap) = self.shared.max_buffered_records {
                if state.buffer.len() >= cap {
                    drop(state);
                    self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    if self.shared.log {
                        trace!(cap, "🪣 buffer full, record dropped");
                    }
                    return;
                }
            }
            state.buffer.push(rendered);
        }
        self.shared.counters.appended.fetch_add(1, Ordering::Relaxed);
        self.maybe_flush();
    }

    /// 🎯 Threshold reached and Idle → start a delivery in the background. Returns whether
    /// one was started.
    pub fn maybe_flush(&self) -> bool {
        match self.shared.try_begin(self.shared.threshold) {
            Ok(snapshot) => self.submit(snapshot, None).is_ok(),
            Err(_) => false,
        }
    }

    /// ⏳ Threshold reached → deliver now and wait for the result.
    pub async fn dispatch(&self) -> FlushOutcome {
        self.begin_and_wait(self.shared.threshold).await
    }

    /// ⏳ Deliver whatever is buffered, threshold or not, and wait for the result.
    ///
    /// Same gate as everything else: if a delivery is already in flight this returns
    /// [`FlushOutcome::Busy`] rather than queueing a second one.
    pub async fn flush(&self) -> FlushOutcome {
        self.begin_and_wait(1).await
    }

    async fn begin_and_wait(&self, min_records: usize) -> FlushOutcome {
        let snapshot = match self.shared.try_begin(min_records) {
            Ok(snapshot) => snapshot,
            Err(not_started) => return not_started,
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        if let Err(closed) = self.submit(snapshot, Some(reply_tx)) {
            return closed;
        }
        reply_rx.await.unwrap_or(FlushOutcome::Closed)
    }

    fn submit(
        &self,
        snapshot: Snapshot,
        reply: Option<oneshot::Sender<FlushOutcome>>,
    ) -> Result<(), FlushOutcome> {
        self.tx
            .try_send(DispatchJob { snapshot, reply })
            .map_err(|_| {
                self.shared.abandon();
                FlushOutcome::Closed
            })
    }

    pub fn threshold_reached(&self) -> bool {
        self.shared.lock().buffer.len() >= self.shared.threshold
    }

    pub fn buffered(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    pub fn stats(&self) -> DispatchStats {
        let (buffered, phase) = {
            let state = self.shared.lock();
            (state.buffer.len(), state.phase)
        };
        let counters = &self.shared.counters;
        DispatchStats {
            appended: counters.appended.load(Ordering::Relaxed),
            delivered: counters.delivered.load(Ordering::Relaxed),
            failed_attempts: counters.failed_attempts.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
            buffered,
            phase,
        }
    }

    /// 🛑 Stop the timer and the worker. Buffered records are not flushed.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.tx.close();
        if let Some(worker) = self.worker.take() {
            worker.abort();
            if self.shared.log {
                debug!("🛑 dispatcher stopped with {} record(s) still buffered", self.buffered());
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryDelivery;
    use crate::config::ConfigError;
    use crate::schema::UpdateKind;
    use std::time::Duration;

    const A_DAY_MS: u64 = 86_400_000;

    fn config(threshold: usize) -> DispatcherConfig {
        DispatcherConfig {
            threshold,
            interval_ms: A_DAY_MS,
            request_timeout_ms: A_DAY_MS / 2,
            ..DispatcherConfig::new("http://collector.local/ingest")
        }
    }

    fn record(from: i64) -> NormalizedRecord {
        NormalizedRecord {
            update_type: UpdateKind::Message,
            to: 1,
            from,
            ..NormalizedRecord::default()
        }
    }

    /// 🧪 With the clock paused, sleeping returns only once every other task is parked,
    /// i.e. the worker has done whatever it can do right now.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn froms(body: &str) -> Vec<i64> {
        let parsed: Vec<serde_json::Value> =
            serde_json::from_str(body).expect("💀 a delivered body should be a JSON array");
        parsed.iter().filter_map(|r| r["from"].as_i64()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_failed_batch_waits_for_its_second_chance() -> Result<()> {
        let collector = InMemoryDelivery::new();
        collector.fail_next(1);
        let dispatcher = Dispatcher::new(config(2), collector.clone())?;

        dispatcher.append(&record(10));
        settle().await;
        assert_eq!(collector.attempts(), 0);

        dispatcher.append(&record(20));
        settle().await;
        assert_eq!(collector.attempts(), 1);
        assert!(collector.received().await.is_empty());
        assert_eq!(dispatcher.buffered(), 2);
        assert_eq!(dispatcher.phase(), Phase::Idle);

        assert_eq!(dispatcher.dispatch().await, FlushOutcome::Delivered { records: 2 });
        assert_eq!(dispatcher.buffered(), 0);

        let received = collector.received().await;
        assert_eq!(received.len(), 1);
        assert_eq!(froms(&received[0]), vec![10, 20]);

        let stats = dispatcher.stats();
        assert_eq!(stats.appended, 2);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.failed_attempts, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_late_arrivals_wait_for_the_next_bus() -> Result<()> {
        let collector = InMemoryDelivery::gated();
        let dispatcher = Dispatcher::new(config(2), collector.clone())?;

        dispatcher.append(&record(1));
        dispatcher.append(&record(2));
        settle().await;
        assert_eq!(dispatcher.phase(), Phase::Delivering);

        // 🧪 over threshold again, but the gate is shut
        dispatcher.append(&record(3));
        dispatcher.append(&record(4));
        assert!(!dispatcher.maybe_flush());
        assert_eq!(dispatcher.flush().await, FlushOutcome::Busy);
        settle().await;
        assert_eq!(collector.attempts(), 1);

        collector.release(1);
        settle().await;
        assert_eq!(dispatcher.phase(), Phase::Idle);
        assert_eq!(dispatcher.buffered(), 2);

        collector.release(1);
        assert_eq!(dispatcher.flush().await, FlushOutcome::Delivered { records: 2 });

        let received = collector.received().await;
        assert_eq!(received.len(), 2);
        assert_eq!(froms(&received[0]), vec![1, 2]);
        assert_eq!(froms(&received[1]), vec![3, 4]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_the_clock_flushes_what_the_threshold_would_not() -> Result<()> {
        let collector = InMemoryDelivery::new();
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                interval_ms: 1_000,
                ..config(100)
            },
            collector.clone(),
        )?;

        dispatcher.append(&record(7));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(collector.received().await.is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        let received = collector.received().await;
        assert_eq!(received.len(), 1);
        assert_eq!(froms(&received[0]), vec![7]);
        assert_eq!(dispatcher.buffered(), 0);

        // 🧪 an empty tick is a no-op, not an empty POST
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(collector.attempts(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_everyone_flushes_at_once_and_one_wins() -> Result<()> {
        let collector = InMemoryDelivery::new();
        let dispatcher = Dispatcher::new(config(100), collector.clone())?;
        dispatcher.append(&record(1));
        dispatcher.append(&record(2));

        let outcomes = futures::future::join_all((0..8).map(|_| dispatcher.flush())).await;
        let winners = outcomes
            .iter()
            .filter(|outcome| **outcome == FlushOutcome::Delivered { records: 2 })
            .count();
        assert_eq!(winners, 1);
        assert!(
            outcomes
                .iter()
                .all(|outcome| matches!(
                    outcome,
                    FlushOutcome::Delivered { .. } | FlushOutcome::Busy | FlushOutcome::Empty
                )),
            "{outcomes:?}"
        );
        assert_eq!(collector.attempts(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_hung_collector_times_out_and_lets_go() -> Result<()> {
        let collector = InMemoryDelivery::gated();
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                request_timeout_ms: 100,
                ..config(1)
            },
            collector.clone(),
        )?;

        dispatcher.append(&record(5));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(dispatcher.phase(), Phase::Idle);
        assert_eq!(dispatcher.buffered(), 1);
        assert_eq!(dispatcher.stats().failed_attempts, 1);

        collector.release(1);
        assert_eq!(dispatcher.flush().await, FlushOutcome::Delivered { records: 1 });
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_only_the_allowed_fields_get_on_the_plane() -> Result<()> {
        let collector = InMemoryDelivery::new();
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                include: Some(vec!["type".into(), "from".into()]),
                ..config(1)
            },
            collector.clone(),
        )?;

        dispatcher.append(&record(3));
        settle().await;
        let received = collector.received().await;
        let parsed: serde_json::Value = serde_json::from_str(&received[0])?;
        let only = parsed[0]
            .as_object()
            .context("💀 delivered record should be an object")?;
        let mut keys: Vec<&str> = only.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["from", "type"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_full_buffer_turns_the_newcomer_away() -> Result<()> {
        let collector = InMemoryDelivery::new();
        let dispatcher = Dispatcher::new(
            DispatcherConfig {
                max_buffered_records: Some(2),
                ..config(100)
            },
            collector.clone(),
        )?;

        for from in [1, 2, 3] {
            dispatcher.append(&record(from));
        }
        let stats = dispatcher.stats();
        assert_eq!(stats.appended, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.buffered, 2);

        assert_eq!(dispatcher.flush().await, FlushOutcome::Delivered { records: 2 });
        assert_eq!(froms(&collector.received().await[0]), vec![1, 2]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_there_is_nothing_to_say() -> Result<()> {
        let dispatcher = Dispatcher::new(config(2), InMemoryDelivery::new())?;
        assert_eq!(dispatcher.flush().await, FlushOutcome::Empty);
        dispatcher.append(&record(1));
        assert!(!dispatcher.threshold_reached());
        assert_eq!(dispatcher.dispatch().await, FlushOutcome::BelowThreshold);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_bad_config_never_gets_a_worker() {
        let err = Dispatcher::new(
            DispatcherConfig {
                include: Some(vec!["type".into()]),
                exclude: Some(vec!["payload".into()]),
                ..config(1)
            },
            InMemoryDelivery::new(),
        )
        .expect_err("💀 include + exclude must be refused");
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::IncludeAndExclude)
        );
    }

    #[test]
    fn the_one_where_there_is_no_runtime_to_run_in() {
        assert!(Dispatcher::new(config(1), InMemoryDelivery::new()).is_err());
    }

    #[tokio::test]
    async fn the_one_where_the_real_collector_fails_once_then_takes_everything() -> Result<()> {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dispatcher = Dispatcher::http(DispatcherConfig {
            endpoint: server.uri(),
            request_timeout_ms: 5_000,
            ..config(2)
        })?;

        dispatcher.append(&record(1));
        dispatcher.append(&record(2));
        for _ in 0..500 {
            if dispatcher.stats().failed_attempts == 1 && dispatcher.phase() == Phase::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(dispatcher.stats().failed_attempts, 1);
        assert_eq!(dispatcher.buffered(), 2);

        assert_eq!(dispatcher.dispatch().await, FlushOutcome::Delivered { records: 2 });
        let requests = server
            .received_requests()
            .await
            .context("💀 wiremock should be recording requests")?;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body, requests[1].body);
        let body = std::str::from_utf8(&requests[1].body)?;
        assert_eq!(froms(body), vec![1, 2]);
        Ok(())
    }
}
