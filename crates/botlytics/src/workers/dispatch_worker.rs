//! 🎬 *[a channel waits for snapshots. a clock ticks beside it. one of them always wins.]*
//!
//! 📡 The DispatchWorker owns the delivery backend and the interval timer. It wakes for one
//! of two reasons:
//! - a [`DispatchJob`] arrives (threshold crossed, or someone called `flush`), with the
//!   snapshot already taken and the gate already shut;
//! - the timer ticks, and it tries to take a snapshot itself through the same gate.
//!
//! Either way it delivers, reports, and goes back to waiting. While it is delivering it is
//! not ticking, and the gate says Delivering to everyone else. 🦆

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_channel::Receiver;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, info, warn};

use super::Worker;
use crate::backends::{Delivery, DeliveryBackend};
use crate::dispatcher::{FlushOutcome, Shared, Snapshot};

/// 📨 One delivery to make, and optionally someone waiting to hear how it went.
#[derive(Debug)]
pub(crate) struct DispatchJob {
    pub(crate) snapshot: Snapshot,
    pub(crate) reply: Option<oneshot::Sender<FlushOutcome>>,
}

#[derive(Debug)]
pub(crate) struct DispatchWorker {
    rx: Receiver<DispatchJob>,
    shared: Arc<Shared>,
    delivery: DeliveryBackend,
    interval: Duration,
    request_timeout: Duration,
}

impl DispatchWorker {
    pub(crate) fn new(
        rx: Receiver<DispatchJob>,
        shared: Arc<Shared>,
        delivery: DeliveryBackend,
        interval: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            rx,
            shared,
            delivery,
            interval,
            request_timeout,
        }
    }

    /// 📡 Send one snapshot, bounded by the request timeout, then settle the gate.
    async fn deliver(&mut self, snapshot: Snapshot) -> FlushOutcome {
        let (records, payload) = snapshot.into_parts();
        let log = self.shared.log_enabled();
        if log {
            info!(
                records,
                "📡 dispatching {} record{}",
                records,
                if records == 1 { "" } else { "s" }
            );
        }

        let sent = match timeout(self.request_timeout, self.delivery.send(payload))
            .await
        {
            Ok(sent) => sent,
            Err(_) => Err(anyhow!(
                "💀 the collector did not answer within {:?}",
                self.request_timeout
            )),
        };

        if let Err(err) = &sent {
            if log {
                warn!(
                    records,
                    "💀 delivery failed, keeping {} record(s) for the next attempt: {:#}",
                    records,
                    err
                );
            }
        }
        self.shared.complete(records, sent)
    }
}

impl Worker for DispatchWorker {
    fn start(mut self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            if self.shared.log_enabled() {
                debug!("📥 DispatchWorker started, ticking every {:?}", self.interval);
            }
            // ⏱️ first tick one full period from now, not immediately
            let first_tick = Instant::now()
                .checked_add(self.interval)
                .unwrap_or_else(Instant::now);
            let mut ticker = interval_at(first_tick, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    job = self.rx.recv() => match job {
                        Ok(DispatchJob { snapshot, reply }) => {
                            let outcome = self.deliver(snapshot).await;
                            if let Some(reply) = reply {
                                // 🤷 the caller may have stopped waiting; that's their call
                                let _ = reply.send(outcome);
                            }
                        }
                        Err(_) => {
                            if self.shared.log_enabled() {
                                debug!("🏁 DispatchWorker: channel closed. Shutting down.");
                            }
                            self.delivery
                                .close()
                                .await
                                .context("💀 DispatchWorker failed to close its delivery")?;
                            return Ok(());
                        }
                    },
                    _ = ticker.tick() => {
                        // Empty or already delivering: nothing to do until the next tick
                        if let Ok(snapshot) = self.shared.try_begin(1) {
                            self.deliver(snapshot).await;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryDelivery;
    use crate::config::DispatcherConfig;
    use crate::dispatcher::Dispatcher;
    use crate::schema::{NormalizedRecord, UpdateKind};
    use crate::test_support::capture_logs;

    fn record(from: i64) -> NormalizedRecord {
        NormalizedRecord {
            update_type: UpdateKind::Message,
            to: 1,
            from,
            ..NormalizedRecord::default()
        }
    }

    /// 🧪 One delivery of two records, one failed delivery of one, then one record turned
    /// away by a full buffer. Returns everything that got logged along the way.
    async fn deliver_fail_overflow(log: bool) -> Result<String> {
        let (transcript, _guard) = capture_logs();

        let collector = InMemoryDelivery::new();
        let config = DispatcherConfig {
            log,
            interval_ms: 86_400_000,
            max_buffered_records: Some(2),
            ..DispatcherConfig::new("http://collector.local/ingest")
        };
        let dispatcher = Dispatcher::new(config, collector.clone())?;

        dispatcher.append(&record(1));
        dispatcher.append(&record(2));
        assert_eq!(dispatcher.flush().await, FlushOutcome::Delivered { records: 2 });

        collector.fail_next(1);
        dispatcher.append(&record(3));
        assert!(matches!(
            dispatcher.flush().await,
            FlushOutcome::Failed { records: 1, .. }
        ));

        dispatcher.append(&record(4));
        dispatcher.append(&record(5));
        assert_eq!(dispatcher.stats().dropped, 1);

        dispatcher.shutdown();
        Ok(transcript.text())
    }

    #[tokio::test]
    async fn the_one_where_every_attempt_and_failure_gets_a_line() -> Result<()> {
        let text = deliver_fail_overflow(true).await?;
        assert!(text.contains("dispatching 2 records"), "{text}");
        assert!(text.contains("dispatching 1 record"), "{text}");
        assert!(text.contains("delivery failed, keeping 1 record(s)"), "{text}");
        assert!(text.contains("buffer full"), "{text}");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_log_false_means_not_a_peep() -> Result<()> {
        let text = deliver_fail_overflow(false).await?;
        assert!(!text.contains("dispatching"), "{text}");
        assert!(!text.contains("delivery failed"), "{text}");
        assert!(text.is_empty(), "{text}");
        Ok(())
    }
}
