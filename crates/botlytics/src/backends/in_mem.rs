//! 📦 The in-memory delivery: a collector that lives in a Vec.
//!
//! Built for tests and for dry runs of the CLI. It keeps every body it accepts behind an
//! `Arc<Mutex<...>>` so the caller can look after handing the delivery to the dispatcher,
//! and it can be told to fail, or to hang until released, so the retry and in-flight paths
//! can be exercised without a network.
//!
//! ⚠️ NOT for production. If you're deploying this to prod, please also deploy a therapist.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use crate::backends::Delivery;

/// 📦 A delivery that never forgets. Clone it, hand one clone to the dispatcher, and
/// keep the other to look inside.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDelivery {
    /// 🔒 Every accepted body, in arrival order.
    received: Arc<Mutex<Vec<String>>>,
    /// How many `send` calls have started, accepted or not.
    attempts: Arc<AtomicUsize>,
    /// How many of the upcoming `send` calls should fail.
    failures_queued: Arc<AtomicUsize>,
    /// 🚧 When set, each `send` waits for one permit before doing anything.
    gate: Option<Arc<Semaphore>>,
}

impl InMemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// 🚧 A delivery whose every `send` blocks until [`release`](Self::release) is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// 💥 Make the next `count` sends fail (after passing the gate, if any).
    pub fn fail_next(&self, count: usize) {
        self.failures_queued.fetch_add(count, Ordering::SeqCst);
    }

    /// 🚦 Let `count` gated sends through. A no-op on an ungated delivery.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// 📋 Every accepted body so far.
    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    fn take_failure(&self) -> bool {
        self.failures_queued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |queued| {
                queued.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    async fn send(&mut self, payload: String) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .context("💀 the in-memory gate was closed while a send waited on it")?
                .forget();
        }
        if self.take_failure() {
            anyhow::bail!("💀 in-memory delivery failed on request (scripted)");
        }
        // 🔒 The Mutex is load-bearing. Tests read while the worker writes.
        self.received.lock().await.push(payload);
        Ok(())
    }

    /// 🗑️ We live in RAM. There is nothing to close.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
