//! 🔌 Backends: where the batch actually leaves the process.
//!
//! 🚰 The dispatcher decides *when* and *what*. A backend only knows *how*: POST it over
//! HTTP, or stash it in a Vec for a test to look at later.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use anyhow::Result;
use async_trait::async_trait;

pub mod http;
pub mod in_mem;

pub use http::HttpDelivery;
pub use in_mem::InMemoryDelivery;

/// 🕳️ Sends a fully composed batch body. Pure I/O, zero logic.
///
/// # Contract 📜
/// - `send` gets the JSON array body and delivers it, or returns an error. Any error
///   (transport, non-2xx, whatever) means "the collector does not have these records".
/// - `send` does not retry. The dispatcher keeps the records and the next trigger retries.
/// - `close` releases whatever the backend holds. It does not flush; there is nothing here
///   to flush.
///
/// # Knowledge Graph 🧠
/// - Pattern: trait → concrete impls (HttpDelivery, InMemoryDelivery) → DeliveryBackend enum
/// - The dispatch worker owns exactly one backend and calls it one batch at a time.
#[async_trait]
pub trait Delivery: std::fmt::Debug + Send {
    /// 📡 Deliver one JSON array body.
    async fn send(&mut self, payload: String) -> Result<()>;
    /// 🗑️ Release resources.
    async fn close(&mut self) -> Result<()>;
}

/// 🎭 The many faces of a Delivery.
///
/// The enum dispatches to the inner concrete type, so the worker never needs to know
/// whether the batch went over the wire or into a test's pocket.
#[derive(Debug)]
pub enum DeliveryBackend {
    Http(HttpDelivery),
    InMemory(InMemoryDelivery),
}

#[async_trait]
impl Delivery for DeliveryBackend {
    async fn send(&mut self, payload: String) -> Result<()> {
        match self {
            DeliveryBackend::Http(delivery) => delivery.send(payload).await,
            DeliveryBackend::InMemory(delivery) => delivery.send(payload).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            DeliveryBackend::Http(delivery) => delivery.close().await,
            DeliveryBackend::InMemory(delivery) => delivery.close().await,
        }
    }
}

impl From<HttpDelivery> for DeliveryBackend {
    fn from(delivery: HttpDelivery) -> Self {
        DeliveryBackend::Http(delivery)
    }
}

impl From<InMemoryDelivery> for DeliveryBackend {
    fn from(delivery: InMemoryDelivery) -> Self {
        DeliveryBackend::InMemory(delivery)
    }
}
