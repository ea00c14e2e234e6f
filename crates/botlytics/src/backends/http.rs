//! 📡 The HTTP delivery: one POST per batch, `application/json`, 2xx or it didn't happen.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};

use crate::backends::Delivery;

/// 📡 POSTs composed batches to the collector.
///
/// Internally holds:
/// - `client`: the HTTP muscle 💪, reused across requests (connection pool included)
/// - `endpoint`: already parsed and validated by the config layer
/// - `log`: whether the per-request lines get written at all
///
/// 🔄 No retries in here. A failed POST is reported and forgotten; the records are still
/// sitting in the dispatcher's buffer, waiting for the next trigger.
#[derive(Debug)]
pub struct HttpDelivery {
    client: reqwest::Client,
    endpoint: Url,
    log: bool,
}

impl HttpDelivery {
    /// 🚀 Build the client. The request timeout covers the whole exchange; the connect
    /// timeout is capped at 10s (or the request timeout, if that's shorter).
    pub fn new(endpoint: Url, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout.min(Duration::from_secs(10)))
            .timeout(request_timeout)
            .build()
            .context("💀 The HTTP client refused to be born. We asked reqwest for a Client and it said 'no'. Probably TLS. It's always TLS.")?;
        Ok(Self {
            client,
            endpoint,
            log: true,
        })
    }

    /// 🤫 `false` silences the per-request lines, to match a dispatcher built with `log = false`.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Delivery for HttpDelivery {
    async fn send(&mut self, payload: String) -> Result<()> {
        if self.log {
            debug!(
                "📡 POSTing {} bytes to {}",
                payload.len(),
                self.endpoint
            );
        }
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .context("💀 The batch never reached the collector. We launched it into the network and the network was not vibing with it.")?;

        let status = response.status();
        if !status.is_success() {
            // 💀 A response, just not a good one. The body usually says why.
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 The collector answered {}, which is not a yes. It said: '{}'",
                status,
                body
            );
        }
        if self.log {
            trace!("🚀 batch accepted with {}", status);
        }
        Ok(())
    }

    /// 🗑️ Nothing to flush. The client drops; the pool says goodbye.
    async fn close(&mut self) -> Result<()> {
        if self.log {
            debug!("🗑️ HTTP delivery closing");
        }
        Ok(())
    }
}
