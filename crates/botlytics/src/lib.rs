//! 📡 botlytics: Telegram bot updates in, flat analytics records out, shipped in batches.
//!
//! 🧠 Knowledge graph:
//! - [`update`]: the raw update (typed view + verbatim JSON) and the bot's identity.
//! - [`normalizer`]: update → [`NormalizedRecord`], or nothing.
//! - [`field_filter`]: allow-list / deny-list, applied at render time.
//! - [`dispatcher`]: buffer, gate, threshold + interval triggers, one delivery at a time.
//! - [`backends`]: how a batch leaves the process (HTTP, or a Vec for tests).
//! - [`run`]/[`pump`]: the whole pipeline over newline-delimited update JSON, for hosts that
//!   just want to point it at a stream.
//!
//! 🦆 The duck counts every update. The duck has never been wrong about a count.

pub mod app_config;
pub mod backends;
pub(crate) mod composers;
pub mod config;
pub mod dispatcher;
pub mod field_filter;
pub mod normalizer;
pub mod schema;
pub mod update;
pub(crate) mod workers;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

pub use app_config::{AppConfig, load_config};
pub use backends::{Delivery, DeliveryBackend, HttpDelivery, InMemoryDelivery};
pub use config::{ConfigError, DispatcherConfig};
pub use dispatcher::{DispatchStats, Dispatcher, FlushOutcome, Phase};
pub use field_filter::FieldFilter;
pub use normalizer::{Normalizer, NormalizerStats, normalize};
pub use schema::{
    ChatKind, FIELD_NAMES, MemberStatusKind, MessageKind, NormalizedRecord, UpdateKind,
};
pub use update::{BotIdentity, IncomingUpdate, Update};

/// 📊 What a [`pump`] saw on its way through the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Non-blank input lines.
    pub lines: u64,
    /// Lines that were not an update at all.
    pub malformed: u64,
    pub normalizer: NormalizerStats,
    pub dispatcher: DispatchStats,
}

/// 🚀 Build the normalizer and an HTTP dispatcher from config, then [`pump`] `input`.
pub async fn run<R>(app_config: AppConfig, input: R) -> Result<RunSummary>
where
    R: AsyncBufRead + Unpin,
{
    let normalizer = Normalizer::new(app_config.bot)
        .context("💀 The bot identity in the config can't sign records")?;
    let dispatcher = Dispatcher::http(app_config.dispatcher)
        .context("💀 Couldn't stand up the dispatcher")?;
    let summary = pump(&normalizer, &dispatcher, input).await;
    dispatcher.shutdown();
    summary
}

/// 🔄 Read newline-delimited update JSON, normalize, append, and flush at the end.
///
/// A malformed line is logged and skipped. A final flush that fails is an error: the
/// records are still in memory, and they are about to not be.
pub async fn pump<R>(normalizer: &Normalizer, dispatcher: &Dispatcher, input: R) -> Result<RunSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = RunSummary::default();
    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("💀 Reading the update stream failed partway through")?
    {
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;
        match IncomingUpdate::from_json(&line) {
            Ok(incoming) => {
                if let Some(record) = normalizer.normalize(&incoming) {
                    dispatcher.append(&record);
                }
            }
            Err(err) => {
                summary.malformed += 1;
                warn!(line = summary.lines, "⚠️ skipping input line: {:#}", err);
            }
        }
    }

    drain(dispatcher).await?;
    summary.normalizer = normalizer.stats();
    summary.dispatcher = dispatcher.stats();
    info!(
        lines = summary.lines,
        delivered = summary.dispatcher.delivered,
        dropped = summary.normalizer.dropped,
        "✅ input exhausted, buffer drained"
    );
    Ok(summary)
}

/// 🚰 Flush until the buffer is empty, waiting out any delivery already in flight.
async fn drain(dispatcher: &Dispatcher) -> Result<()> {
    loop {
        match dispatcher.flush().await {
            FlushOutcome::Delivered { .. } => continue,
            FlushOutcome::Empty => return Ok(()),
            FlushOutcome::Busy => tokio::time::sleep(Duration::from_millis(25)).await,
            FlushOutcome::Failed { records, reason } => anyhow::bail!(
                "💀 Final flush failed; {records} record(s) were never delivered: {reason}"
            ),
            FlushOutcome::BelowThreshold | FlushOutcome::Closed => {
                anyhow::bail!("💀 The dispatcher stopped before the buffer could be drained")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{"update_id":1,"message":{"message_id":1,"date":1,"from":{"id":7,"first_name":"Ann"},"chat":{"id":7,"type":"private"},"text":"hi"}}

this is not json
{"update_id":2}
{"update_id":3,"inline_query":{"id":"q","from":{"id":8,"first_name":"Bo"},"query":"cats","offset":""}}
"#;

    #[tokio::test]
    async fn the_one_where_the_whole_stream_makes_it_to_the_collector() -> Result<()> {
        let normalizer = Normalizer::new(BotIdentity {
            id: 99,
            first_name: "Counter".into(),
            ..BotIdentity::default()
        })?;
        let collector = InMemoryDelivery::new();
        let dispatcher = Dispatcher::new(
            DispatcherConfig::new("http://collector.local/ingest"),
            collector.clone(),
        )?;

        let summary = pump(&normalizer, &dispatcher, INPUT.as_bytes()).await?;

        assert_eq!(summary.lines, 4);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.normalizer.normalized, 2);
        assert_eq!(summary.normalizer.dropped, 1);
        assert_eq!(summary.dispatcher.delivered, 2);
        assert_eq!(summary.dispatcher.buffered, 0);

        let received = collector.received().await;
        assert_eq!(received.len(), 1);
        let batch: Vec<serde_json::Value> = serde_json::from_str(&received[0])?;
        assert_eq!(batch[0]["from"], 7);
        assert_eq!(batch[1]["from"], 8);
        assert_eq!(batch[1]["type"], UpdateKind::InlineQuery as u8);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_last_flush_fails_and_we_admit_it() -> Result<()> {
        let normalizer = Normalizer::new(BotIdentity {
            id: 99,
            ..BotIdentity::default()
        })?;
        let collector = InMemoryDelivery::new();
        collector.fail_next(1);
        let dispatcher = Dispatcher::new(
            DispatcherConfig::new("http://collector.local/ingest"),
            collector.clone(),
        )?;

        let err = pump(&normalizer, &dispatcher, INPUT.as_bytes())
            .await
            .expect_err("💀 an undelivered final batch must surface as an error");
        assert!(format!("{err:#}").contains("2 record(s)"));
        assert_eq!(dispatcher.buffered(), 2);
        Ok(())
    }
}
