//! 🧵 Workers: the part that actually waits on the network so nobody else has to.
//!
//! There is exactly one kind today, the [`DispatchWorker`], and exactly one of it per
//! dispatcher. That is what "at most one delivery in flight" looks like in code.

use anyhow::Result;
use tokio::task::JoinHandle;

mod dispatch_worker;
pub(crate) use dispatch_worker::{DispatchJob, DispatchWorker};

/// 🏗️ A background worker, that does work. duh.
pub(crate) trait Worker {
    /// 🚀 Start the worker. Returns a JoinHandle because we trust
    /// but verify. Mostly verify.
    fn start(self) -> JoinHandle<Result<()>>;
}
