//! 🧪 Shared test helpers.

use std::io;
use std::sync::{Arc, Mutex};

use tracing::subscriber::DefaultGuard;

/// 📝 Everything a captured subscriber wrote, for reading back after the fact.
#[derive(Clone, Default)]
pub(crate) struct Transcript(Arc<Mutex<Vec<u8>>>);

impl io::Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("💀 transcript lock poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transcript {
    pub(crate) fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("💀 transcript lock poisoned")).into_owned()
    }
}

/// 🎙️ Install a TRACE-level subscriber for the current thread, writing into a [`Transcript`].
///
/// Thread-local: tasks spawned on a current-thread test runtime log through it too.
pub(crate) fn capture_logs() -> (Transcript, DefaultGuard) {
    let transcript = Transcript::default();
    let writer = transcript.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    (transcript, tracing::subscriber::set_default(subscriber))
}
