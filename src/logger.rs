use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Receives human-readable session events, eg to show them in a log panel.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Session event text, sent to `tracing` until a sink is installed.
#[derive(Clone, Default)]
pub(crate) struct EventLog {
    sink: Arc<RwLock<Option<LogSink>>>,
}

impl EventLog {
    pub(crate) fn set_sink(&self, sink: LogSink) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub(crate) fn log(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();

        // don't hold the lock while the sink runs, it may log back into us
        let sink = self.sink.read().unwrap_or_else(PoisonError::into_inner).clone();

        match sink {
            Some(sink) => sink(msg),
            None => tracing::info!("{msg}"),
        }
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let custom = self.sink.read().map(|s| s.is_some()).unwrap_or(false);
        f.debug_struct("EventLog").field("custom_sink", &custom).finish()
    }
}
