use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, warn};

pub enum WatchEvent {
    /// Something under a watched path changed; reload the source.
    Changed,
    Error(String),
}

pub struct SourceWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

impl SourceWatcher {
    /// Watch every path recursively. Bursts of events inside `debounce` are
    /// collapsed into a single [`WatchEvent::Changed`].
    pub fn new(
        paths: &[PathBuf],
        debounce: Duration,
    ) -> anyhow::Result<(Self, mpsc::Receiver<WatchEvent>)> {
        let (tx, rx) = mpsc::channel();

        let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| {
            let event = match res {
                Ok(events) => {
                    debug!(events = events.len(), "source changed");
                    WatchEvent::Changed
                }
                Err(e) => WatchEvent::Error(e.to_string()),
            };
            let _ = tx.send(event);
        })?;

        for path in paths {
            if !path.exists() {
                warn!(path = %path.display(), "not watching missing path");
                continue;
            }
            debouncer.watcher().watch(path, RecursiveMode::Recursive)?;
        }

        Ok((Self { _debouncer: debouncer }, rx))
    }
}
