//! A polling file watcher: good enough to drive live reload without any
//! platform notification API.

use std::{collections::HashMap, path::PathBuf, time::Duration, time::SystemTime};

use tokio::{sync::mpsc::Sender, time::interval};
use tracing::{debug, warn};

use crate::{
    error::{ContextExt, PublisherErr},
    fs::get_files_deep,
    monitor::{ChangeEvent, ChangeKind},
};

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct PollWatcher {
    roots: Vec<PathBuf>,
    period: Duration,
    seen: HashMap<PathBuf, SystemTime>,
}

impl PollWatcher {
    /// Records the current state of `roots`; only later changes are reported.
    pub async fn new(roots: Vec<PathBuf>, period: Duration) -> Result<Self, PublisherErr> {
        let mut watcher = Self {
            roots,
            period,
            seen: HashMap::new(),
        };
        watcher.seen = watcher.current().await?;
        Ok(watcher)
    }

    async fn current(&self) -> Result<HashMap<PathBuf, SystemTime>, PublisherErr> {
        let mut files = HashMap::new();
        for root in self.roots.iter() {
            files.extend(
                get_files_deep(root)
                    .await
                    .with_context(|| format!("watching {}", root.display()))?,
            );
        }
        Ok(files)
    }

    /// Compares the tree against the last poll, sorted by path.
    pub async fn poll(&mut self) -> Result<Vec<ChangeEvent>, PublisherErr> {
        let current = self.current().await?;
        let mut events = Vec::new();

        for (path, modified) in current.iter() {
            match self.seen.get(path) {
                None => events.push(ChangeEvent::new(path.clone(), ChangeKind::Created)),
                Some(previous) if previous != modified => {
                    events.push(ChangeEvent::new(path.clone(), ChangeKind::Modified))
                }
                Some(_) => {}
            }
        }
        for path in self.seen.keys() {
            if !current.contains_key(path) {
                events.push(ChangeEvent::new(path.clone(), ChangeKind::Removed));
            }
        }

        events.sort_by(|a, b| a.path.cmp(&b.path));
        self.seen = current;
        Ok(events)
    }

    /// Polls until the receiving side is gone. A failed poll is logged and
    /// retried on the next tick; nothing is reported for it.
    pub async fn run(mut self, events: Sender<ChangeEvent>) {
        let mut ticker = interval(self.period.max(MIN_PERIOD));
        loop {
            ticker.tick().await;
            let changes = match self.poll().await {
                Ok(changes) => changes,
                Err(err) => {
                    warn!("poll failed, retrying: {err}");
                    continue;
                }
            };
            for event in changes {
                debug!("{:?} {}", event.kind, event.path.display());
                if events.send(event).await.is_err() {
                    debug!("watcher stopped");
                    return;
                }
            }
        }
    }
}
