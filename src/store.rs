//! The one piece of shared mutable state: which [`Snapshot`] is current.
//!
//! Readers load the current pointer without locking and keep that exact
//! snapshot for as long as they hold the `Arc`. A rebuild assembles a whole
//! new snapshot off to the side and swaps the pointer in one step.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{
    collection::{Builder, Snapshot},
    error::BuildError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No build has succeeded yet.
    Empty,
    Ready,
}

#[derive(Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
    /// Serializes rebuilds. Readers never touch it.
    rebuilding: Mutex<()>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn state(&self) -> StoreState {
        if self.current.load().is_some() {
            StoreState::Ready
        } else {
            StoreState::Empty
        }
    }

    /// Makes `snapshot` current. Holders of the previous one keep it.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Some(snapshot.clone()));
        snapshot
    }

    /// Runs a build and swaps its result in. Rebuilds never overlap; a failed
    /// build leaves the current snapshot untouched.
    pub async fn rebuild(&self, builder: &Builder) -> Result<Arc<Snapshot>, BuildError> {
        let _guard = self.rebuilding.lock().await;
        match builder.build().await {
            Ok(snapshot) => {
                let snapshot = self.replace(snapshot);
                info!("snapshot replaced: {} stories", snapshot.len());
                Ok(snapshot)
            }
            Err(err) => {
                error!("rebuild failed, keeping previous snapshot: {err}");
                Err(err)
            }
        }
    }
}
