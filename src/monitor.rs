//! Live reload: turns file change notifications into template recompiles and
//! snapshot rebuilds.
//!
//! Events are handled one at a time on a single task, so a rebuild always
//! finishes (or fails and is logged) before the next event is looked at.
//! There is no debouncing; a burst of events means a burst of rebuilds.

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use crate::{
    collection::{Builder, Snapshot},
    error::PublisherErr,
    store::SnapshotStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: PathBuf, kind: ChangeKind) -> Self {
        Self { path, kind }
    }
}

/// The collaborators that react to reloads.
pub trait ReloadHooks {
    fn recompile_templates(&self) -> impl Future<Output = Result<(), PublisherErr>>;

    /// Called after a rebuild made `snapshot` current.
    fn snapshot_replaced(
        &self,
        _snapshot: Arc<Snapshot>,
    ) -> impl Future<Output = Result<(), PublisherErr>> {
        async { Ok(()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Templates,
    Stories,
    Ignored,
}

#[derive(Debug)]
pub enum Outcome {
    TemplatesRecompiled,
    TemplatesFailed,
    SnapshotReplaced(Arc<Snapshot>),
    RebuildFailed,
    Ignored,
}

pub struct ChangeMonitor<H> {
    templates_dir: PathBuf,
    builder: Arc<Builder>,
    store: Arc<SnapshotStore>,
    hooks: H,
}

impl<H: ReloadHooks> ChangeMonitor<H> {
    pub fn new(
        templates_dir: PathBuf,
        builder: Arc<Builder>,
        store: Arc<SnapshotStore>,
        hooks: H,
    ) -> Self {
        Self {
            templates_dir,
            builder,
            store,
            hooks,
        }
    }

    pub fn classify(&self, path: &Path) -> Target {
        if path.starts_with(&self.templates_dir) {
            Target::Templates
        } else if path.starts_with(&self.builder.config().stories_dir) {
            Target::Stories
        } else {
            Target::Ignored
        }
    }

    pub async fn handle(&self, event: &ChangeEvent) -> Outcome {
        match self.classify(&event.path) {
            Target::Templates => {
                info!("template changed: {}", event.path.display());
                match self.hooks.recompile_templates().await {
                    Ok(()) => Outcome::TemplatesRecompiled,
                    Err(err) => {
                        error!("recompiling templates failed: {err}");
                        Outcome::TemplatesFailed
                    }
                }
            }
            Target::Stories => {
                info!("story {:?}: {}", event.kind, event.path.display());
                match self.store.rebuild(&self.builder).await {
                    Ok(snapshot) => {
                        if let Err(err) = self.hooks.snapshot_replaced(snapshot.clone()).await {
                            error!("reacting to new snapshot failed: {err}");
                        }
                        Outcome::SnapshotReplaced(snapshot)
                    }
                    Err(_) => Outcome::RebuildFailed,
                }
            }
            Target::Ignored => {
                debug!("ignoring change: {}", event.path.display());
                Outcome::Ignored
            }
        }
    }

    /// Handles events in arrival order until the sending side is dropped.
    pub async fn run(&self, mut events: Receiver<ChangeEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(&event).await;
        }
        debug!("change monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::mpsc;

    use super::*;
    use crate::{collection::tests::write_story, config::StoriesConfig};

    #[derive(Default)]
    struct Counting {
        recompiles: AtomicUsize,
        replaced: AtomicUsize,
        fail_templates: bool,
    }

    impl ReloadHooks for Arc<Counting> {
        async fn recompile_templates(&self) -> Result<(), PublisherErr> {
            self.recompiles.fetch_add(1, Ordering::SeqCst);
            if self.fail_templates {
                return Err("broken template".into());
            }
            Ok(())
        }

        async fn snapshot_replaced(&self, _snapshot: Arc<Snapshot>) -> Result<(), PublisherErr> {
            self.replaced.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        stories: PathBuf,
        templates: PathBuf,
        store: Arc<SnapshotStore>,
        hooks: Arc<Counting>,
        monitor: ChangeMonitor<Arc<Counting>>,
    }

    async fn fixture(fail_templates: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let stories = dir.path().join("stories");
        let templates = dir.path().join("templates");
        std::fs::create_dir(&stories).unwrap();
        std::fs::create_dir(&templates).unwrap();
        write_story(&stories, "first.md", "2021-Jan-01", &["go"], false);

        let builder = Arc::new(
            Builder::with_markdown(StoriesConfig::new(stories.clone(), true)).unwrap(),
        );
        let store = Arc::new(SnapshotStore::new());
        store.rebuild(&builder).await.unwrap();
        let hooks = Arc::new(Counting {
            fail_templates,
            ..Counting::default()
        });
        let monitor =
            ChangeMonitor::new(templates.clone(), builder, store.clone(), hooks.clone());
        Fixture {
            _dir: dir,
            stories,
            templates,
            store,
            hooks,
            monitor,
        }
    }

    #[tokio::test]
    async fn classifies_paths() {
        let f = fixture(false).await;
        assert_eq!(
            f.monitor.classify(&f.templates.join("base.html")),
            Target::Templates
        );
        assert_eq!(f.monitor.classify(&f.stories.join("a.md")), Target::Stories);
        assert_eq!(
            f.monitor.classify(Path::new("/somewhere/else")),
            Target::Ignored
        );
    }

    #[tokio::test]
    async fn story_change_replaces_snapshot() {
        let f = fixture(false).await;
        write_story(&f.stories, "second.md", "2021-Jan-02", &["web"], false);

        let outcome = f
            .monitor
            .handle(&ChangeEvent::new(
                f.stories.join("second.md"),
                ChangeKind::Created,
            ))
            .await;

        assert!(matches!(outcome, Outcome::SnapshotReplaced(ref s) if s.len() == 2));
        assert_eq!(f.store.get().unwrap().len(), 2);
        assert_eq!(f.hooks.replaced.load(Ordering::SeqCst), 1);
        assert_eq!(f.hooks.recompiles.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn template_change_recompiles_only() {
        let f = fixture(false).await;
        let before = f.store.get().unwrap();
        let outcome = f
            .monitor
            .handle(&ChangeEvent::new(
                f.templates.join("index.html"),
                ChangeKind::Modified,
            ))
            .await;

        assert!(matches!(outcome, Outcome::TemplatesRecompiled));
        assert_eq!(f.hooks.recompiles.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&before, &f.store.get().unwrap()));
    }

    #[tokio::test]
    async fn template_failure_is_reported() {
        let f = fixture(true).await;
        let outcome = f
            .monitor
            .handle(&ChangeEvent::new(
                f.templates.join("index.html"),
                ChangeKind::Modified,
            ))
            .await;
        assert!(matches!(outcome, Outcome::TemplatesFailed));
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_serving_last_snapshot() {
        let f = fixture(false).await;
        let before = f.store.get().unwrap();
        std::fs::remove_dir_all(&f.stories).unwrap();

        let outcome = f
            .monitor
            .handle(&ChangeEvent::new(
                f.stories.join("first.md"),
                ChangeKind::Removed,
            ))
            .await;

        assert!(matches!(outcome, Outcome::RebuildFailed));
        assert!(Arc::ptr_eq(&before, &f.store.get().unwrap()));
        assert_eq!(f.hooks.replaced.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_processes_queued_events_in_order() {
        let f = fixture(false).await;
        let (tx, rx) = mpsc::channel(8);

        write_story(&f.stories, "draft.md", "2021-Jan-03", &["secret"], true);
        tx.send(ChangeEvent::new(f.stories.join("draft.md"), ChangeKind::Created))
            .await
            .unwrap();
        tx.send(ChangeEvent::new(f.templates.join("a.html"), ChangeKind::Created))
            .await
            .unwrap();
        tx.send(ChangeEvent::new(f.stories.join("first.md"), ChangeKind::Modified))
            .await
            .unwrap();
        drop(tx);

        f.monitor.run(rx).await;

        assert_eq!(f.hooks.replaced.load(Ordering::SeqCst), 2);
        assert_eq!(f.hooks.recompiles.load(Ordering::SeqCst), 1);
        let snapshot = f.store.get().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.by_tag("secret").is_none());
    }
}
