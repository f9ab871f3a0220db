//! Scans a stories directory and assembles an indexed, immutable [`Snapshot`].
//!
//! A build either fails as a whole (the directory cannot be listed) or
//! returns a complete snapshot. Files that fail to load are logged and left
//! out; they never fail the build.

use std::{
    collections::{hash_map::Entry, HashMap},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::fs::read_dir;
use tracing::{debug, info, warn};

use crate::{
    config::StoriesConfig,
    error::{BuildError, PublisherErr},
    markdown::{ContentRenderer, MarkdownRenderer},
    r#async::map_ordered,
    story::{load, Story},
};

/// Point-in-time view of every visible story. Never mutated once built.
#[derive(Debug, Default)]
pub struct Snapshot {
    stories: Vec<Arc<Story>>,
    by_name: HashMap<String, Arc<Story>>,
    by_tag: HashMap<String, Vec<Arc<Story>>>,
}

impl Snapshot {
    /// Indexes `stories` in the order given. On a name collision the later
    /// story wins the name index; both stay in the sequence.
    pub fn index(stories: Vec<Story>) -> Self {
        let stories: Vec<Arc<Story>> = stories.into_iter().map(Arc::new).collect();
        let mut by_name = HashMap::with_capacity(stories.len());
        let mut by_tag: HashMap<String, Vec<Arc<Story>>> = HashMap::new();

        for story in stories.iter() {
            by_name.insert(story.name.clone(), story.clone());
            for tag in story.tags.iter() {
                match by_tag.entry(tag.clone()) {
                    Entry::Vacant(e) => {
                        e.insert(vec![story.clone()]);
                    }
                    Entry::Occupied(mut e) => e.get_mut().push(story.clone()),
                }
            }
        }

        Self {
            stories,
            by_name,
            by_tag,
        }
    }

    /// Most recent first.
    pub fn stories(&self) -> &[Arc<Story>] {
        &self.stories
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Story>> {
        self.by_name.get(name)
    }

    /// Stories carrying `tag`, in [`Snapshot::stories`] order. Case-insensitive.
    pub fn by_tag(&self, tag: &str) -> Option<&[Arc<Story>]> {
        self.by_tag.get(&tag.to_lowercase()).map(Vec::as_slice)
    }

    /// Every tag in the snapshot, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.by_tag.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

/// Drops drafts when asked to, sorts by publication date (newest first,
/// stable for equal dates) and indexes the result.
pub fn assemble(mut stories: Vec<Story>, skip_drafts: bool) -> Snapshot {
    if skip_drafts {
        stories.retain(|story| !story.is_draft);
    }
    stories.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
    Snapshot::index(stories)
}

/// Lists story files directly inside `dir`, ordered by file name.
/// Directories are skipped; the extension is matched case-insensitively.
pub async fn scan(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, BuildError> {
    let scan_error = |source: io::Error| BuildError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(BuildError::DirectoryMissing {
                path: dir.to_path_buf(),
            });
        }
        Err(err) => return Err(scan_error(err)),
    };

    let suffix = format!(".{}", extension.to_lowercase());
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
        if entry.file_type().await.map_err(scan_error)?.is_dir() {
            continue;
        }
        if entry
            .file_name()
            .to_string_lossy()
            .to_lowercase()
            .ends_with(&suffix)
        {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Builds snapshots for one stories directory.
pub struct Builder {
    config: StoriesConfig,
    renderer: Arc<dyn ContentRenderer>,
}

impl Builder {
    pub fn new(config: StoriesConfig, renderer: Arc<dyn ContentRenderer>) -> Self {
        Self { config, renderer }
    }

    /// A builder rendering bodies with [`MarkdownRenderer`] configured from
    /// `config.render`.
    pub fn with_markdown(config: StoriesConfig) -> Result<Self, PublisherErr> {
        let renderer = MarkdownRenderer::new(&config.render)?;
        Ok(Self::new(config, Arc::new(renderer)))
    }

    pub fn config(&self) -> &StoriesConfig {
        &self.config
    }

    pub async fn build(&self) -> Result<Snapshot, BuildError> {
        let dir = &self.config.stories_dir;
        info!("scanning stories in {}", dir.display());
        let files = scan(dir, &self.config.extension).await?;
        debug!("found {} story files", files.len());

        let renderer = self.renderer.clone();
        let loaded = map_ordered(files, move |path| {
            let renderer = renderer.clone();
            async move { load(&path, renderer.as_ref()).await }
        })
        .await?;

        let mut stories = Vec::with_capacity(loaded.len());
        for result in loaded {
            match result {
                Ok(story) => {
                    debug!("loaded story: {}", story.name);
                    stories.push(story);
                }
                Err(err) => warn!(
                    path = %err.path().display(),
                    stage = err.stage(),
                    "skipping story: {err}"
                ),
            }
        }

        let snapshot = assemble(stories, self.config.skip_drafts);
        info!(
            "indexed {} stories with {} tags",
            snapshot.len(),
            snapshot.by_tag.len()
        );
        Ok(snapshot)
    }
}
