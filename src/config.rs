use std::{
    fs::File,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{ContextExt, PublisherErr},
    markdown::RenderOptions,
};

pub const DEFAULT_EXTENSION: &str = "md";
pub const CONFIG_FILE: &str = "config.json";

/// Everything the collection builder needs. Holds no file or environment
/// reads: callers decide where the values come from.
#[derive(Debug, Clone)]
pub struct StoriesConfig {
    pub stories_dir: PathBuf,
    /// Drop drafts from the snapshot entirely.
    pub skip_drafts: bool,
    /// Story file extension without the dot, matched case-insensitively.
    pub extension: String,
    pub render: RenderOptions,
}

impl StoriesConfig {
    pub fn new(stories_dir: PathBuf, skip_drafts: bool) -> Self {
        Self {
            stories_dir,
            skip_drafts,
            extension: DEFAULT_EXTENSION.into(),
            render: RenderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Public root of the site; story pages live at `{link}/{name}`.
    pub link: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

impl FeedConfig {
    pub fn story_link(&self, name: &str) -> String {
        format!("{}/{}", self.link.as_str().trim_end_matches('/'), name)
    }
}

/// Sub-directories of the content directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Layout {
    pub stories: PathBuf,
    pub templates: PathBuf,
    #[serde(rename = "static")]
    pub static_files: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            stories: "stories".into(),
            templates: "templates".into(),
            static_files: "static".into(),
        }
    }
}

/// Site configuration read from `config.json` in the content directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub layout: Layout,
}

impl TryFrom<&Path> for Config {
    type Error = PublisherErr;
    fn try_from(content_dir: &Path) -> Result<Self, PublisherErr> {
        let config_path = content_dir.join(CONFIG_FILE);
        let f = File::open(&config_path)
            .with_context(|| format!("config file: {}", config_path.display()))?;
        serde_json::from_reader(f)
            .with_context(|| format!("config file: {}", config_path.display()))
    }
}
