use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::fs::read_to_string;

use crate::{
    error::{InvalidDate, LoadError},
    markdown::ContentRenderer,
    metadata::{self, Extras},
};

/// Separates the metadata block from the body of a story file.
pub const METADATA_SEPARATOR: &str = "\n+++\n";

/// Publication dates look like `2021-Jan-05`.
pub const DATE_FORMAT: &str = "%Y-%b-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Story {
    pub name: String,
    pub is_draft: bool,
    pub title: String,
    pub publication_date: NaiveDate,
    /// Sanitized HTML, safe to embed as is.
    pub content: String,
    /// Lower-cased, first occurrence kept.
    pub tags: Vec<String>,
    pub extras: Extras,
}

impl Story {
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| *t == tag)
    }

    /// Builds a story from the full text of the file at `path`.
    pub fn from_source(
        path: &Path,
        source: &str,
        renderer: &dyn ContentRenderer,
    ) -> Result<Self, LoadError> {
        let (metadata_segment, body) = split(source);

        let metadata = metadata::parse(metadata_segment).map_err(|source| LoadError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;

        let publication_date =
            parse_date(&metadata.date).map_err(|source| LoadError::Date {
                path: path.to_path_buf(),
                value: metadata.date.clone(),
                source,
            })?;

        let content = body.map(|body| renderer.render(body)).unwrap_or_default();

        Ok(Self {
            name: name_from_path(path),
            is_draft: metadata.draft,
            title: metadata.title,
            publication_date,
            content,
            tags: normalize_tags(metadata.tags),
            extras: metadata.extras,
        })
    }
}

/// Reads and parses one story file.
pub async fn load(path: &Path, renderer: &dyn ContentRenderer) -> Result<Story, LoadError> {
    let source = read_to_string(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Story::from_source(path, &source, renderer)
}

/// Splits on the first separator only. Without a separator the whole file is
/// metadata and there is no body.
pub fn split(source: &str) -> (&str, Option<&str>) {
    match source.split_once(METADATA_SEPARATOR) {
        Some((metadata, body)) => (metadata, Some(body)),
        None => (source, None),
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, InvalidDate> {
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT)?;
    // %d also takes a single digit.
    match value.rsplit_once('-') {
        Some((_, day)) if day.len() == 2 => Ok(date),
        _ => Err(InvalidDate::ShortDay),
    }
}

/// File name without its directory and final extension: `posts/a.b.md` is
/// `a.b`.
pub fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.to_lowercase();
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}
