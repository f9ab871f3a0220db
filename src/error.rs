use std::{fmt::Display, io, path::Path, path::PathBuf};

use thiserror::Error;

/// The metadata block of a story is not valid JSON, or its known fields have
/// the wrong shape.
#[derive(Error, Debug)]
#[error("malformed metadata: {0}")]
pub struct MalformedMetadata(#[from] pub serde_json::Error);

/// A publication date that does not follow `YYYY-Mon-DD`.
#[derive(Error, Debug)]
pub enum InvalidDate {
    #[error(transparent)]
    Format(#[from] chrono::ParseError),
    #[error("the day must have two digits")]
    ShortDay,
}

/// Failure to turn one story file into a [`crate::story::Story`]. Always
/// scoped to a single file: the collection builder logs it and moves on.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing metadata of {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: MalformedMetadata,
    },
    #[error("parsing date {value:?} of {}: {source}", path.display())]
    Date {
        path: PathBuf,
        value: String,
        #[source]
        source: InvalidDate,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Metadata { path, .. }
            | LoadError::Date { path, .. } => path,
        }
    }

    /// Name of the loader stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => "read",
            LoadError::Metadata { .. } => "metadata",
            LoadError::Date { .. } => "date",
        }
    }
}

/// Errors fatal to a whole collection build.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("stories directory {} is missing", path.display())]
    DirectoryMissing { path: PathBuf },
    #[error("scanning {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("story loader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum PublisherErr {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("{0}")]
    Message(String),
    #[error("{context}:\n {source}")]
    Context {
        context: String,
        #[source]
        source: Box<PublisherErr>,
    },
}

impl From<String> for PublisherErr {
    fn from(message: String) -> Self {
        PublisherErr::Message(message)
    }
}

impl From<&str> for PublisherErr {
    fn from(message: &str) -> Self {
        PublisherErr::Message(message.to_string())
    }
}

pub trait ContextExt<T> {
    fn with_context<F, C>(self, context: F) -> Result<T, PublisherErr>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T, E> ContextExt<T> for Result<T, E>
where
    E: Into<PublisherErr>,
{
    fn with_context<F, C>(self, context: F) -> Result<T, PublisherErr>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|err| PublisherErr::Context {
            context: context().to_string(),
            source: Box::new(err.into()),
        })
    }
}
