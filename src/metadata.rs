use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::MalformedMetadata;

/// Free-form fields a story carries for its templates.
pub type Extras = Map<String, Value>;

const EXTRAS_KEY: &str = "extras";

/// The metadata block as written in the file. Keys are case-sensitive.
#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    title: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    date: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    extras: Option<Value>,
    #[serde(flatten)]
    unknown: Map<String, Value>,
}

#[derive(Debug, PartialEq, Default, Clone)]
pub struct Metadata {
    pub title: String,
    pub draft: bool,
    /// Publication date exactly as written; parsed by the story loader.
    pub date: String,
    /// `tags` followed by `categories`, as written (not yet normalized).
    pub tags: Vec<String>,
    pub extras: Extras,
}

impl From<RawMetadata> for Metadata {
    fn from(raw: RawMetadata) -> Self {
        let mut extras = match raw.extras {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => Map::new(),
            Some(other) => {
                let mut map = Map::new();
                map.insert(EXTRAS_KEY.to_string(), other);
                map
            }
        };
        for (key, value) in raw.unknown {
            extras.entry(key).or_insert(value);
        }

        let mut tags = raw.tags;
        tags.extend(raw.categories);

        Metadata {
            title: raw.title,
            draft: raw.draft,
            date: raw.date,
            tags,
            extras,
        }
    }
}

/// Parses the metadata segment of a story file.
pub fn parse(segment: &str) -> Result<Metadata, MalformedMetadata> {
    let raw: RawMetadata = serde_json::from_str(segment)?;
    Ok(raw.into())
}
