//! # Publisher
//!
//! A small blog generator. Stories are files with a JSON metadata block, a
//! `+++` separator line and a markdown body:
//!
//! ```text
//! {"title": "Hello", "date": "2021-Jan-05", "tags": ["Go"]}
//! +++
//! # Hello
//! ```
//!
//! The core is the ingestion pipeline:
//!
//! | Module | Role |
//! |--------|------|
//! | [`metadata`] | Parses the metadata block, unknown keys go to `extras` |
//! | [`markdown`] | Markdown to sanitized HTML |
//! | [`story`] | Loads one file into a [`story::Story`] |
//! | [`collection`] | Scans a directory into an indexed [`collection::Snapshot`] |
//! | [`store`] | Holds the current snapshot behind an atomic swap |
//! | [`monitor`] | Rebuilds on change notifications, one at a time |
//!
//! Everything else ([`templating`], [`site`], [`feed`], [`watch`]) turns
//! snapshots into files and feeds change notifications to the monitor.

pub mod r#async;
pub mod collection;
pub mod config;
pub mod error;
pub mod feed;
pub mod fs;
pub mod markdown;
pub mod metadata;
pub mod monitor;
pub mod site;
pub mod store;
pub mod story;
pub mod templating;
pub mod watch;
