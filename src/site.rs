//! Renders a snapshot into the files of the static site and writes them out.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tera::{Context, Tera};
use tokio::fs::{metadata, remove_dir_all};
use tracing::{debug, info};

use crate::{
    collection::Snapshot,
    config::Config,
    error::{ContextExt, PublisherErr},
    feed::rss,
    fs::{copy_dir, write_file},
    templating::{has_template, Templates, DETAILS_TEMPLATE, INDEX_TEMPLATE, TAG_TEMPLATE},
};

pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /static/";

/// A rendered file, relative to the output directory.
#[derive(Debug, PartialEq)]
pub struct Page {
    pub path: PathBuf,
    pub content: String,
}

impl Page {
    fn new(path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }
}

/// Root URL, then one URL per story, newline terminated.
pub fn sitemap(config: &Config, snapshot: &Snapshot) -> String {
    let mut links = vec![config.feed.link.to_string()];
    links.extend(
        snapshot
            .stories()
            .iter()
            .map(|story| config.feed.story_link(&story.name)),
    );
    links.join("\n") + "\n"
}

fn tag_file_name(tag: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(tag.as_bytes()).collect();
    format!("{encoded}.html")
}

/// Renders every page of the site from one snapshot.
pub fn render(config: &Config, tera: &Tera, snapshot: &Snapshot) -> Result<Vec<Page>, PublisherErr> {
    info!("render pages and feeds");
    let mut pages = Vec::with_capacity(snapshot.len() + 4);

    let mut context = Context::new();
    context.insert("config", config);
    context.insert("stories", snapshot.stories());
    context.insert("tags", &snapshot.tags());
    pages.push(Page::new("index.html", tera.render(INDEX_TEMPLATE, &context)?));

    for story in snapshot.stories() {
        debug!("rendering story: {}", story.name);
        let mut context = Context::new();
        context.insert("config", config);
        context.insert("story", story);
        let content = tera
            .render(DETAILS_TEMPLATE, &context)
            .with_context(|| format!("rendering story {}", story.name))?;
        pages.push(Page::new(format!("{}.html", story.name), content));
    }

    if has_template(tera, TAG_TEMPLATE) {
        for tag in snapshot.tags() {
            let mut context = Context::new();
            context.insert("config", config);
            context.insert("tag", tag);
            context.insert("stories", snapshot.by_tag(tag).unwrap_or_default());
            let content = tera
                .render(TAG_TEMPLATE, &context)
                .with_context(|| format!("rendering tag {tag}"))?;
            pages.push(Page::new(Path::new("tags").join(tag_file_name(tag)), content));
        }
    }

    pages.push(Page::new("rss.xml", rss(&config.feed, snapshot)));
    pages.push(Page::new("robots.txt", ROBOTS_TXT.to_string()));
    pages.push(Page::new("sitemap.txt", sitemap(config, snapshot)));
    info!("render pages and feeds complete");
    Ok(pages)
}

/// Output side of the publisher: where the site goes and what it is built
/// from besides the snapshot.
pub struct Site {
    out_dir: PathBuf,
    static_dir: PathBuf,
    config: Arc<Config>,
    templates: Arc<Templates>,
}

impl Site {
    pub fn new(
        out_dir: PathBuf,
        static_dir: PathBuf,
        config: Arc<Config>,
        templates: Arc<Templates>,
    ) -> Self {
        Self {
            out_dir,
            static_dir,
            config,
            templates,
        }
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Renders `snapshot` and replaces the output directory with the result.
    pub async fn generate(&self, snapshot: &Snapshot) -> Result<(), PublisherErr> {
        let pages = render(&self.config, &self.templates.get(), snapshot)?;

        if metadata(&self.out_dir).await.is_ok() {
            remove_dir_all(&self.out_dir)
                .await
                .with_context(|| format!("remove directory: {}", self.out_dir.display()))?;
        }

        for page in pages.iter() {
            let path = self.out_dir.join(&page.path);
            debug!("write to file: {}", path.display());
            write_file(&path, page.content.as_bytes())
                .await
                .with_context(|| format!("write to file: {}", path.display()))?;
        }

        if metadata(&self.static_dir).await.is_ok() {
            let destination = self.out_dir.join("static");
            copy_dir(&self.static_dir, &destination)
                .await
                .with_context(|| format!("copy static files to {}", destination.display()))?;
        }

        info!(
            "site written to {} ({} pages)",
            self.out_dir.display(),
            pages.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::collection::{assemble, tests::story};

    fn config() -> Config {
        serde_json::from_str(r#"{"feed": {"title": "Blog", "link": "https://example.org"}}"#)
            .unwrap()
    }

    fn tera(with_tags: bool) -> Tera {
        let mut tera = Tera::default();
        tera.add_raw_template(
            INDEX_TEMPLATE,
            "{% for s in stories %}{{ s.name }};{% endfor %}",
        )
        .unwrap();
        tera.add_raw_template(
            DETAILS_TEMPLATE,
            "{{ config.feed.title }}: {{ story.title }} {{ story.content | safe }}",
        )
        .unwrap();
        if with_tags {
            tera.add_raw_template(
                TAG_TEMPLATE,
                "{{ tag }}={% for s in stories %}{{ s.name }};{% endfor %}",
            )
            .unwrap();
        }
        tera
    }

    fn snapshot() -> Snapshot {
        let mut first = story("first", (2021, 1, 1), &["go"], false);
        first.content = "<p>hi</p>".into();
        assemble(
            vec![first, story("second", (2021, 1, 2), &["go", "web"], false)],
            false,
        )
    }

    fn find<'a>(pages: &'a [Page], path: &str) -> &'a str {
        &pages
            .iter()
            .find(|p| p.path == Path::new(path))
            .unwrap_or_else(|| panic!("{path} not rendered"))
            .content
    }

    #[test]
    fn renders_index_details_and_extras() {
        let pages = render(&config(), &tera(false), &snapshot()).unwrap();

        assert_eq!(find(&pages, "index.html"), "second;first;");
        assert_eq!(find(&pages, "first.html"), "Blog: FIRST <p>hi</p>");
        assert_eq!(find(&pages, "robots.txt"), ROBOTS_TXT);
        assert_eq!(
            find(&pages, "sitemap.txt"),
            "https://example.org/\nhttps://example.org/second\nhttps://example.org/first\n"
        );
        assert!(find(&pages, "rss.xml").contains("<rss"));
        assert!(!pages.iter().any(|p| p.path.starts_with("tags")));
    }

    #[test]
    fn renders_tag_pages_when_template_exists() {
        let pages = render(&config(), &tera(true), &snapshot()).unwrap();
        assert_eq!(find(&pages, "tags/go.html"), "go=second;first;");
        assert_eq!(find(&pages, "tags/web.html"), "web=second;");
    }

    #[test]
    fn tag_file_names_cannot_escape() {
        assert_eq!(tag_file_name("c/c++"), "c%2Fc%2B%2B.html");
    }

    #[tokio::test]
    async fn generate_writes_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        let templates_dir = dir.path().join("templates");
        let static_dir = dir.path().join("static");
        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&templates_dir).unwrap();
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(templates_dir.join(INDEX_TEMPLATE), "index").unwrap();
        std::fs::write(templates_dir.join(DETAILS_TEMPLATE), "{{ story.name }}").unwrap();
        std::fs::write(static_dir.join("site.css"), "body {}").unwrap();
        std::fs::create_dir_all(&out_dir).unwrap();
        std::fs::write(out_dir.join("stale.html"), "old").unwrap();

        let site = Site::new(
            out_dir.clone(),
            static_dir,
            Arc::new(config()),
            Arc::new(Templates::load(&templates_dir).unwrap()),
        );
        site.generate(&snapshot()).await.unwrap();

        assert_eq!(std::fs::read_to_string(out_dir.join("index.html")).unwrap(), "index");
        assert_eq!(std::fs::read_to_string(out_dir.join("second.html")).unwrap(), "second");
        assert!(out_dir.join("static/site.css").exists());
        assert!(out_dir.join("rss.xml").exists());
        assert!(!out_dir.join("stale.html").exists());
    }
}
