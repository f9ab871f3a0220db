//! Turns story bodies into HTML fragments that templates can embed without
//! escaping.

use std::{borrow::Cow, collections::HashMap};

use pulldown_cmark::{
    html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
};
use regex::Regex;

/// Anything that converts a story body into a sanitized HTML fragment.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, markup: &str) -> String;
}

/// Bare URLs in text that become links.
const BARE_URL: &str = r#"\b(?:https?://|www\.)[^\s<>"]*[^\s<>"'.,:;!?)\]]"#;

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Every knob the markdown renderer recognises.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub smart_punctuation: bool,
    pub task_lists: bool,
    pub definition_lists: bool,
    /// Explicit `{#id .class}` attributes on headings.
    pub heading_attributes: bool,
    /// Derive an `id` for every heading from its text.
    pub heading_ids: bool,
    /// Link bare `http(s)://` and `www.` URLs found in text.
    pub autolinks: bool,
    /// `rel` attribute forced onto every link, `None` leaves links alone.
    pub link_rel: Option<&'static str>,
    /// Values a `class` attribute on `<code>` must match to survive
    /// sanitization. Fenced code blocks use it for the language hint.
    pub code_class_pattern: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            smart_punctuation: true,
            task_lists: true,
            definition_lists: true,
            heading_attributes: true,
            heading_ids: true,
            autolinks: true,
            link_rel: Some("nofollow noopener noreferrer"),
            code_class_pattern: "^language-[A-Za-z0-9]+$".into(),
        }
    }
}

impl RenderOptions {
    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        if self.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.footnotes {
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.smart_punctuation {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        if self.task_lists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if self.definition_lists {
            options.insert(Options::ENABLE_DEFINITION_LIST);
        }
        if self.heading_attributes {
            options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        }
        options
    }
}

/// Markdown to HTML with `pulldown-cmark`, then an allow-list pass with
/// `ammonia`.
pub struct MarkdownRenderer {
    options: Options,
    heading_ids: bool,
    bare_url: Option<Regex>,
    sanitizer: ammonia::Builder<'static>,
}

impl MarkdownRenderer {
    pub fn new(render_options: &RenderOptions) -> Result<Self, regex::Error> {
        let code_class = Regex::new(&render_options.code_class_pattern)?;
        let bare_url = if render_options.autolinks {
            Some(Regex::new(BARE_URL)?)
        } else {
            None
        };

        let mut sanitizer = ammonia::Builder::default();
        sanitizer
            .add_tag_attributes("code", &["class"])
            .add_tag_attributes("div", &["id", "class"])
            .add_tag_attributes("sup", &["class"])
            .link_rel(render_options.link_rel)
            .attribute_filter(move |element, attribute, value| match attribute {
                "class" if element == "code" => {
                    code_class.is_match(value).then_some(Cow::Borrowed(value))
                }
                // Footnote markup: footnote-reference, footnote-definition...
                "class" => value
                    .starts_with("footnote-")
                    .then_some(Cow::Borrowed(value)),
                "id" => value
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
                    .then_some(Cow::Borrowed(value)),
                _ => Some(Cow::Borrowed(value)),
            });
        for heading in HEADINGS {
            sanitizer.add_tag_attributes(heading, &["id"]);
        }

        Ok(Self {
            options: render_options.parser_options(),
            heading_ids: render_options.heading_ids,
            bare_url,
            sanitizer,
        })
    }

    fn events<'a>(&self, markup: &'a str) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        // Inside a link, an image or a code block text is never linked.
        let mut opaque = 0usize;
        for event in TextMergeStream::new(Parser::new_ext(markup, self.options)) {
            match &event {
                Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                    opaque += 1
                }
                Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                    opaque = opaque.saturating_sub(1)
                }
                _ => {}
            }
            match (event, &self.bare_url) {
                (Event::Text(text), Some(bare_url)) if opaque == 0 => {
                    link_urls(bare_url, text, &mut events)
                }
                (event, _) => events.push(event),
            }
        }
        if self.heading_ids {
            assign_heading_ids(&mut events);
        }
        events
    }
}

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, markup: &str) -> String {
        let mut unsafe_html = String::with_capacity(markup.len() * 3 / 2);
        html::push_html(&mut unsafe_html, self.events(markup).into_iter());
        self.sanitizer.clean(&unsafe_html).to_string()
    }
}

/// Splits a text event around the URLs it contains, wrapping each in a link.
fn link_urls<'a>(bare_url: &Regex, text: CowStr<'a>, events: &mut Vec<Event<'a>>) {
    let mut last = 0;
    for found in bare_url.find_iter(&text) {
        if found.start() > last {
            events.push(Event::Text(text[last..found.start()].to_string().into()));
        }
        let url = found.as_str();
        let dest_url = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: dest_url.into(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        events.push(Event::Text(url.to_string().into()));
        events.push(Event::End(TagEnd::Link));
        last = found.end();
    }
    if last == 0 {
        events.push(Event::Text(text));
    } else if last < text.len() {
        events.push(Event::Text(text[last..].to_string().into()));
    }
}

/// Gives every heading without an explicit id one derived from its text.
/// Repeated ids get a `-1`, `-2`... suffix.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut used: HashMap<String, usize> = HashMap::new();
    let mut i = 0;
    while i < events.len() {
        if let Event::Start(Tag::Heading { id: None, .. }) = &events[i] {
            let mut text = String::new();
            let mut end = i + 1;
            while end < events.len() {
                match &events[end] {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(t) | Event::Code(t) => text.push_str(t),
                    _ => {}
                }
                end += 1;
            }

            let slug = slugify(&text);
            let count = used.entry(slug.clone()).or_insert(0);
            let unique = if *count == 0 {
                slug
            } else {
                format!("{slug}-{count}")
            };
            *count += 1;

            if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                *id = Some(unique.into());
            }
            i = end;
        }
        i += 1;
    }
}

/// Lower-cased letters and digits, every other run of characters becomes
/// one `-`.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}
