use chrono::NaiveTime;
use rss::{Category, ChannelBuilder, Guid, Item, ItemBuilder};

use crate::{collection::Snapshot, config::FeedConfig, story::Story};

fn to_rss_item(config: &FeedConfig, story: &Story) -> Item {
    let link = config.story_link(&story.name);
    ItemBuilder::default()
        .title(Some(story.title.clone()))
        .link(Some(link.clone()))
        .description(Some(story.content.clone()))
        .pub_date(Some(
            story
                .publication_date
                .and_time(NaiveTime::MIN)
                .and_utc()
                .to_rfc2822(),
        ))
        .guid(Some(Guid {
            value: link,
            permalink: true,
        }))
        .categories(
            story
                .tags
                .iter()
                .map(|tag| Category {
                    name: tag.clone(),
                    domain: None,
                })
                .collect::<Vec<Category>>(),
        )
        .build()
}

/// RSS 2.0 document listing the snapshot's stories in snapshot order.
pub fn rss(config: &FeedConfig, snapshot: &Snapshot) -> String {
    let channel = ChannelBuilder::default()
        .title(config.title.clone())
        .link(config.link.to_string())
        .description(config.description.clone())
        .managing_editor(config.author.as_ref().map(|author| match &author.email {
            Some(email) => format!("{email} ({})", author.name),
            None => author.name.clone(),
        }))
        .items(
            snapshot
                .stories()
                .iter()
                .map(|story| to_rss_item(config, story))
                .collect::<Vec<Item>>(),
        )
        .build();
    channel.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collection::{assemble, tests::story},
        config::Author,
    };

    #[test]
    fn lists_stories_newest_first() {
        let config: FeedConfig = serde_json::from_value(serde_json::json!({
            "title": "Blog",
            "description": "words",
            "link": "https://example.org/"
        }))
        .unwrap();
        let config = FeedConfig {
            author: Some(Author {
                name: "Roman".into(),
                email: Some("r@example.org".into()),
            }),
            ..config
        };
        let snapshot = assemble(
            vec![
                story("older", (2021, 1, 1), &["go"], false),
                story("newer", (2021, 1, 5), &[], false),
            ],
            false,
        );

        let xml = rss(&config, &snapshot);
        let newer = xml.find("https://example.org/newer").unwrap();
        let older = xml.find("https://example.org/older").unwrap();
        assert!(newer < older);
        assert!(xml.contains("<title>Blog</title>"));
        assert!(xml.contains("r@example.org (Roman)"));
        assert!(xml.contains("Fri, 1 Jan 2021 00:00:00 +0000"));
        assert!(xml.contains("<category>go</category>"));
    }
}
