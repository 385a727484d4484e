//! Feed item extraction.
//!
//! Items are cut out of the document by literal tag matching: every
//! `<item>...</item>` block must carry one `<link>`, `<title>`, `<summary>`
//! and `<category>` element. Tag names are case-sensitive and no CDATA or
//! entity decoding is applied. Field text is kept as written, except that
//! surrounding whitespace is stripped from the link so it compares equal to
//! the url recorded on the platform.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{FeedpinError, Result};
use crate::feed::types::FeedItem;

static ITEM_BLOCK: LazyLock<Regex> = LazyLock::new(|| tag_pattern("item"));
static LINK: LazyLock<Regex> = LazyLock::new(|| tag_pattern("link"));
static TITLE: LazyLock<Regex> = LazyLock::new(|| tag_pattern("title"));
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| tag_pattern("summary"));
static CATEGORY: LazyLock<Regex> = LazyLock::new(|| tag_pattern("category"));

/// Root markers of a feed document.
const FEED_MARKERS: &[&str] = &["<rss", "<channel", "<feed", "<rdf:RDF"];

fn tag_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")).unwrap()
}

/// Parse a raw feed document into at most `max_items` items, in feed order.
///
/// Items past `max_items` are never inspected, so a malformed item beyond
/// the limit does not fail the run.
///
/// # Errors
///
/// - [`FeedpinError::FeedFetch`] if the text is not a feed document
/// - [`FeedpinError::MalformedFeedItem`] if an item lacks a required element
///   or is never closed
pub fn parse_items(text: &str, max_items: usize) -> Result<Vec<FeedItem>> {
    let blocks: Vec<&str> = ITEM_BLOCK
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if blocks.is_empty() && !FEED_MARKERS.iter().any(|m| text.contains(m)) {
        return Err(FeedpinError::FeedFetch(
            "response is not an RSS/Atom document".to_string(),
        ));
    }

    let opened = text.matches("<item>").count();
    if opened > blocks.len() && blocks.len() < max_items {
        return Err(FeedpinError::MalformedFeedItem {
            index: blocks.len(),
            field: "/item",
        });
    }

    debug!("found {} feed item(s), using up to {}", blocks.len(), max_items);

    blocks
        .into_iter()
        .take(max_items)
        .enumerate()
        .map(|(index, block)| parse_item(index, block))
        .collect()
}

fn parse_item(index: usize, block: &str) -> Result<FeedItem> {
    let field = |re: &Regex, name: &'static str| -> Result<String> {
        re.captures(block)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or(FeedpinError::MalformedFeedItem { index, field: name })
    };

    Ok(FeedItem {
        link: field(&LINK, "link")?.trim().to_string(),
        title: field(&TITLE, "title")?,
        summary: field(&SUMMARY, "summary")?,
        category: field(&CATEGORY, "category")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str, title: &str, category: &str) -> String {
        format!(
            "<item><title>{title}</title><link>{link}</link>\
             <summary>About {title}</summary><category>{category}</category></item>"
        )
    }

    fn feed(items: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Godot Engine</title>
{}
</channel></rss>"#,
            items.join("\n")
        )
    }

    #[test]
    fn test_parse_items_in_feed_order() {
        let text = feed(&[
            item("https://godotengine.org/a", "Godot 4.3 released", "Release"),
            item("https://godotengine.org/b", "Showcase", "News"),
        ]);

        let items = parse_items(&text, 12).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://godotengine.org/a");
        assert_eq!(items[0].title, "Godot 4.3 released");
        assert_eq!(items[0].summary, "About Godot 4.3 released");
        assert_eq!(items[0].category, "Release");
        assert_eq!(items[1].link, "https://godotengine.org/b");
    }

    #[test]
    fn test_parse_items_multiline_block() {
        let text = r#"<rss><channel>
<item>
  <title>Dev snapshot</title>
  <link>
    https://godotengine.org/dev
  </link>
  <summary>Line one
line two</summary>
  <category>Pre-release</category>
</item>
</channel></rss>"#;

        let items = parse_items(text, 12).unwrap();
        assert_eq!(items[0].link, "https://godotengine.org/dev");
        assert_eq!(items[0].summary, "Line one\nline two");
    }

    #[test]
    fn test_parse_items_keeps_field_text_literal() {
        let text = "<rss><channel><item><title> Godot 4.4 </title>\
                    <link> https://godotengine.org/a </link>\
                    <summary>\n  Body\n</summary><category>Release</category>\
                    </item></channel></rss>";

        let items = parse_items(text, 12).unwrap();
        assert_eq!(items[0].link, "https://godotengine.org/a");
        assert_eq!(items[0].title, " Godot 4.4 ");
        assert_eq!(items[0].summary, "\n  Body\n");
        assert_eq!(items[0].category, "Release");
    }

    #[test]
    fn test_parse_items_truncates() {
        let items: Vec<String> = (0..20)
            .map(|i| item(&format!("https://x/{i}"), &format!("Post {i}"), "News"))
            .collect();

        let parsed = parse_items(&feed(&items), 6).unwrap();
        assert_eq!(parsed.len(), 6);
        assert_eq!(parsed[5].link, "https://x/5");
    }

    #[test]
    fn test_parse_items_malformed_beyond_limit_is_ignored() {
        let text = feed(&[
            item("https://x/0", "Post 0", "News"),
            "<item><title>broken</title></item>".to_string(),
        ]);

        assert_eq!(parse_items(&text, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_items_missing_summary() {
        let text = feed(&[
            item("https://x/0", "Post 0", "News"),
            "<item><title>t</title><link>https://x/1</link><category>News</category></item>"
                .to_string(),
        ]);

        let err = parse_items(&text, 12).unwrap_err();
        assert!(matches!(
            err,
            FeedpinError::MalformedFeedItem {
                index: 1,
                field: "summary"
            }
        ));
    }

    #[test]
    fn test_parse_items_case_sensitive_tags() {
        let text = feed(&[
            "<item><Title>t</Title><link>l</link><summary>s</summary><category>c</category></item>"
                .to_string(),
        ]);

        assert!(matches!(
            parse_items(&text, 12),
            Err(FeedpinError::MalformedFeedItem { field: "title", .. })
        ));
    }

    #[test]
    fn test_parse_items_unclosed_item() {
        let text = "<rss><channel><item><title>t</title></channel></rss>";
        assert!(matches!(
            parse_items(text, 12),
            Err(FeedpinError::MalformedFeedItem { index: 0, .. })
        ));
    }

    #[test]
    fn test_parse_items_empty_channel() {
        let text = feed(&[]);
        assert!(parse_items(&text, 12).unwrap().is_empty());
    }

    #[test]
    fn test_parse_items_not_a_feed() {
        let err = parse_items("<html><body>Service Unavailable</body></html>", 12).unwrap_err();
        assert!(matches!(err, FeedpinError::FeedFetch(_)));
    }
}
