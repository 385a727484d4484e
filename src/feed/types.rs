//! Feed types for feedpin.

/// Categories that mark an item as a release announcement.
pub const RELEASE_CATEGORIES: &[&str] = &["Release", "Pre-release"];

/// One entry of the polled feed.
///
/// `link` identifies the item across fetches; the feed carries no other id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Link to the article.
    pub link: String,
    /// Item title.
    pub title: String,
    /// Item summary, used as the post body.
    pub summary: String,
    /// Item category.
    pub category: String,
}

impl FeedItem {
    /// Create a new feed item.
    pub fn new(
        link: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            link: link.into(),
            title: title.into(),
            summary: summary.into(),
            category: category.into(),
        }
    }

    /// Whether the item announces a release or pre-release.
    pub fn is_release(&self) -> bool {
        RELEASE_CATEGORIES.contains(&self.category.as_str())
    }
}
