//! Slot rules and item classification.

use std::collections::HashSet;

use serde::Deserialize;

use crate::feed::FeedItem;

/// Restricts a slot to release or non-release items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseFilter {
    /// No restriction.
    #[default]
    Any,
    /// Only items whose category marks a release.
    Release,
    /// Only items that are not releases.
    NonRelease,
}

impl ReleaseFilter {
    fn accepts(self, item: &FeedItem) -> bool {
        match self {
            ReleaseFilter::Any => true,
            ReleaseFilter::Release => item.is_release(),
            ReleaseFilter::NonRelease => !item.is_release(),
        }
    }
}

/// Classification rule for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRule {
    /// Slot number; lower numbers are pinned more prominently.
    pub number: u32,
    /// Accepted categories. Empty accepts any category.
    pub categories: HashSet<String>,
    /// Case-sensitive title substring. Empty accepts any title.
    pub title_contains: String,
    /// Release restriction.
    pub release: ReleaseFilter,
    /// Flair template id. Empty falls back to the global flair style.
    pub flair_id: String,
    /// Flair text. Empty falls back to the release/news preset.
    pub flair_text: String,
    /// Whether the slot follows the feed. When false the slot only keeps
    /// the post a moderator assigned to it.
    pub from_feed: bool,
}

impl SlotRule {
    /// Create a rule that accepts every item.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            categories: HashSet::new(),
            title_contains: String::new(),
            release: ReleaseFilter::Any,
            flair_id: String::new(),
            flair_text: String::new(),
            from_feed: true,
        }
    }

    /// Create a slot that ignores the feed and only holds assigned posts.
    pub fn manual(number: u32) -> Self {
        Self {
            from_feed: false,
            ..Self::new(number)
        }
    }

    /// Restrict the rule to the given categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Require a title substring.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title_contains = title.into();
        self
    }

    /// Set the release filter.
    pub fn with_release(mut self, release: ReleaseFilter) -> Self {
        self.release = release;
        self
    }

    /// Set an explicit flair.
    pub fn with_flair(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.flair_id = id.into();
        self.flair_text = text.into();
        self
    }

    /// Resolve the flair for a post created from `item` in this slot.
    pub fn flair_for(&self, item: &FeedItem, defaults: &FlairDefaults) -> Flair {
        let id = if self.flair_id.is_empty() {
            defaults.style.clone()
        } else {
            self.flair_id.clone()
        };
        let text = if !self.flair_text.is_empty() {
            self.flair_text.clone()
        } else if is_release(item) {
            defaults.release_text.clone()
        } else {
            defaults.news_text.clone()
        };

        Flair {
            id: (!id.is_empty()).then_some(id),
            text,
        }
    }
}

/// Flair presets used when a slot configures none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlairDefaults {
    /// Global flair template id.
    pub style: String,
    /// Text for release items.
    pub release_text: String,
    /// Text for all other items.
    pub news_text: String,
}

/// Flair attached to a created post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flair {
    /// Template id, if any.
    pub id: Option<String>,
    /// Display text.
    pub text: String,
}

/// Whether `item` belongs in the slot described by `rule`.
///
/// Each condition that is left empty accepts everything; the conditions are
/// combined with AND. Title matching is a case-sensitive substring test.
pub fn classify(item: &FeedItem, rule: &SlotRule) -> bool {
    let category_ok = rule.categories.is_empty() || rule.categories.contains(&item.category);
    let title_ok = rule.title_contains.is_empty() || item.title.contains(&rule.title_contains);
    category_ok && title_ok && rule.release.accepts(item)
}

/// Whether `item` is a release or pre-release announcement.
pub fn is_release(item: &FeedItem) -> bool {
    item.is_release()
}

/// The first item in feed order that `rule` accepts.
///
/// The feed is newest-first, so this is the newest match.
pub fn find_match<'a>(items: &'a [FeedItem], rule: &SlotRule) -> Option<&'a FeedItem> {
    items.iter().find(|item| classify(item, rule))
}
