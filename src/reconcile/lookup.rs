//! Existing-post lookup strategies.
//!
//! Before creating a post for a matched feed item, the engine asks an
//! [`ExistingPostLookup`] whether that item already has one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::Result;
use crate::feed::FeedItem;
use crate::platform::{Platform, PlatformPost};

/// Answers "does this feed item already have a post?".
#[async_trait]
pub trait ExistingPostLookup: Send + Sync {
    /// Find the post for `item`. `stored` is the slot's current post, already
    /// resolved on the platform.
    async fn find_existing(
        &self,
        item: &FeedItem,
        stored: Option<&PlatformPost>,
    ) -> Result<Option<PlatformPost>>;
}

/// Trusts the slot state: the slot's post is reused when it links to the item.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredSlotLookup;

#[async_trait]
impl ExistingPostLookup for StoredSlotLookup {
    async fn find_existing(
        &self,
        item: &FeedItem,
        stored: Option<&PlatformPost>,
    ) -> Result<Option<PlatformPost>> {
        Ok(stored.filter(|p| p.links_to(&item.link)).cloned())
    }
}

/// Searches recent posts by known accounts for one linking to the item.
///
/// The listing is fetched once and reused for every slot of the run, so a
/// fresh lookup should be created per run.
pub struct AuthorHistoryLookup {
    platform: Arc<dyn Platform>,
    authors: Vec<String>,
    limit: usize,
    recent: OnceCell<Vec<PlatformPost>>,
}

impl AuthorHistoryLookup {
    /// Create a lookup over the `limit` newest posts by `authors`.
    pub fn new(platform: Arc<dyn Platform>, authors: Vec<String>, limit: usize) -> Self {
        Self {
            platform,
            authors,
            limit,
            recent: OnceCell::new(),
        }
    }

    async fn recent_by_authors(&self) -> Result<&[PlatformPost]> {
        let posts = self
            .recent
            .get_or_try_init(|| async {
                let posts = self.platform.recent_posts(self.limit).await?;
                let ours: Vec<PlatformPost> = posts
                    .into_iter()
                    .filter(|p| self.authors.iter().any(|a| a.eq_ignore_ascii_case(&p.author)))
                    .collect();
                debug!("{} recent post(s) by known authors", ours.len());
                Ok::<_, crate::FeedpinError>(ours)
            })
            .await?;
        Ok(posts.as_slice())
    }
}

#[async_trait]
impl ExistingPostLookup for AuthorHistoryLookup {
    async fn find_existing(
        &self,
        item: &FeedItem,
        stored: Option<&PlatformPost>,
    ) -> Result<Option<PlatformPost>> {
        if let Some(post) = stored.filter(|p| p.links_to(&item.link)) {
            return Ok(Some(post.clone()));
        }
        let recent = self.recent_by_authors().await?;
        Ok(recent.iter().find(|p| p.links_to(&item.link)).cloned())
    }
}

impl std::fmt::Debug for AuthorHistoryLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorHistoryLookup")
            .field("authors", &self.authors)
            .field("limit", &self.limit)
            .finish()
    }
}
