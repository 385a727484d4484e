//! Content platform boundary.
//!
//! The reconciliation core only talks to the platform through the
//! [`Platform`] trait: resolve a post, create one, and pin or unpin it.

pub mod memory;
pub mod reddit;

use async_trait::async_trait;

use crate::slots::Flair;
use crate::Result;

pub use memory::{MemoryPlatform, PlatformCall};
pub use reddit::RedditClient;

/// A post as observed on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPost {
    /// Post id (without type prefix).
    pub id: String,
    /// Link target for link posts.
    pub url: Option<String>,
    /// Post title.
    pub title: String,
    /// Author account name.
    pub author: String,
    /// Whether the post is currently pinned.
    pub is_pinned: bool,
}

impl PlatformPost {
    /// Whether this post links to `link`.
    pub fn links_to(&self, link: &str) -> bool {
        self.url.as_deref() == Some(link)
    }
}

/// Request to create a link post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Post title.
    pub title: String,
    /// Link target.
    pub url: String,
    /// Body text.
    pub text: String,
    /// Flair.
    pub flair: Flair,
}

/// Operations the engine and sequencer need from the content platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Resolve a post by id.
    ///
    /// Returns [`crate::FeedpinError::StaleReference`] when the post no longer
    /// exists or has been removed.
    async fn get_post(&self, id: &str) -> Result<PlatformPost>;

    /// Create a link post.
    async fn submit_post(&self, post: &NewPost) -> Result<PlatformPost>;

    /// Pin a post. `Some(1)` puts it on top; `None` inserts it just below
    /// the top pin.
    ///
    /// Pinning a post that is already pinned fails with
    /// [`crate::FeedpinError::PinConflict`].
    async fn pin(&self, id: &str, position: Option<u32>) -> Result<()>;

    /// Unpin a post.
    async fn unpin(&self, id: &str) -> Result<()>;

    /// Newest posts in the community, newest first.
    async fn recent_posts(&self, limit: usize) -> Result<Vec<PlatformPost>>;
}
