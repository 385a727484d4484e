//! In-process platform.
//!
//! Keeps posts and the pinned list in memory and records every call. It
//! follows the pin rules of the real platform: position 1 inserts at the
//! top, pinning without a position inserts directly below the top pin, and
//! pinning a post that is already pinned is rejected. Used for dry runs and
//! tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use crate::error::{FeedpinError, Result};
use crate::platform::{NewPost, Platform, PlatformPost};

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    /// `get_post(id)`.
    GetPost(String),
    /// `submit_post` for the given link.
    Submit(String),
    /// `pin(id, position)`.
    Pin(String, Option<u32>),
    /// `unpin(id)`.
    Unpin(String),
    /// `recent_posts(limit)`.
    RecentPosts(usize),
}

#[derive(Debug, Default)]
struct State {
    posts: HashMap<String, PlatformPost>,
    /// Post ids in creation order.
    order: Vec<String>,
    /// Pinned post ids, top first.
    pinned: Vec<String>,
    calls: Vec<PlatformCall>,
    next_id: u64,
}

/// In-memory [`Platform`].
#[derive(Debug)]
pub struct MemoryPlatform {
    author: String,
    state: Mutex<State>,
}

impl MemoryPlatform {
    /// Create an empty platform whose created posts are authored by `author`.
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| FeedpinError::Platform("memory platform lock poisoned".to_string()))
    }

    /// Add an existing post.
    pub fn insert_post(&self, post: PlatformPost) -> Result<()> {
        let mut state = self.lock()?;
        if post.is_pinned && !state.pinned.contains(&post.id) {
            state.pinned.push(post.id.clone());
        }
        state.order.push(post.id.clone());
        state.posts.insert(post.id.clone(), post);
        Ok(())
    }

    /// Delete a post, as a moderator would outside of this program.
    pub fn remove_post(&self, id: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.posts.remove(id);
        state.order.retain(|p| p != id);
        state.pinned.retain(|p| p != id);
        Ok(())
    }

    /// Pinned post ids, top first.
    pub fn pinned(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.pinned.clone())
    }

    /// Every call made so far.
    pub fn calls(&self) -> Result<Vec<PlatformCall>> {
        Ok(self.lock()?.calls.clone())
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) -> Result<()> {
        self.lock()?.calls.clear();
        Ok(())
    }

    /// Number of posts created through `submit_post`.
    pub fn submitted_count(&self) -> Result<usize> {
        Ok(self
            .lock()?
            .calls
            .iter()
            .filter(|c| matches!(c, PlatformCall::Submit(_)))
            .count())
    }

    /// Look up a post without recording a call.
    pub fn post(&self, id: &str) -> Result<Option<PlatformPost>> {
        let state = self.lock()?;
        Ok(state.posts.get(id).map(|p| with_pin_flag(&state, p)))
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new("feedpin")
    }
}

fn with_pin_flag(state: &State, post: &PlatformPost) -> PlatformPost {
    PlatformPost {
        is_pinned: state.pinned.contains(&post.id),
        ..post.clone()
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    async fn get_post(&self, id: &str) -> Result<PlatformPost> {
        let mut state = self.lock()?;
        state.calls.push(PlatformCall::GetPost(id.to_string()));
        state
            .posts
            .get(id)
            .map(|p| with_pin_flag(&state, p))
            .ok_or_else(|| FeedpinError::StaleReference(id.to_string()))
    }

    async fn submit_post(&self, post: &NewPost) -> Result<PlatformPost> {
        let mut state = self.lock()?;
        state.calls.push(PlatformCall::Submit(post.url.clone()));
        state.next_id += 1;

        let created = PlatformPost {
            id: format!("mem{}", state.next_id),
            url: Some(post.url.clone()),
            title: post.title.clone(),
            author: self.author.clone(),
            is_pinned: false,
        };
        info!(
            post_id = %created.id,
            flair = %post.flair.text,
            "dry run: created post \"{}\" -> {}",
            post.title,
            post.url
        );
        state.order.push(created.id.clone());
        state.posts.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn pin(&self, id: &str, position: Option<u32>) -> Result<()> {
        let mut state = self.lock()?;
        state.calls.push(PlatformCall::Pin(id.to_string(), position));

        if !state.posts.contains_key(id) {
            return Err(FeedpinError::StaleReference(id.to_string()));
        }
        if state.pinned.iter().any(|p| p == id) {
            return Err(FeedpinError::PinConflict(format!("{} is already pinned", id)));
        }

        let index = match position {
            Some(n) => (n.saturating_sub(1) as usize).min(state.pinned.len()),
            None => state.pinned.len().min(1),
        };
        state.pinned.insert(index, id.to_string());
        info!(post_id = id, ?position, "dry run: pinned post");
        Ok(())
    }

    async fn unpin(&self, id: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.calls.push(PlatformCall::Unpin(id.to_string()));
        state.pinned.retain(|p| p != id);
        Ok(())
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PlatformPost>> {
        let mut state = self.lock()?;
        state.calls.push(PlatformCall::RecentPosts(limit));
        let posts = state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.posts.get(id))
            .take(limit)
            .map(|p| with_pin_flag(&state, p))
            .collect();
        Ok(posts)
    }
}
