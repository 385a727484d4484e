//! feedpin - feed-driven sticky posts
//!
//! Polls a blog feed, creates a community post for the newest item each
//! slot's rule accepts, and keeps those posts pinned in slot order.
//! Moderators can override a slot by hand or clear it.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod pin;
pub mod platform;
pub mod reconcile;
pub mod service;
pub mod slots;
pub mod updater;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{FeedpinError, Result};
pub use feed::{parse_items, FeedFetcher, FeedItem};
pub use pin::{plan_pins, PinOp, PinSequencer};
pub use platform::{MemoryPlatform, NewPost, Platform, PlatformPost, RedditClient};
pub use reconcile::{ReconcileReport, ReconciliationEngine, SlotOutcome};
pub use service::{CheckResult, StickyService, Trigger};
pub use slots::{classify, find_match, is_release, SlotRule, SlotStateStore};
pub use updater::{start_feed_updater, FeedUpdater};
pub use web::WebServer;
