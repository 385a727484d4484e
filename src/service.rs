//! Trigger entry point.
//!
//! Both the timer and the moderator menu call [`StickyService::run_check`];
//! the moderator overrides go through [`StickyService::assign_slot`] and
//! [`StickyService::clear_post`]. Every operation returns the short status
//! message shown to whoever triggered it.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, FeedConfig, LookupKind, ReconcileConfig};
use crate::error::{FeedpinError, Result};
use crate::feed::{parse_items, FeedFetcher};
use crate::platform::Platform;
use crate::reconcile::{
    AuthorHistoryLookup, ExistingPostLookup, ReconcileReport, ReconciliationEngine,
    StoredSlotLookup,
};
use crate::slots::{FlairDefaults, SlotRule, SlotStateStore};

/// Status after a completed run.
pub const STATUS_DONE: &str = "Done!";

/// Status when the feed is switched off in configuration.
pub const STATUS_DISABLED: &str = "RSS is disabled in bot settings";

/// Status after a moderator override.
pub const STATUS_OVERRIDE_DONE: &str = "Done! Please refresh page";

/// Status when a cleared post is not held by any slot.
pub const STATUS_NOT_ASSIGNED: &str = "This post is not in any slot";

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The recurring timer.
    Scheduled,
    /// A moderator from the menu.
    Manual,
}

impl Trigger {
    /// Name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`StickyService::run_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Status message for the caller.
    pub message: String,
    /// Reconciliation report. `None` when the run was skipped.
    pub report: Option<ReconcileReport>,
}

/// Owns everything a run needs and exposes the trigger operations.
pub struct StickyService {
    feed: FeedConfig,
    reconcile: ReconcileConfig,
    rules: Vec<SlotRule>,
    flair: FlairDefaults,
    fetcher: FeedFetcher,
    state: SlotStateStore,
    platform: Arc<dyn Platform>,
}

impl StickyService {
    /// Build the service from configuration, a slot store and a platform.
    pub fn new(config: &Config, state: SlotStateStore, platform: Arc<dyn Platform>) -> Result<Self> {
        Ok(Self {
            feed: config.feed.clone(),
            reconcile: config.reconcile.clone(),
            rules: config.slot_rules(),
            flair: FlairDefaults {
                style: config.platform.flair_style.clone(),
                release_text: config.platform.release_flair_text.clone(),
                news_text: config.platform.news_flair_text.clone(),
            },
            fetcher: FeedFetcher::new(&config.feed)?,
            state,
            platform,
        })
    }

    /// Configured slot numbers, ascending.
    pub fn slot_numbers(&self) -> Vec<u32> {
        self.rules.iter().map(|r| r.number).collect()
    }

    /// Slot state store.
    pub fn state(&self) -> &SlotStateStore {
        &self.state
    }

    /// Fetch the feed and reconcile every slot.
    pub async fn run_check(&self, trigger: Trigger) -> Result<CheckResult> {
        if !self.feed.enabled {
            info!(%trigger, "feed disabled, skipping check");
            return Ok(CheckResult {
                message: STATUS_DISABLED.to_string(),
                report: None,
            });
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", %run_id, %trigger);
        self.reconcile_feed().instrument(span).await
    }

    async fn reconcile_feed(&self) -> Result<CheckResult> {
        info!(
            "Checking for new blog post at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S %Z")
        );

        let text = self.fetcher.fetch(&self.feed.url).await.map_err(|e| {
            warn!(stage = "fetch", url = %self.feed.url, "{}", e);
            e
        })?;
        let items = parse_items(&text, self.feed.max_items).map_err(|e| {
            warn!(stage = "parse", "{}", e);
            e
        })?;
        debug!("parsed {} feed item(s)", items.len());

        let lookup = self.lookup();
        let engine = ReconciliationEngine::new(
            &self.rules,
            &self.state,
            self.platform.as_ref(),
            lookup.as_ref(),
            &self.flair,
        );
        let report = engine.run(&items).await?;

        info!(
            created = report.created_count(),
            pins = report.pins.len(),
            "finished successfully"
        );
        Ok(CheckResult {
            message: STATUS_DONE.to_string(),
            report: Some(report),
        })
    }

    /// Lookup strategy for one run. Listings cached by the lookup must not
    /// outlive the run, so a new one is built each time.
    fn lookup(&self) -> Box<dyn ExistingPostLookup> {
        match self.reconcile.lookup {
            LookupKind::SlotState => Box::new(StoredSlotLookup),
            LookupKind::AuthorHistory => Box::new(AuthorHistoryLookup::new(
                Arc::clone(&self.platform),
                self.reconcile.known_authors.clone(),
                self.reconcile.author_history_limit,
            )),
        }
    }

    /// Put `post_id` into `slot`, bypassing classification.
    ///
    /// The slot must be configured and the post must resolve on the
    /// platform. The slot's previous post is unpinned unless another slot
    /// still holds it. The next run pins the assigned post, or replaces it if
    /// the slot's newest matching item links elsewhere.
    pub async fn assign_slot(&self, slot: u32, post_id: &str) -> Result<String> {
        info!(slot, post_id, "mod action: assign slot");
        if !self.rules.iter().any(|r| r.number == slot) {
            return Err(FeedpinError::Validation(format!(
                "slot {} is not configured",
                slot
            )));
        }

        let post = match self.platform.get_post(post_id).await {
            Ok(post) => post,
            Err(FeedpinError::StaleReference(_)) | Err(FeedpinError::NotFound(_)) => {
                return Err(FeedpinError::NotFound(format!("post {}", post_id)));
            }
            Err(e) => return Err(e),
        };

        let previous = self.state.get(slot).await?;
        self.state.set(slot, &post.id).await?;
        if let Some(previous) = previous.filter(|p| *p != post.id) {
            self.release(&previous).await?;
        }
        info!(slot, post_id = %post.id, "finished successfully");
        Ok(STATUS_OVERRIDE_DONE.to_string())
    }

    /// Clear the lowest-numbered slot holding `post_id`.
    ///
    /// Other slots that also hold the post are left alone. When none does,
    /// the post is unpinned.
    pub async fn clear_post(&self, post_id: &str) -> Result<String> {
        info!(post_id, "mod action: clear slot");
        match self.state.slot_holding(post_id, &self.slot_numbers()).await? {
            Some(slot) => {
                self.state.clear(slot).await?;
                self.release(post_id).await?;
                info!(slot, post_id, "slot cleared");
                Ok(STATUS_OVERRIDE_DONE.to_string())
            }
            None => {
                debug!(post_id, "post is not held by any slot");
                Ok(STATUS_NOT_ASSIGNED.to_string())
            }
        }
    }

    /// Unpin a post that just left a slot, unless another slot holds it.
    /// Unpin failures are logged and ignored.
    async fn release(&self, post_id: &str) -> Result<()> {
        if let Some(slot) = self.state.slot_holding(post_id, &self.slot_numbers()).await? {
            debug!(slot, post_id, "post still held, keeping pin");
            return Ok(());
        }
        if let Err(e) = self.platform.unpin(post_id).await {
            warn!(post_id, stage = "unpin", "ignoring unpin failure: {}", e);
        }
        Ok(())
    }
}

impl fmt::Debug for StickyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StickyService")
            .field("feed_url", &self.feed.url)
            .field("slots", &self.slot_numbers())
            .finish()
    }
}
