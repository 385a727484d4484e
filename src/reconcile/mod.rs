//! Slot reconciliation.
//!
//! For each slot, in slot-number order, the engine resolves the post the
//! slot currently holds, finds the newest feed item the slot's rule accepts,
//! creates a post for it when none exists yet, and records the result in the
//! slot state before moving on. Once all slots are processed, the collected
//! posts are pinned in slot order.
//!
//! A slot without a matching item keeps its state and its pin, and so does a
//! slot that does not follow the feed. A post that a slot gives up for a
//! new one is unpinned unless another slot still holds it. When no slot
//! matches anything, no pin operation is issued at all.

pub mod lookup;

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::{FeedpinError, Result};
use crate::feed::FeedItem;
use crate::pin::{PinOp, PinSequencer};
use crate::platform::{NewPost, Platform, PlatformPost};
use crate::slots::{find_match, FlairDefaults, SlotRule, SlotStateStore};

pub use lookup::{AuthorHistoryLookup, ExistingPostLookup, StoredSlotLookup};

/// What happened to one slot during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// A new post was created for the slot's newest matching item.
    Created {
        /// Slot number.
        slot: u32,
        /// Id of the created post.
        post_id: String,
        /// Feed item link.
        link: String,
    },
    /// The newest matching item already had a post.
    Reused {
        /// Slot number.
        slot: u32,
        /// Id of the existing post.
        post_id: String,
        /// Feed item link.
        link: String,
    },
    /// Nothing matched; the slot keeps its current post.
    Retained {
        /// Slot number.
        slot: u32,
        /// Id of the kept post.
        post_id: String,
    },
    /// Nothing matched and the slot holds no live post.
    Unmatched {
        /// Slot number.
        slot: u32,
    },
}

impl SlotOutcome {
    /// Slot number.
    pub fn slot(&self) -> u32 {
        match self {
            SlotOutcome::Created { slot, .. }
            | SlotOutcome::Reused { slot, .. }
            | SlotOutcome::Retained { slot, .. }
            | SlotOutcome::Unmatched { slot } => *slot,
        }
    }

    /// Post held by the slot after the run, if any.
    pub fn post_id(&self) -> Option<&str> {
        match self {
            SlotOutcome::Created { post_id, .. }
            | SlotOutcome::Reused { post_id, .. }
            | SlotOutcome::Retained { post_id, .. } => Some(post_id),
            SlotOutcome::Unmatched { .. } => None,
        }
    }
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Per-slot outcomes, in slot order.
    pub outcomes: Vec<SlotOutcome>,
    /// Pin operations that were applied.
    pub pins: Vec<PinOp>,
}

impl ReconcileReport {
    /// Number of posts created.
    pub fn created_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SlotOutcome::Created { .. }))
            .count()
    }

    /// Outcome for a slot.
    pub fn outcome(&self, slot: u32) -> Option<&SlotOutcome> {
        self.outcomes.iter().find(|o| o.slot() == slot)
    }
}

/// Reconciles slot state and pins against a fetched feed.
pub struct ReconciliationEngine<'a> {
    rules: Vec<SlotRule>,
    state: &'a SlotStateStore,
    platform: &'a dyn Platform,
    lookup: &'a dyn ExistingPostLookup,
    flair: &'a FlairDefaults,
}

impl<'a> ReconciliationEngine<'a> {
    /// Create an engine. Rules are processed in slot-number order.
    pub fn new(
        rules: &[SlotRule],
        state: &'a SlotStateStore,
        platform: &'a dyn Platform,
        lookup: &'a dyn ExistingPostLookup,
        flair: &'a FlairDefaults,
    ) -> Self {
        let mut rules = rules.to_vec();
        rules.sort_by_key(|r| r.number);
        Self {
            rules,
            state,
            platform,
            lookup,
            flair,
        }
    }

    /// Run reconciliation over `items` (newest first).
    ///
    /// Slot state is written as soon as each slot is decided, so a failure
    /// later in the run never forgets a post that was already created.
    pub async fn run(&self, items: &[FeedItem]) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut candidates: Vec<String> = Vec::new();
        // Posts replaced in their slot during this run.
        let mut displaced: Vec<String> = Vec::new();
        // Posts resolved or created during this run, by link.
        let mut by_link: HashMap<String, PlatformPost> = HashMap::new();
        let mut any_match = false;

        for rule in &self.rules {
            let slot = rule.number;
            let stored_id = self.state.get(slot).await?;
            let stored = match &stored_id {
                Some(post_id) => self.resolve_stored(slot, post_id).await?,
                None => None,
            };

            let matched = if rule.from_feed {
                debug!(slot, "checking feed for slot");
                find_match(items, rule)
            } else {
                debug!(slot, "slot does not follow the feed");
                None
            };

            let Some(item) = matched else {
                let outcome = match stored {
                    Some(post) => {
                        debug!(slot, post_id = %post.id, "no matching item, keeping current post");
                        candidates.push(post.id.clone());
                        SlotOutcome::Retained {
                            slot,
                            post_id: post.id,
                        }
                    }
                    None => {
                        debug!(slot, "no matching item");
                        SlotOutcome::Unmatched { slot }
                    }
                };
                report.outcomes.push(outcome);
                continue;
            };

            any_match = true;
            info!(slot, link = %item.link, "found latest item for slot");

            let existing = match by_link.get(&item.link) {
                Some(post) => Some(post.clone()),
                None => self.lookup.find_existing(item, stored.as_ref()).await?,
            };

            let (post, created) = match existing {
                Some(post) => (post, false),
                None => {
                    info!(slot, link = %item.link, "no post for item, creating one");
                    (self.create_post(rule, item).await?, true)
                }
            };

            self.state.set(slot, &post.id).await.map_err(|e| {
                warn!(slot, post_id = %post.id, stage = "save", "failed to save slot state: {}", e);
                e
            })?;

            if let Some(old) = stored_id.filter(|old| *old != post.id) {
                debug!(slot, post_id = %old, "post left its slot");
                displaced.push(old);
            }

            candidates.push(post.id.clone());
            report.outcomes.push(if created {
                SlotOutcome::Created {
                    slot,
                    post_id: post.id.clone(),
                    link: item.link.clone(),
                }
            } else {
                SlotOutcome::Reused {
                    slot,
                    post_id: post.id.clone(),
                    link: item.link.clone(),
                }
            });
            by_link.insert(item.link.clone(), post);
        }

        if any_match {
            let mut seen = HashSet::new();
            candidates.retain(|id| seen.insert(id.clone()));

            report.pins = PinSequencer::new(self.platform)
                .sequence(&candidates, &displaced)
                .await
                .map_err(|e| {
                    warn!(stage = "pin", "pin sequencing failed: {}", e);
                    e
                })?;
        } else {
            debug!("no slot matched a feed item, leaving pins unchanged");
        }

        Ok(report)
    }

    /// Resolve the slot's stored post. A post that no longer exists reads as
    /// an empty slot.
    async fn resolve_stored(&self, slot: u32, post_id: &str) -> Result<Option<PlatformPost>> {
        match self.platform.get_post(post_id).await {
            Ok(post) => Ok(Some(post)),
            Err(e @ (FeedpinError::StaleReference(_) | FeedpinError::NotFound(_))) => {
                warn!(slot, post_id = %post_id, stage = "resolve", "treating slot as empty: {}", e);
                Ok(None)
            }
            Err(e) => {
                warn!(slot, post_id = %post_id, stage = "resolve", "failed to load saved post: {}", e);
                Err(e)
            }
        }
    }

    async fn create_post(&self, rule: &SlotRule, item: &FeedItem) -> Result<PlatformPost> {
        let new_post = NewPost {
            title: item.title.clone(),
            url: item.link.clone(),
            text: item.summary.clone(),
            flair: rule.flair_for(item, self.flair),
        };

        self.platform.submit_post(&new_post).await.map_err(|e| {
            warn!(slot = rule.number, link = %item.link, stage = "create", "failed to create post: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::platform::{MemoryPlatform, PlatformCall};
    use crate::slots::{MemoryKvStore, ReleaseFilter};

    struct Fixture {
        platform: MemoryPlatform,
        state: SlotStateStore,
        flair: FlairDefaults,
        rules: Vec<SlotRule>,
    }

    impl Fixture {
        fn new(rules: Vec<SlotRule>) -> Self {
            Self {
                platform: MemoryPlatform::new("godot-bot"),
                state: SlotStateStore::new(Arc::new(MemoryKvStore::new())),
                flair: FlairDefaults {
                    style: "blue".to_string(),
                    release_text: "official - releases".to_string(),
                    news_text: "official - news".to_string(),
                },
                rules,
            }
        }

        fn godot() -> Self {
            Self::new(vec![
                SlotRule::new(1).with_release(ReleaseFilter::NonRelease),
                SlotRule::new(2)
                    .with_release(ReleaseFilter::Release)
                    .with_title("Godot 4"),
                SlotRule::new(3)
                    .with_release(ReleaseFilter::Release)
                    .with_title("Godot 3"),
            ])
        }

        async fn run(&self, items: &[FeedItem]) -> Result<ReconcileReport> {
            ReconciliationEngine::new(
                &self.rules,
                &self.state,
                &self.platform,
                &StoredSlotLookup,
                &self.flair,
            )
            .run(items)
            .await
        }

        /// Non-empty slot states in slot order, each post once.
        async fn held(&self) -> Vec<String> {
            let mut held: Vec<String> = Vec::new();
            for rule in &self.rules {
                if let Some(id) = self.state.get(rule.number).await.unwrap() {
                    if !held.contains(&id) {
                        held.push(id);
                    }
                }
            }
            held
        }
    }

    fn feed() -> Vec<FeedItem> {
        vec![
            FeedItem::new("https://g/4.3", "Godot 4.3 released", "4.3 summary", "Release"),
            FeedItem::new("https://g/news", "Showcase", "news summary", "News"),
            FeedItem::new("https://g/3.6", "Godot 3.6 released", "3.6 summary", "Release"),
            FeedItem::new("https://g/4.2", "Godot 4.2 released", "4.2 summary", "Release"),
        ]
    }

    #[tokio::test]
    async fn test_first_run_creates_and_pins() {
        let fx = Fixture::godot();
        let report = fx.run(&feed()).await.unwrap();

        assert_eq!(report.created_count(), 3);
        let ids: Vec<String> = (1..=3)
            .map(|s| report.outcome(s).unwrap().post_id().unwrap().to_string())
            .collect();

        for (slot, id) in (1..=3).zip(&ids) {
            assert_eq!(fx.state.get(slot).await.unwrap().as_ref(), Some(id));
        }
        assert!(fx.platform.post(&ids[0]).unwrap().unwrap().links_to("https://g/news"));
        assert!(fx.platform.post(&ids[1]).unwrap().unwrap().links_to("https://g/4.3"));
        assert!(fx.platform.post(&ids[2]).unwrap().unwrap().links_to("https://g/3.6"));
        assert_eq!(fx.platform.pinned().unwrap(), ids);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let fx = Fixture::godot();
        fx.run(&feed()).await.unwrap();
        let pinned = fx.platform.pinned().unwrap();

        let report = fx.run(&feed()).await.unwrap();
        assert_eq!(report.created_count(), 0);
        assert_eq!(fx.platform.submitted_count().unwrap(), 3);
        assert_eq!(fx.platform.pinned().unwrap(), pinned);
        assert!(matches!(report.outcome(2), Some(SlotOutcome::Reused { .. })));
    }

    #[tokio::test]
    async fn test_new_item_replaces_slot_post() {
        let fx = Fixture::godot();
        fx.run(&feed()).await.unwrap();
        let old = fx.state.get(2).await.unwrap().unwrap();

        let mut items = feed();
        items.insert(
            0,
            FeedItem::new("https://g/4.4", "Godot 4.4 released", "s", "Release"),
        );
        let report = fx.run(&items).await.unwrap();

        assert_eq!(report.created_count(), 1);
        let new = fx.state.get(2).await.unwrap().unwrap();
        assert_ne!(new, old);
        assert!(fx.platform.post(&new).unwrap().unwrap().links_to("https://g/4.4"));
        assert_eq!(fx.platform.pinned().unwrap(), fx.held().await);
        assert!(!fx.platform.post(&old).unwrap().unwrap().is_pinned);
        assert!(report.pins.contains(&PinOp::Unpin(old)));
    }

    #[tokio::test]
    async fn test_replaced_post_kept_pinned_while_another_slot_holds_it() {
        let fx = Fixture::new(vec![
            SlotRule::new(1).with_title("Godot 4"),
            SlotRule::manual(2),
        ]);
        fx.run(&feed()).await.unwrap();
        let first = fx.state.get(1).await.unwrap().unwrap();
        fx.state.set(2, &first).await.unwrap();

        let mut items = feed();
        items.insert(
            0,
            FeedItem::new("https://g/4.4", "Godot 4.4 released", "s", "Release"),
        );
        fx.run(&items).await.unwrap();

        let newest = fx.state.get(1).await.unwrap().unwrap();
        assert_ne!(newest, first);
        assert_eq!(fx.platform.pinned().unwrap(), vec![newest, first]);
    }

    #[tokio::test]
    async fn test_stale_reference_recreates() {
        let fx = Fixture::godot();
        fx.run(&feed()).await.unwrap();
        let old = fx.state.get(1).await.unwrap().unwrap();
        fx.platform.remove_post(&old).unwrap();

        let report = fx.run(&feed()).await.unwrap();
        assert_eq!(report.created_count(), 1);
        assert!(matches!(report.outcome(1), Some(SlotOutcome::Created { .. })));
        assert_ne!(fx.state.get(1).await.unwrap().unwrap(), old);
        assert_eq!(fx.platform.pinned().unwrap(), fx.held().await);
    }

    #[tokio::test]
    async fn test_manual_slot_ignores_feed() {
        let fx = Fixture::new(vec![
            SlotRule::new(1).with_release(ReleaseFilter::NonRelease),
            SlotRule::manual(2),
        ]);
        fx.platform
            .insert_post(PlatformPost {
                id: "mod1".to_string(),
                url: Some("https://example.com/rules".to_string()),
                title: "Subreddit rules".to_string(),
                author: "moderator".to_string(),
                is_pinned: false,
            })
            .unwrap();
        fx.state.set(2, "mod1").await.unwrap();

        let report = fx.run(&feed()).await.unwrap();

        assert_eq!(report.created_count(), 1);
        assert_eq!(
            report.outcome(2),
            Some(&SlotOutcome::Retained {
                slot: 2,
                post_id: "mod1".to_string()
            })
        );
        assert_eq!(fx.state.get(2).await.unwrap().as_deref(), Some("mod1"));
        let news = fx.state.get(1).await.unwrap().unwrap();
        assert_eq!(fx.platform.pinned().unwrap(), vec![news, "mod1".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_manual_slot_is_unmatched() {
        let fx = Fixture::new(vec![SlotRule::new(1), SlotRule::manual(2)]);
        let report = fx.run(&feed()).await.unwrap();

        assert_eq!(report.outcome(2), Some(&SlotOutcome::Unmatched { slot: 2 }));
        assert_eq!(fx.platform.submitted_count().unwrap(), 1);
        assert_eq!(fx.platform.pinned().unwrap(), fx.held().await);
    }

    #[tokio::test]
    async fn test_unmatched_slot_keeps_state_and_pin() {
        let fx = Fixture::godot();
        fx.run(&feed()).await.unwrap();
        let slot3 = fx.state.get(3).await.unwrap().unwrap();

        // Godot 3 item dropped off the feed.
        let items: Vec<FeedItem> = feed()
            .into_iter()
            .filter(|i| !i.title.contains("Godot 3"))
            .collect();
        let report = fx.run(&items).await.unwrap();

        assert!(matches!(report.outcome(3), Some(SlotOutcome::Retained { .. })));
        assert_eq!(fx.state.get(3).await.unwrap().unwrap(), slot3);
        assert_eq!(fx.platform.pinned().unwrap().last(), Some(&slot3));
    }

    #[tokio::test]
    async fn test_unmatched_empty_slot_is_left_alone() {
        let fx = Fixture::godot();
        let items = vec![FeedItem::new("https://g/news", "Showcase", "s", "News")];
        let report = fx.run(&items).await.unwrap();

        assert_eq!(report.outcome(2), Some(&SlotOutcome::Unmatched { slot: 2 }));
        assert_eq!(fx.state.get(2).await.unwrap(), None);
        assert_eq!(fx.platform.pinned().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_feed_changes_nothing() {
        let fx = Fixture::godot();
        fx.run(&feed()).await.unwrap();
        let before: Vec<Option<String>> = vec![
            fx.state.get(1).await.unwrap(),
            fx.state.get(2).await.unwrap(),
            fx.state.get(3).await.unwrap(),
        ];
        fx.platform.clear_calls().unwrap();

        let report = fx.run(&[]).await.unwrap();

        assert!(report.pins.is_empty());
        let calls = fx.platform.calls().unwrap();
        assert!(calls
            .iter()
            .all(|c| matches!(c, PlatformCall::GetPost(_))));
        for (slot, expected) in (1..=3).zip(before) {
            assert_eq!(fx.state.get(slot).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_same_item_in_two_slots_creates_one_post() {
        let fx = Fixture::new(vec![
            SlotRule::new(1),
            SlotRule::new(2).with_title("Godot 4"),
        ]);
        let report = fx.run(&feed()).await.unwrap();

        assert_eq!(report.created_count(), 1);
        let id = fx.state.get(1).await.unwrap().unwrap();
        assert_eq!(fx.state.get(2).await.unwrap().unwrap(), id);
        assert_eq!(fx.platform.pinned().unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn test_rules_processed_in_slot_order() {
        let fx = Fixture::new(vec![
            SlotRule::new(5).with_title("Godot 3"),
            SlotRule::new(2).with_title("Godot 4"),
        ]);
        let report = fx.run(&feed()).await.unwrap();

        let slots: Vec<u32> = report.outcomes.iter().map(SlotOutcome::slot).collect();
        assert_eq!(slots, vec![2, 5]);
        let pinned = fx.platform.pinned().unwrap();
        assert_eq!(pinned[0], fx.state.get(2).await.unwrap().unwrap());
        assert_eq!(pinned[1], fx.state.get(5).await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_posts_created_in_slot_order() {
        let fx = Fixture::godot();
        fx.run(&feed()).await.unwrap();

        let calls = fx.platform.calls().unwrap();
        let submits: Vec<&PlatformCall> = calls
            .iter()
            .filter(|c| matches!(c, PlatformCall::Submit(_)))
            .collect();
        assert_eq!(
            submits,
            vec![
                &PlatformCall::Submit("https://g/news".to_string()),
                &PlatformCall::Submit("https://g/4.3".to_string()),
                &PlatformCall::Submit("https://g/3.6".to_string()),
            ]
        );
        let post = fx.platform.post(&fx.state.get(1).await.unwrap().unwrap()).unwrap().unwrap();
        assert_eq!(post.title, "Showcase");
    }
}
