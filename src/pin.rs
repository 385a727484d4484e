//! Pin sequencing.
//!
//! The platform pin API is position based and stateful: pinning at position
//! 1 puts a post on top, pinning without a position inserts it directly
//! below the top pin, and pinning an already pinned post fails. To end up
//! with the candidates pinned top-to-bottom in priority order, every
//! candidate is unpinned first, the highest priority post is pinned at
//! position 1, and the rest are pinned without a position from lowest to
//! highest priority.
//!
//! Posts that left their slot during the run are released: they are
//! unpinned and not pinned again.

use tracing::{debug, warn};

use crate::error::Result;
use crate::platform::Platform;

/// One platform pin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOp {
    /// Unpin a post. Failures are tolerated.
    Unpin(String),
    /// Pin a post, at an explicit position or directly below the top pin.
    Pin {
        /// Post id.
        post_id: String,
        /// Explicit position, if any.
        position: Option<u32>,
    },
}

/// Plan the operations that pin `candidates` (highest priority first) in
/// that order and unpin every `released` post that is not also a candidate.
///
/// An empty candidate list yields an empty plan.
pub fn plan_pins(candidates: &[String], released: &[String]) -> Vec<PinOp> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut plan: Vec<PinOp> = Vec::new();
    for id in released {
        let op = PinOp::Unpin(id.clone());
        if !candidates.contains(id) && !plan.contains(&op) {
            plan.push(op);
        }
    }
    plan.extend(candidates.iter().cloned().map(PinOp::Unpin));

    let mut queue: Vec<&String> = candidates.iter().rev().collect();
    if let Some(first) = queue.pop() {
        plan.push(PinOp::Pin {
            post_id: first.clone(),
            position: Some(1),
        });
        plan.extend(queue.into_iter().map(|id| PinOp::Pin {
            post_id: id.clone(),
            position: None,
        }));
    }

    plan
}

/// Applies pin plans to a platform.
pub struct PinSequencer<'a> {
    platform: &'a dyn Platform,
}

impl<'a> PinSequencer<'a> {
    /// Create a sequencer for `platform`.
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self { platform }
    }

    /// Plan and apply pins for `candidates`, releasing `released`, and
    /// return the applied plan.
    pub async fn sequence(
        &self,
        candidates: &[String],
        released: &[String],
    ) -> Result<Vec<PinOp>> {
        let plan = plan_pins(candidates, released);
        self.apply(&plan).await?;
        Ok(plan)
    }

    /// Apply a plan in order.
    ///
    /// Unpin failures are logged and skipped. The first pin failure aborts
    /// the plan and is returned.
    pub async fn apply(&self, plan: &[PinOp]) -> Result<()> {
        for op in plan {
            match op {
                PinOp::Unpin(post_id) => {
                    if let Err(e) = self.platform.unpin(post_id).await {
                        warn!(post_id = %post_id, stage = "unpin", "ignoring unpin failure: {}", e);
                    }
                }
                PinOp::Pin { post_id, position } => {
                    debug!(post_id = %post_id, ?position, "pinning post");
                    self.platform.pin(post_id, *position).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedpinError;
    use crate::platform::{MemoryPlatform, PlatformCall, PlatformPost};

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn seed(platform: &MemoryPlatform, id: &str, pinned: bool) {
        platform
            .insert_post(PlatformPost {
                id: id.to_string(),
                url: Some(format!("https://x/{id}")),
                title: id.to_string(),
                author: "godot-bot".to_string(),
                is_pinned: pinned,
            })
            .unwrap();
    }

    #[test]
    fn test_plan_three() {
        let plan = plan_pins(&ids(&["A", "B", "C"]), &[]);
        assert_eq!(
            plan,
            vec![
                PinOp::Unpin("A".to_string()),
                PinOp::Unpin("B".to_string()),
                PinOp::Unpin("C".to_string()),
                PinOp::Pin {
                    post_id: "A".to_string(),
                    position: Some(1)
                },
                PinOp::Pin {
                    post_id: "C".to_string(),
                    position: None
                },
                PinOp::Pin {
                    post_id: "B".to_string(),
                    position: None
                },
            ]
        );
    }

    #[test]
    fn test_plan_single() {
        let plan = plan_pins(&ids(&["A"]), &[]);
        assert_eq!(
            plan,
            vec![
                PinOp::Unpin("A".to_string()),
                PinOp::Pin {
                    post_id: "A".to_string(),
                    position: Some(1)
                },
            ]
        );
    }

    #[test]
    fn test_plan_empty() {
        assert!(plan_pins(&[], &[]).is_empty());
        assert!(plan_pins(&[], &ids(&["A"])).is_empty());
    }

    #[test]
    fn test_plan_releases_displaced_first() {
        let plan = plan_pins(&ids(&["A", "B"]), &ids(&["X", "B", "X"]));
        assert_eq!(
            plan,
            vec![
                PinOp::Unpin("X".to_string()),
                PinOp::Unpin("A".to_string()),
                PinOp::Unpin("B".to_string()),
                PinOp::Pin {
                    post_id: "A".to_string(),
                    position: Some(1)
                },
                PinOp::Pin {
                    post_id: "B".to_string(),
                    position: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_sequence_unpins_released_posts() {
        let platform = MemoryPlatform::default();
        seed(&platform, "A", true);
        seed(&platform, "OLD", true);
        seed(&platform, "B", false);

        PinSequencer::new(&platform)
            .sequence(&ids(&["A", "B"]), &ids(&["OLD"]))
            .await
            .unwrap();
        assert_eq!(platform.pinned().unwrap(), ids(&["A", "B"]));
    }

    #[tokio::test]
    async fn test_sequence_yields_priority_order() {
        let platform = MemoryPlatform::default();
        for id in ["A", "B", "C", "D"] {
            seed(&platform, id, false);
        }

        PinSequencer::new(&platform)
            .sequence(&ids(&["A", "B", "C", "D"]), &[])
            .await
            .unwrap();
        assert_eq!(platform.pinned().unwrap(), ids(&["A", "B", "C", "D"]));
    }

    #[tokio::test]
    async fn test_sequence_repins_already_pinned() {
        let platform = MemoryPlatform::default();
        seed(&platform, "C", true);
        seed(&platform, "A", true);
        seed(&platform, "B", false);

        PinSequencer::new(&platform)
            .sequence(&ids(&["A", "B", "C"]), &[])
            .await
            .unwrap();
        assert_eq!(platform.pinned().unwrap(), ids(&["A", "B", "C"]));
    }

    #[tokio::test]
    async fn test_sequence_empty_makes_no_calls() {
        let platform = MemoryPlatform::default();
        PinSequencer::new(&platform).sequence(&[], &[]).await.unwrap();
        assert!(platform.calls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pin_failure_surfaces() {
        let platform = MemoryPlatform::default();
        seed(&platform, "A", false);

        // A plan that skips the unpin step hits the already-pinned rule.
        let plan = vec![
            PinOp::Pin {
                post_id: "A".to_string(),
                position: Some(1),
            },
            PinOp::Pin {
                post_id: "A".to_string(),
                position: None,
            },
        ];
        let err = PinSequencer::new(&platform).apply(&plan).await.unwrap_err();
        assert!(matches!(err, FeedpinError::PinConflict(_)));
    }

    #[tokio::test]
    async fn test_unpin_calls_precede_pins() {
        let platform = MemoryPlatform::default();
        seed(&platform, "A", false);
        seed(&platform, "B", false);

        PinSequencer::new(&platform)
            .sequence(&ids(&["A", "B"]), &[])
            .await
            .unwrap();
        assert_eq!(
            platform.calls().unwrap(),
            vec![
                PlatformCall::Unpin("A".to_string()),
                PlatformCall::Unpin("B".to_string()),
                PlatformCall::Pin("A".to_string(), Some(1)),
                PlatformCall::Pin("B".to_string(), None),
            ]
        );
    }
}
