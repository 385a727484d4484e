//! Slot module for feedpin.
//!
//! A slot is a numbered pin position with its own classification rule and a
//! durable record of the post currently assigned to it.

pub mod rule;
pub mod store;

pub use rule::{classify, find_match, is_release, Flair, FlairDefaults, ReleaseFilter, SlotRule};
pub use store::{
    slot_key, KvStore, MemoryKvStore, SlotStateStore, SqliteKvStore, SLOT_KEY_PREFIX,
};

/// Highest slot number a deployment can configure.
pub const MAX_SLOTS: u32 = 6;
