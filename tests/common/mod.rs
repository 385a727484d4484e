//! Test helpers for integration tests.
//!
//! Serves a feed from a wiremock server and wires a [`StickyService`] to an
//! in-memory platform and an in-memory SQLite slot store.

#![allow(dead_code)]

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedpin::platform::{MemoryPlatform, PlatformPost};
use feedpin::slots::{SlotStateStore, SqliteKvStore};
use feedpin::{Config, Database, StickyService};

/// Path the feed is served under.
pub const FEED_PATH: &str = "/rss.xml";

/// Author of posts created by the bot.
pub const BOT_AUTHOR: &str = "godot-bot";

/// One `<item>` block.
pub fn item(link: &str, title: &str, summary: &str, category: &str) -> String {
    format!(
        "<item><title>{title}</title><link>{link}</link>\
         <summary>{summary}</summary><category>{category}</category></item>"
    )
}

/// A release item linking to `https://godotengine.org/<slug>`.
pub fn release(slug: &str, title: &str) -> String {
    item(
        &link(slug),
        title,
        &format!("{title} is out."),
        "Release",
    )
}

/// A news item linking to `https://godotengine.org/<slug>`.
pub fn news(slug: &str, title: &str) -> String {
    item(&link(slug), title, &format!("{title}."), "News")
}

/// Article URL for `slug`.
pub fn link(slug: &str) -> String {
    format!("https://godotengine.org/article/{slug}")
}

/// Wrap item blocks into an RSS document.
pub fn feed(items: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel>\
         <title>Godot Engine</title>{}</channel></rss>",
        items.concat()
    )
}

/// The reference feed: releases for both branches plus news.
pub fn godot_feed() -> String {
    feed(&[
        release("godot-4-3", "Godot 4.3 released"),
        news("showcase", "Showcase: Brotato"),
        release("godot-3-6", "Godot 3.6 released"),
        news("sprint", "Dev sprint"),
        release("godot-4-2", "Godot 4.2 released"),
    ])
}

/// Service under test with its collaborators.
pub struct Harness {
    pub server: MockServer,
    pub platform: Arc<MemoryPlatform>,
    pub service: Arc<StickyService>,
    pub state: SlotStateStore,
    pub db: Database,
}

impl Harness {
    /// Harness with the default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Harness with a configuration adjusted by `adjust`. The feed URL always
    /// points at the mock server.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let server = MockServer::start().await;

        let mut config = Config::default();
        config.feed.url = format!("{}{}", server.uri(), FEED_PATH);
        config.feed.check_interval_secs = 0;
        adjust(&mut config);
        config.validate().expect("test config is valid");

        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let state = SlotStateStore::new(Arc::new(SqliteKvStore::new(&db)));
        let platform = Arc::new(MemoryPlatform::new(BOT_AUTHOR));
        let service = StickyService::new(&config, state.clone(), platform.clone())
            .expect("Failed to create service");

        Self {
            server,
            platform,
            service: Arc::new(service),
            state,
            db,
        }
    }

    /// Replace whatever the mock server serves with `body`.
    pub async fn serve_feed(&self, body: String) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Make the feed URL fail with `status`.
    pub async fn fail_feed(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Post id stored for `slot`.
    pub async fn slot(&self, slot: u32) -> Option<String> {
        self.state.get(slot).await.expect("slot read")
    }

    /// Link of the post stored for `slot`.
    pub async fn slot_link(&self, slot: u32) -> Option<String> {
        let id = self.slot(slot).await?;
        self.platform
            .post(&id)
            .expect("platform read")
            .and_then(|p| p.url)
    }

    /// Non-empty slot states in slot order, each post once.
    pub async fn held(&self) -> Vec<String> {
        let mut held: Vec<String> = Vec::new();
        for slot in self.service.slot_numbers() {
            if let Some(id) = self.slot(slot).await {
                if !held.contains(&id) {
                    held.push(id);
                }
            }
        }
        held
    }

    /// Assert that exactly the posts held by slots are pinned, in slot order.
    pub async fn assert_pins_match_slots(&self) {
        assert_eq!(self.platform.pinned().expect("platform read"), self.held().await);
    }

    /// Add a post that was not created by the service.
    pub fn insert_post(&self, id: &str, url: &str, author: &str) {
        self.platform
            .insert_post(PlatformPost {
                id: id.to_string(),
                url: Some(url.to_string()),
                title: id.to_string(),
                author: author.to_string(),
                is_pinned: false,
            })
            .expect("platform write");
    }
}
