//! Database schema and migrations for feedpin.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: generic key-value store backing slot state
    r#"
CREATE TABLE kv_store (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,           -- empty string means "unassigned"
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
];
