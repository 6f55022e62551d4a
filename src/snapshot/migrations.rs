pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS source_days (
    day TEXT PRIMARY KEY,
    source_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_source_days_updated
    ON source_days(updated_at DESC);
"#;
