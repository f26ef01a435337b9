pub const SCHEMA: &str = r#"
-- scans table
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    url TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_scans_user_url ON scans(user_id, url, created_at DESC);

-- content_plans table
CREATE TABLE IF NOT EXISTS content_plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    main_topic TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_content_plans_user_topic ON content_plans(user_id, main_topic);

-- content_plan_items table
CREATE TABLE IF NOT EXISTS content_plan_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plan_id INTEGER NOT NULL REFERENCES content_plans(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    publish_date TEXT NOT NULL,
    title TEXT NOT NULL,
    keyword TEXT NOT NULL,
    secondary_keywords TEXT NOT NULL DEFAULT '[]',
    intent TEXT NOT NULL,
    length INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'planned'
);

CREATE INDEX IF NOT EXISTS idx_content_plan_items_plan ON content_plan_items(plan_id, publish_date, position);

-- reports table (rows are written once and never updated)
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    source TEXT NOT NULL,
    kind TEXT NOT NULL,
    file_name TEXT NOT NULL,
    storage_path TEXT NOT NULL UNIQUE,
    file_url TEXT NOT NULL,
    pages INTEGER NOT NULL,
    generated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(user_id, generated_at DESC);

-- subscriptions table (plan per user, absent rows use the default plan)
CREATE TABLE IF NOT EXISTS subscriptions (
    user_id TEXT PRIMARY KEY,
    plan TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- usage_events table
CREATE TABLE IF NOT EXISTS usage_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    feature TEXT NOT NULL,
    period TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_usage_events_user_period ON usage_events(user_id, feature, period);
"#;
