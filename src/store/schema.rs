//! SQLite schema definition

/// SQL schema for the catalog database
pub const SCHEMA_SQL: &str = r#"
-- Tools: cataloged digital tools
CREATE TABLE IF NOT EXISTS tools (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    tagline TEXT NOT NULL,
    summary TEXT NOT NULL,
    descriptor TEXT NOT NULL,
    category TEXT,
    tags_json TEXT,
    rating REAL,
    featured INTEGER,
    screenshot TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Per-field search indexes. Each field gets its own FTS table so the
-- aggregator can rank name hits ahead of descriptor hits ahead of tag hits.
CREATE VIRTUAL TABLE IF NOT EXISTS tools_name_fts USING fts5(
    tool_id UNINDEXED,
    name
);

CREATE VIRTUAL TABLE IF NOT EXISTS tools_descriptor_fts USING fts5(
    tool_id UNINDEXED,
    descriptor
);

CREATE VIRTUAL TABLE IF NOT EXISTS tools_tags_fts USING fts5(
    tool_id UNINDEXED,
    tags
);

-- Bookmarks: join entity between a user and a tool
CREATE TABLE IF NOT EXISTS bookmarks (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    tool_id TEXT NOT NULL REFERENCES tools(id),
    created_at TEXT NOT NULL,
    UNIQUE(user_id, tool_id)
);

-- Chat messages: one row per assistant turn, append-only
CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    user_id TEXT,
    message TEXT NOT NULL,
    response TEXT NOT NULL,
    recommendations_json TEXT,
    prompt_tokens INTEGER,
    completion_tokens INTEGER,
    total_tokens INTEGER,
    created_at TEXT NOT NULL
);

-- Search log: append-only, aggregated for popularity ranking
CREATE TABLE IF NOT EXISTS searches (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    query TEXT NOT NULL,
    results_count INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_tools_category ON tools(category);
CREATE INDEX IF NOT EXISTS idx_tools_featured ON tools(featured);
CREATE INDEX IF NOT EXISTS idx_tools_recency ON tools(created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_bookmarks_user ON bookmarks(user_id);
CREATE INDEX IF NOT EXISTS idx_chat_session ON chat_messages(session_id);
CREATE INDEX IF NOT EXISTS idx_searches_query ON searches(query);
"#;
