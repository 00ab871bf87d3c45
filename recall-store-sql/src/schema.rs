//! Database schema definitions for the metadata store.

/// SQL to create the facts metadata table
pub const CREATE_FACTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS facts_metadata (
    fact_id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    category TEXT NOT NULL,
    confidence REAL NOT NULL,
    entities TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,
    meta_data TEXT NOT NULL DEFAULT '{}'
)
"#;

/// SQL to create the jobs table
pub const CREATE_JOBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    conversation_id TEXT NOT NULL,
    status TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    current_step TEXT NOT NULL DEFAULT '',
    data TEXT NOT NULL DEFAULT '{}',
    error TEXT,
    created_at INTEGER NOT NULL,
    completed_at INTEGER
)
"#;

/// SQL to create the favourite summary table
pub const CREATE_FAVORITE_SUMMARY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_favorite_summary (
    user_id TEXT PRIMARY KEY NOT NULL,
    summary_json TEXT NOT NULL,
    last_updated INTEGER NOT NULL
)
"#;

/// Index on fact ownership for per-user listings
pub const CREATE_FACTS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_facts_metadata_user_id
ON facts_metadata(user_id)
"#;

/// Index on fact category for bucketed queries
pub const CREATE_FACTS_CATEGORY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_facts_metadata_category
ON facts_metadata(category)
"#;

/// Index on fact recency for newest-first listings
pub const CREATE_FACTS_CREATED_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_facts_metadata_created_at
ON facts_metadata(created_at DESC)
"#;

/// Index on job ownership and recency
pub const CREATE_JOBS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_jobs_user_created
ON jobs(user_id, created_at)
"#;

/// Index on job status for reconciler polls
pub const CREATE_JOBS_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_jobs_status
ON jobs(status)
"#;

/// All statements run by schema initialisation, in order.
pub const ALL_STATEMENTS: [&str; 8] = [
    CREATE_FACTS_TABLE,
    CREATE_JOBS_TABLE,
    CREATE_FAVORITE_SUMMARY_TABLE,
    CREATE_FACTS_USER_INDEX,
    CREATE_FACTS_CATEGORY_INDEX,
    CREATE_FACTS_CREATED_INDEX,
    CREATE_JOBS_USER_INDEX,
    CREATE_JOBS_STATUS_INDEX,
];
