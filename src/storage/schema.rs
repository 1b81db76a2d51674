//! Database schema definitions

/// SQL to create the posts table
pub const CREATE_POSTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    platform TEXT NOT NULL,
    author TEXT NOT NULL,
    author_display_name TEXT NOT NULL,
    content TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    replies INTEGER NOT NULL DEFAULT 0,
    raw INTEGER NOT NULL DEFAULT 0,
    scraped_at TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
)
"#;

/// SQL to create the filtered_posts table
pub const CREATE_FILTERED_POSTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS filtered_posts (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    relevance_score REAL NOT NULL DEFAULT 0,
    category TEXT NOT NULL,
    sub_category TEXT NOT NULL,
    reason TEXT NOT NULL,
    summary TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    filtered_at TEXT NOT NULL
)
"#;

/// SQL to create the discovery_results table
pub const CREATE_DISCOVERY_RESULTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS discovery_results (
    id TEXT PRIMARY KEY,
    post_id TEXT NOT NULL,
    sentiment TEXT,
    kol_profile TEXT,
    trend_data TEXT,
    alert_triggers TEXT NOT NULL DEFAULT '[]',
    analyzed_at TEXT NOT NULL
)
"#;

/// SQL to create the sources table
pub const CREATE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    config TEXT NOT NULL DEFAULT '{}',
    enabled INTEGER NOT NULL DEFAULT 1,
    last_fetched TEXT,
    fetch_interval INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the cleanup_rules table
pub const CREATE_CLEANUP_RULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cleanup_rules (
    id TEXT PRIMARY KEY,
    target_type TEXT NOT NULL,
    condition TEXT NOT NULL,
    threshold INTEGER NOT NULL,
    action TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    last_run TEXT
)
"#;

/// SQL to create the archived_posts table
pub const CREATE_ARCHIVED_POSTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS archived_posts (
    id TEXT PRIMARY KEY,
    original_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    author TEXT NOT NULL,
    content TEXT NOT NULL,
    archived_at TEXT NOT NULL,
    reason TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
)
"#;

/// SQL to create the relations table (directed kind-tagged edges)
pub const CREATE_RELATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_id TEXT NOT NULL,
    to_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    UNIQUE(from_id, to_id, kind)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_posts_scraped_at ON posts(scraped_at)",
    "CREATE INDEX IF NOT EXISTS idx_posts_platform ON posts(platform)",
    "CREATE INDEX IF NOT EXISTS idx_filtered_relevance ON filtered_posts(relevance_score)",
    "CREATE INDEX IF NOT EXISTS idx_filtered_category ON filtered_posts(category)",
    "CREATE INDEX IF NOT EXISTS idx_filtered_filtered_at ON filtered_posts(filtered_at)",
    "CREATE INDEX IF NOT EXISTS idx_discovery_analyzed_at ON discovery_results(analyzed_at)",
    "CREATE INDEX IF NOT EXISTS idx_archived_original ON archived_posts(original_id)",
    "CREATE INDEX IF NOT EXISTS idx_relations_from ON relations(from_id)",
    "CREATE INDEX IF NOT EXISTS idx_relations_to ON relations(to_id)",
    "CREATE INDEX IF NOT EXISTS idx_relations_kind ON relations(kind)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_POSTS_TABLE,
        CREATE_FILTERED_POSTS_TABLE,
        CREATE_DISCOVERY_RESULTS_TABLE,
        CREATE_SOURCES_TABLE,
        CREATE_CLEANUP_RULES_TABLE,
        CREATE_ARCHIVED_POSTS_TABLE,
        CREATE_RELATIONS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
