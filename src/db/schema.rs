pub const SCHEMA: &str = r#"
-- Dimensional profiles: per-image, per-advisor critique scores
CREATE TABLE IF NOT EXISTS dimensional_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    advisor_id TEXT NOT NULL,
    image_path TEXT NOT NULL,
    job_id TEXT,

    -- Per-dimension data as JSON objects keyed by dimension name
    scores TEXT NOT NULL,
    comments TEXT,
    teaching_points TEXT,

    -- Reference metadata
    title TEXT,
    photo_date TEXT,
    location TEXT,
    significance TEXT,
    description TEXT,
    techniques TEXT,  -- JSON array

    -- Analysis output
    overall_grade TEXT,
    image_description TEXT,
    rendered_analysis TEXT,

    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,

    UNIQUE(advisor_id, image_path)
);

CREATE INDEX IF NOT EXISTS idx_profiles_advisor ON dimensional_profiles(advisor_id);
CREATE INDEX IF NOT EXISTS idx_profiles_image ON dimensional_profiles(image_path);

-- Book passages: curated excerpts tagged by dimension
CREATE TABLE IF NOT EXISTS book_passages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    advisor_id TEXT NOT NULL,
    book_title TEXT NOT NULL,
    passage_text TEXT NOT NULL,
    dimension_tags TEXT NOT NULL,  -- JSON array of dimension names, non-empty
    embedding BLOB,                -- float32 array stored as bytes, produced externally
    embedding_dim INTEGER,
    relevance_score REAL NOT NULL DEFAULT 1.0,
    source TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_passages_advisor ON book_passages(advisor_id);
"#;

/// Idempotent migrations applied after the base schema. Each statement is
/// allowed to fail (column already exists) so older databases upgrade in
/// place.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE dimensional_profiles ADD COLUMN job_id TEXT",
    "ALTER TABLE dimensional_profiles ADD COLUMN teaching_points TEXT",
    "ALTER TABLE book_passages ADD COLUMN notes TEXT",
];
