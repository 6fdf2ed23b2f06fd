pub const SCHEMA: &str = r#"
-- Samples and datasets, only the fields file storage reads
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,                -- 'sample' or 'dataset'
    name TEXT NOT NULL,
    date TEXT NOT NULL,                -- YYYY-MM-DD, drives the folder year
    creation_date TEXT DEFAULT (datetime('now')),
    assay TEXT,
    alternate_names TEXT NOT NULL DEFAULT '[]',  -- JSON array of filename fragments

    UNIQUE(kind, name)
);

-- Files opened to anonymous download until their expiry day
CREATE TABLE IF NOT EXISTS public_files (
    id TEXT PRIMARY KEY,
    entity_kind TEXT NOT NULL,
    entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    path TEXT NOT NULL,                -- relative to the entity folder, '/'-separated
    expiry_date TEXT NOT NULL,         -- YYYY-MM-DD, inclusive
    created_at TEXT DEFAULT (datetime('now')),

    UNIQUE(entity_kind, entity_id, path)
);

-- Management API credentials
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_public_files_expiry ON public_files(expiry_date);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
"#;
