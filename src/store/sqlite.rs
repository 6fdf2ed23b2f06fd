use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(
    index: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
}

fn get_date(row: &Row<'_>, index: usize) -> rusqlite::Result<NaiveDate> {
    let value: String = row.get(index)?;
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|e| conversion_error(index, e))
}

fn get_kind(row: &Row<'_>, index: usize) -> rusqlite::Result<EntityKind> {
    let value: String = row.get(index)?;
    value.parse().map_err(|e| conversion_error(index, e))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

const ENTITY_COLUMNS: &str = "id, kind, name, date, creation_date, assay, alternate_names";

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<EntityRecord> {
    let alternate_names: String = row.get(6)?;
    Ok(EntityRecord {
        id: row.get(0)?,
        kind: get_kind(row, 1)?,
        name: row.get(2)?,
        date: get_date(row, 3)?,
        creation_date: parse_datetime(&row.get::<_, String>(4)?),
        assay: row.get(5)?,
        alternate_names: serde_json::from_str(&alternate_names)
            .map_err(|e| conversion_error(6, e))?,
    })
}

const PUBLIC_FILE_COLUMNS: &str = "id, entity_kind, entity_id, path, expiry_date, created_at";

fn public_file_from_row(row: &Row<'_>) -> rusqlite::Result<PublicFileGrant> {
    Ok(PublicFileGrant {
        id: row.get(0)?,
        entity_kind: get_kind(row, 1)?,
        entity_id: row.get(2)?,
        path: row.get(3)?,
        expiry_date: get_date(row, 4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Entity catalog operations

    fn create_entity(&self, entity: &EntityRecord) -> Result<()> {
        let alternate_names = serde_json::to_string(&entity.alternate_names)
            .map_err(|e| Error::invalid(format!("alternate names: {e}")))?;
        let result = self.conn().execute(
            "INSERT INTO entities (id, kind, name, date, creation_date, assay, alternate_names)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entity.id,
                entity.kind.as_str(),
                entity.name,
                format_date(entity.date),
                format_datetime(&entity.creation_date),
                entity.assay,
                alternate_names,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::Conflict(format!("{} {}", entity.kind, entity.name)))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_entity(&self, kind: EntityKind, id: &str) -> Result<Option<EntityRecord>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE kind = ?1 AND id = ?2"),
            params![kind.as_str(), id],
            entity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_entity_by_name(&self, kind: EntityKind, name: &str) -> Result<Option<EntityRecord>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE kind = ?1 AND name = ?2"),
            params![kind.as_str(), name],
            entity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_entity(&self, entity: &EntityRecord) -> Result<()> {
        let alternate_names = serde_json::to_string(&entity.alternate_names)
            .map_err(|e| Error::invalid(format!("alternate names: {e}")))?;
        let result = self.conn().execute(
            "UPDATE entities SET name = ?1, date = ?2, assay = ?3, alternate_names = ?4
             WHERE kind = ?5 AND id = ?6",
            params![
                entity.name,
                format_date(entity.date),
                entity.assay,
                alternate_names,
                entity.kind.as_str(),
                entity.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::Conflict(format!("{} {}", entity.kind, entity.name)))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_entity(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM entities WHERE kind = ?1 AND id = ?2",
            params![kind.as_str(), id],
        )?;
        Ok(rows > 0)
    }

    // Public file grant operations

    fn upsert_public_file(&self, grant: &PublicFileGrant) -> Result<()> {
        self.conn().execute(
            "INSERT INTO public_files (id, entity_kind, entity_id, path, expiry_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (entity_kind, entity_id, path) DO UPDATE SET
                expiry_date = excluded.expiry_date",
            params![
                grant.id,
                grant.entity_kind.as_str(),
                grant.entity_id,
                grant.path,
                format_date(grant.expiry_date),
                format_datetime(&grant.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_public_file(
        &self,
        kind: EntityKind,
        entity_id: &str,
        path: &str,
    ) -> Result<Option<PublicFileGrant>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PUBLIC_FILE_COLUMNS} FROM public_files
                 WHERE entity_kind = ?1 AND entity_id = ?2 AND path = ?3"
            ),
            params![kind.as_str(), entity_id, path],
            public_file_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_public_file(&self, kind: EntityKind, entity_id: &str, path: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM public_files WHERE entity_kind = ?1 AND entity_id = ?2 AND path = ?3",
            params![kind.as_str(), entity_id, path],
        )?;
        Ok(rows > 0)
    }

    fn list_active_public_files(&self, today: NaiveDate) -> Result<Vec<PublicFileGrant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PUBLIC_FILE_COLUMNS} FROM public_files
             WHERE expiry_date >= ?1 ORDER BY expiry_date, entity_kind, entity_id, path"
        ))?;

        let rows = stmt.query_map(params![format_date(today)], public_file_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    is_admin: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
