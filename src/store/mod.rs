mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::NaiveDate;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Entity catalog operations
    fn create_entity(&self, entity: &EntityRecord) -> Result<()>;
    fn get_entity(&self, kind: EntityKind, id: &str) -> Result<Option<EntityRecord>>;
    fn get_entity_by_name(&self, kind: EntityKind, name: &str) -> Result<Option<EntityRecord>>;
    fn update_entity(&self, entity: &EntityRecord) -> Result<()>;
    fn delete_entity(&self, kind: EntityKind, id: &str) -> Result<bool>;

    // Public file grant operations
    fn upsert_public_file(&self, grant: &PublicFileGrant) -> Result<()>;
    fn get_public_file(
        &self,
        kind: EntityKind,
        entity_id: &str,
        path: &str,
    ) -> Result<Option<PublicFileGrant>>;
    fn delete_public_file(&self, kind: EntityKind, entity_id: &str, path: &str) -> Result<bool>;
    fn list_active_public_files(&self, today: NaiveDate) -> Result<Vec<PublicFileGrant>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;
}
