use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityKind, FileEntity};

/// Snapshot of a sample or dataset as kept in the entity catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub kind: EntityKind,
    pub name: String,
    pub date: NaiveDate,
    pub creation_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assay: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_names: Vec<String>,
}

impl FileEntity for EntityRecord {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    fn assay(&self) -> Option<&str> {
        self.assay.as_deref()
    }

    fn alternate_names(&self) -> &[String] {
        &self.alternate_names
    }
}

/// Time-limited anonymous access to one file of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicFileGrant {
    pub id: String,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    /// Path relative to the entity folder, `/`-separated.
    pub path: String,
    pub expiry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl PublicFileGrant {
    /// Grants stay valid through the whole of their expiry day.
    #[must_use]
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.expiry_date >= today
    }
}

/// One line of a folder's tombstone log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedFile {
    pub filename: String,
    pub modified: NaiveDateTime,
    pub deleted: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}
