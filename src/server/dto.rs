use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::files::{DriveOutcome, DriveReport};
use crate::types::{EntityKind, EntityRecord};

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub kind: EntityKind,
    pub name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub assay: Option<String>,
    #[serde(default)]
    pub alternate_names: Vec<String>,
}

/// Fields left out keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntityRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub assay: Option<String>,
    #[serde(default)]
    pub alternate_names: Option<Vec<String>>,
}

impl UpdateEntityRequest {
    #[must_use]
    pub fn apply(self, entity: &EntityRecord) -> EntityRecord {
        EntityRecord {
            name: self.name.unwrap_or_else(|| entity.name.clone()),
            date: self.date.unwrap_or(entity.date),
            assay: self.assay.or_else(|| entity.assay.clone()),
            alternate_names: self
                .alternate_names
                .unwrap_or_else(|| entity.alternate_names.clone()),
            ..entity.clone()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub path: PathBuf,
    pub filename: String,
    pub public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FoldersQuery {
    #[serde(default)]
    pub unix: bool,
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub path: PathBuf,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct PublicFileResponse {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    pub path: String,
    pub expiry_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub revoked: bool,
}

#[derive(Debug, Serialize)]
pub struct DriveReportResponse {
    pub drive: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DriveReport> for DriveReportResponse {
    fn from(report: DriveReport) -> Self {
        let drive = report.role.to_string();
        match report.outcome {
            DriveOutcome::Moved { from, to } => Self {
                drive,
                outcome: "moved",
                from: Some(from),
                to: Some(to),
                error: None,
            },
            DriveOutcome::Skipped => Self {
                drive,
                outcome: "skipped",
                from: None,
                to: None,
                error: None,
            },
            DriveOutcome::Failed { error } => Self {
                drive,
                outcome: "failed",
                from: None,
                to: None,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateEntityResponse {
    pub entity: EntityRecord,
    pub drives: Vec<DriveReportResponse>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub staged: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub kind: EntityKind,
    pub ids: Vec<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub folder: PathBuf,
    pub windows_label: String,
    pub unix_label: String,
}
