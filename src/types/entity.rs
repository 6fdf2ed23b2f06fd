use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of record that owns a folder of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Sample,
    Dataset,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Sample, EntityKind::Dataset];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Sample => "sample",
            EntityKind::Dataset => "dataset",
        }
    }

    /// First URL segment of the anonymous public-file endpoint.
    #[must_use]
    pub const fn public_mapping(self) -> &'static str {
        match self {
            EntityKind::Sample => "sample-file",
            EntityKind::Dataset => "dataset-file",
        }
    }

    /// Plural segment shared by drive layouts and the management API.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            EntityKind::Sample => "samples",
            EntityKind::Dataset => "datasets",
        }
    }

    /// Parses the plural collection segment used by the management API.
    #[must_use]
    pub fn from_collection(segment: &str) -> Option<Self> {
        match segment {
            "samples" => Some(EntityKind::Sample),
            "datasets" => Some(EntityKind::Dataset),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sample" => Ok(EntityKind::Sample),
            "dataset" => Ok(EntityKind::Dataset),
            other => Err(Error::invalid(format!("unknown entity kind: {other}"))),
        }
    }
}

/// Read-only view of a record whose files live on the drives.
///
/// Implementors hand out a snapshot: nothing in this crate mutates the
/// metadata it reads through this trait.
pub trait FileEntity {
    fn kind(&self) -> EntityKind;

    /// Display name, embedded in folder and file names.
    fn name(&self) -> &str;

    /// Logical date, used to bucket folders by year.
    fn date(&self) -> NaiveDate;

    fn creation_date(&self) -> DateTime<Utc>;

    /// Assay-like attribute, used when naming analysis bundles.
    fn assay(&self) -> Option<&str> {
        None
    }

    /// Free-text filename fragments matched anywhere under the drive roots.
    fn alternate_names(&self) -> &[String] {
        &[]
    }
}

impl<T: FileEntity + ?Sized> FileEntity for &T {
    fn kind(&self) -> EntityKind {
        (**self).kind()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn creation_date(&self) -> DateTime<Utc> {
        (**self).creation_date()
    }

    fn assay(&self) -> Option<&str> {
        (**self).assay()
    }

    fn alternate_names(&self) -> &[String] {
        (**self).alternate_names()
    }
}
