use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};
use crate::types::FileEntity;

/// How a drive turns entity metadata into a relative folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderLayout {
    /// `<collection>/<year>/<name>` (`samples/2023/Sample42`), used by home and archive drives.
    Dated,
    /// `<collection>/<name>`, used by the upload drive.
    ByKind,
    /// `<name>`, used by the analysis drive.
    Flat,
}

impl FolderLayout {
    #[must_use]
    pub fn subfolder<E: FileEntity + ?Sized>(self, entity: &E) -> PathBuf {
        let kind = entity.kind().collection();
        match self {
            FolderLayout::Dated => PathBuf::from(kind)
                .join(entity.date().year().to_string())
                .join(entity.name()),
            FolderLayout::ByKind => PathBuf::from(kind).join(entity.name()),
            FolderLayout::Flat => PathBuf::from(entity.name()),
        }
    }

    /// Relative folder for a group of entities analysed together.
    ///
    /// A single entity keeps its own folder; larger groups get a synthetic
    /// name from the actor, the first entity's assay and the bundle date.
    pub fn bundle_subfolder<E: FileEntity>(
        self,
        entities: &[E],
        actor: Option<&str>,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        match entities {
            [] => Err(Error::invalid("cannot compute folder for empty set")),
            [single] => Ok(self.subfolder(single)),
            [first, ..] => Ok(PathBuf::from(bundle_name(first.assay(), actor, date))),
        }
    }
}

fn bundle_name(assay: Option<&str>, actor: Option<&str>, date: NaiveDate) -> String {
    let actor = actor.map(|a| a.split('@').next().unwrap_or(a).trim().to_string());
    let assay = assay.map(word_characters);
    let date = date.format("%Y%m%d").to_string();

    [actor, assay, Some(date)]
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn word_characters(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
