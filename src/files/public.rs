use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use tracing::debug;

use super::FileService;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{EntityKind, EntityRecord, FileEntity, PublicFileGrant};

/// Expiry-gated anonymous access to individual entity files.
///
/// Grants are keyed by the file's path relative to the entity folder, so
/// moving a drive root or restoring a file from an archive keeps them valid.
#[derive(Clone)]
pub struct PublicFiles {
    files: Arc<FileService>,
    store: Arc<dyn Store>,
}

impl PublicFiles {
    pub fn new(files: Arc<FileService>, store: Arc<dyn Store>) -> Self {
        Self { files, store }
    }

    /// Opens `file` to anonymous download through the end of `expiry_date`.
    ///
    /// Granting an already public file replaces its expiry date.
    pub fn grant(
        &self,
        entity: &EntityRecord,
        file: &Path,
        expiry_date: NaiveDate,
    ) -> Result<PublicFileGrant> {
        let path = self.relative_path(entity, file).ok_or_else(|| {
            Error::invalid(format!("file {} is not in a folder of {}", file.display(), entity.name))
        })?;
        self.store.upsert_public_file(&PublicFileGrant {
            id: uuid::Uuid::new_v4().to_string(),
            entity_kind: entity.kind,
            entity_id: entity.id.clone(),
            path: path.clone(),
            expiry_date,
            created_at: Utc::now(),
        })?;
        debug!("file {path} of {} public until {expiry_date}", entity.name);
        self.store
            .get_public_file(entity.kind, &entity.id, &path)?
            .ok_or(Error::NotFound)
    }

    /// Removes the grant for `file`, returning whether there was one.
    pub fn revoke(&self, entity: &EntityRecord, file: &Path) -> Result<bool> {
        let path = self.relative_path(entity, file).ok_or_else(|| {
            Error::invalid(format!("file {} is not in a folder of {}", file.display(), entity.name))
        })?;
        self.store.delete_public_file(entity.kind, &entity.id, &path)
    }

    pub fn is_public(&self, entity: &EntityRecord, file: &Path) -> Result<bool> {
        self.is_public_on(entity, file, today())
    }

    /// A file outside every entity folder is never public.
    pub fn is_public_on(
        &self,
        entity: &EntityRecord,
        file: &Path,
        today: NaiveDate,
    ) -> Result<bool> {
        let Some(path) = self.relative_path(entity, file) else {
            return Ok(false);
        };
        Ok(self
            .store
            .get_public_file(entity.kind, &entity.id, &path)?
            .is_some_and(|grant| grant.is_active_on(today)))
    }

    /// Finds the file an anonymous download URL points to.
    ///
    /// Every denial is [`Error::NotFound`]: an unknown entity, a file that
    /// was never granted, an expired grant and a granted file that no longer
    /// exists cannot be told apart.
    pub fn resolve_public_file(
        &self,
        kind: EntityKind,
        name: &str,
        filename: &str,
    ) -> Result<PathBuf> {
        self.resolve_public_file_on(kind, name, filename, today())
    }

    pub fn resolve_public_file_on(
        &self,
        kind: EntityKind,
        name: &str,
        filename: &str,
        today: NaiveDate,
    ) -> Result<PathBuf> {
        let path = normalize(Path::new(filename)).ok_or(Error::NotFound)?;
        let entity = self
            .store
            .get_entity_by_name(kind, name)?
            .ok_or(Error::NotFound)?;
        let grant = self
            .store
            .get_public_file(kind, &entity.id, &path)?
            .filter(|grant| grant.is_active_on(today))
            .ok_or(Error::NotFound)?;

        self.files
            .drives()
            .storage()
            .map(|(_, drive)| drive.folder(&entity).join(&grant.path))
            .find(|candidate| candidate.is_file())
            .ok_or(Error::NotFound)
    }

    pub fn list_active_grants(&self) -> Result<Vec<PublicFileGrant>> {
        self.list_active_grants_on(today())
    }

    pub fn list_active_grants_on(&self, today: NaiveDate) -> Result<Vec<PublicFileGrant>> {
        self.store.list_active_public_files(today)
    }

    fn relative_path<E: FileEntity + ?Sized>(&self, entity: &E, file: &Path) -> Option<String> {
        let relative = self.files.relativize(entity, file);
        if relative.is_absolute() {
            return None;
        }
        normalize(&relative)
    }
}

/// `/`-joined plain components; anything that could climb out of the
/// entity folder yields `None`.
fn normalize(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Anonymous download URL of a public file.
///
/// Relative to the server root unless `base` is given.
#[must_use]
pub fn public_file_url(base: Option<&str>, kind: EntityKind, name: &str, filename: &str) -> String {
    let filename = filename
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    let path = format!(
        "{}/{}/{filename}",
        kind.public_mapping(),
        urlencoding::encode(name)
    );
    match base {
        Some(base) => format!("{}/{path}", base.trim_end_matches('/')),
        None => format!("/{path}"),
    }
}
