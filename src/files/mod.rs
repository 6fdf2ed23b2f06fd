//! Files owned by samples and datasets across the configured drives.
//!
//! [`FileService`] is the entry point for everything that reads or changes
//! entity folders: listing, soft deletion, rename propagation, ingestion of
//! staged uploads and analysis bundles. [`PublicFiles`] layers the
//! persisted public grants on top of it.

mod aggregate;
mod analysis;
mod ingest;
mod public;
mod rename;
mod tombstone;

use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;

use tracing::{debug, warn};

pub use ingest::keep_filename;
pub use public::{PublicFiles, public_file_url};
pub use rename::{DriveOutcome, DriveReport, FolderSnapshot};
pub use tombstone::{DELETED_FILENAME, TombstoneLog};

use crate::drive::Drives;
use crate::error::Result;
use crate::types::FileEntity;

pub struct FileService {
    drives: Arc<Drives>,
}

impl FileService {
    pub fn new(drives: Arc<Drives>) -> Self {
        Self { drives }
    }

    #[must_use]
    pub fn drives(&self) -> &Drives {
        &self.drives
    }

    /// Removes the entity folder from home and archive drives.
    ///
    /// Only a failure on the home drive is reported; archive failures are
    /// logged and skipped.
    pub fn delete_entity_folders<E: FileEntity + ?Sized>(&self, entity: &E) -> Result<()> {
        for (role, drive) in self.drives.storage() {
            let folder = drive.folder(entity);
            debug!("deleting folder {} on {role} drive", folder.display());
            match fs::remove_dir_all(&folder) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) if role.is_home() => return Err(e.into()),
                Err(e) => warn!("could not delete folder {}: {e}", folder.display()),
            }
        }
        Ok(())
    }
}
