use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::symlink as symlink_file;
#[cfg(windows)]
use std::os::windows::fs::symlink_file;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::FileService;
use crate::error::Result;
use crate::types::FileEntity;

const SAMPLES_FILENAME: &str = "samples.txt";

impl FileService {
    /// Gathers the files of `entities` into a fresh folder on the analysis
    /// drive and returns that folder.
    ///
    /// Previous content of the folder is discarded. Files are symlinked when
    /// the analysis drive is configured for it, copied otherwise; when two
    /// entities share a filename the later one wins.
    pub fn prepare_analysis<E: FileEntity>(
        &self,
        entities: &[E],
        actor: Option<&str>,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let folder = self.drives.analysis().bundle_folder(entities, actor, date)?;
        match fs::remove_dir_all(&folder) {
            Ok(()) => debug!("cleared analysis folder {}", folder.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&folder)?;

        let symlinks = self.drives.analysis_symlinks();
        for entity in entities {
            for file in self.files(entity) {
                let Some(filename) = file.file_name() else {
                    continue;
                };
                link_or_copy(&file, &folder.join(filename), symlinks)?;
            }
        }

        let mut samples = fs::File::create(folder.join(SAMPLES_FILENAME))?;
        writeln!(samples, "#sample")?;
        for entity in entities {
            writeln!(samples, "{}", entity.name())?;
        }
        samples.flush()?;

        info!(
            "prepared analysis folder {} for {} entities",
            folder.display(),
            entities.len()
        );
        Ok(folder)
    }
}

fn link_or_copy(source: &Path, target: &Path, symlink: bool) -> io::Result<()> {
    if !symlink {
        return fs::copy(source, target).map(|_| ());
    }
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    symlink_file(source, target)
}
