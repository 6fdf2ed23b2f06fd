use std::fs;
use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::FileService;
use crate::error::{Error, Result};
use crate::types::FileEntity;

/// Naming function that keeps the staged file's own name.
#[must_use]
pub fn keep_filename(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl FileService {
    /// Moves staged files into the entity's home folder on a blocking worker.
    ///
    /// Returns as soon as the work is scheduled. Files are handled in order;
    /// `on_progress` receives each target name with the fraction done before
    /// that file is moved, then `("", 1.0)` once everything is in place. The
    /// callback runs on the worker thread. The first failure stops the batch
    /// and files already moved stay where they are.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ingest<E, N, P>(
        &self,
        entity: &E,
        staged: Vec<PathBuf>,
        naming: N,
        on_progress: P,
    ) -> JoinHandle<Result<()>>
    where
        E: FileEntity + ?Sized,
        N: Fn(&Path) -> String + Send + 'static,
        P: Fn(&str, f64) + Send + 'static,
    {
        let folder = self.drives.home().folder(entity);
        let name = entity.name().to_string();
        tokio::task::spawn_blocking(move || {
            let result = ingest_files(&folder, &staged, naming, on_progress);
            match &result {
                Ok(()) => info!("ingested {} files for {name}", staged.len()),
                Err(e) => error!("ingestion for {name} stopped: {e}"),
            }
            result
        })
    }
}

fn ingest_files<N, P>(folder: &Path, staged: &[PathBuf], naming: N, on_progress: P) -> Result<()>
where
    N: Fn(&Path) -> String,
    P: Fn(&str, f64),
{
    fs::create_dir_all(folder)?;
    let total = staged.len();
    for (index, file) in staged.iter().enumerate() {
        let filename = naming(file);
        if Path::new(&filename).file_name().and_then(|n| n.to_str()) != Some(filename.as_str()) {
            return Err(Error::invalid(format!(
                "invalid target name {filename:?} for {}",
                file.display()
            )));
        }
        let target = folder.join(&filename);
        on_progress(&filename, index as f64 / total as f64);
        debug!("moving file {} to {}", file.display(), target.display());
        fs::copy(file, &target)
            .and_then(|_| fs::remove_file(file))
            .map_err(|source| Error::Ingest {
                file: file.clone(),
                target: target.clone(),
                source,
            })?;
    }
    on_progress("", 1.0);
    Ok(())
}
