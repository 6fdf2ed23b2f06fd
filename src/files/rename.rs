use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::FileService;
use crate::drive::DriveRole;
use crate::error::{Error, Result};
use crate::types::FileEntity;

const CHECKSUM_EXTENSION: &str = ".md5";

/// Entity folders on every drive, captured before a metadata change.
#[derive(Debug, Clone)]
pub struct FolderSnapshot {
    name: String,
    folders: Vec<(DriveRole, PathBuf)>,
}

impl FolderSnapshot {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn folders(&self) -> &[(DriveRole, PathBuf)] {
        &self.folders
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveOutcome {
    Moved { from: PathBuf, to: PathBuf },
    /// Folder unchanged, or never created on this drive.
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveReport {
    pub role: DriveRole,
    pub outcome: DriveOutcome,
}

impl FileService {
    #[must_use]
    pub fn snapshot<E: FileEntity + ?Sized>(&self, entity: &E) -> FolderSnapshot {
        FolderSnapshot {
            name: entity.name().to_string(),
            folders: self
                .drives
                .all()
                .map(|(role, drive)| (role, drive.folder(entity)))
                .collect(),
        }
    }

    /// Captures the folders of `previous`, runs `persist`, then moves every
    /// folder whose path changed to where `updated` expects it.
    pub fn save_with_rename<E, F>(
        &self,
        previous: &E,
        updated: &E,
        persist: F,
    ) -> Result<Vec<DriveReport>>
    where
        E: FileEntity + ?Sized,
        F: FnOnce() -> Result<()>,
    {
        let snapshot = self.snapshot(previous);
        persist()?;
        self.propagate(&snapshot, updated)
    }

    /// Moves each drive's folder from `snapshot` to the folder `updated`
    /// maps to, renaming files that embed the old name.
    ///
    /// Every drive is attempted. Only a failure on the home drive is
    /// returned as an error; other failures are logged and reported.
    pub fn propagate<E: FileEntity + ?Sized>(
        &self,
        snapshot: &FolderSnapshot,
        updated: &E,
    ) -> Result<Vec<DriveReport>> {
        let mut reports = Vec::with_capacity(snapshot.folders.len());
        let mut home_failure = None;

        for ((role, drive), (_, old_folder)) in self.drives.all().zip(&snapshot.folders) {
            let new_folder = drive.folder(updated);
            let outcome = if *old_folder == new_folder || !old_folder.exists() {
                DriveOutcome::Skipped
            } else {
                match relocate(old_folder, &new_folder, &snapshot.name, updated.name()) {
                    Ok(()) => {
                        info!(
                            "moved {role} folder {} to {}",
                            old_folder.display(),
                            new_folder.display()
                        );
                        DriveOutcome::Moved {
                            from: old_folder.clone(),
                            to: new_folder.clone(),
                        }
                    }
                    Err(e) if role.is_home() => {
                        error!(
                            "could not move home folder {} to {}: {e}",
                            old_folder.display(),
                            new_folder.display()
                        );
                        let outcome = DriveOutcome::Failed {
                            error: e.to_string(),
                        };
                        home_failure = Some(Error::FolderMove {
                            from: old_folder.clone(),
                            to: new_folder.clone(),
                            source: e,
                        });
                        outcome
                    }
                    Err(e) => {
                        warn!(
                            "could not move {role} folder {} to {}: {e}",
                            old_folder.display(),
                            new_folder.display()
                        );
                        DriveOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                }
            };
            reports.push(DriveReport { role, outcome });
        }

        match home_failure {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}

fn relocate(old_folder: &Path, new_folder: &Path, old_name: &str, new_name: &str) -> io::Result<()> {
    // A file rename that would clobber a sibling fails before the folder moves.
    plan_renames(old_folder, old_name, new_name)?;
    move_folder(old_folder, new_folder)?;
    rename_files(old_name, new_name, new_folder)?;
    Ok(())
}

fn move_folder(old_folder: &Path, new_folder: &Path) -> io::Result<()> {
    if new_folder.exists() {
        return Err(already_exists(new_folder));
    }
    if let Some(parent) = new_folder.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("moving folder {} to {}", old_folder.display(), new_folder.display());
    fs::rename(old_folder, new_folder)
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        ErrorKind::AlreadyExists,
        format!("{} already exists", path.display()),
    )
}

/// Names of the regular files directly in `folder`, read in full before
/// anything in the folder changes.
fn list_filenames(folder: &Path) -> io::Result<Vec<String>> {
    let mut filenames = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            filenames.push(filename.to_string());
        }
    }
    filenames.sort();
    Ok(filenames)
}

/// Source and target of every file whose name contains `old_name`.
///
/// Fails with `AlreadyExists` if any target is already taken.
fn plan_renames(
    folder: &Path,
    old_name: &str,
    new_name: &str,
) -> io::Result<Vec<(PathBuf, PathBuf)>> {
    if old_name.is_empty() || old_name == new_name {
        return Ok(Vec::new());
    }
    let mut plan = Vec::new();
    for filename in list_filenames(folder)? {
        if !filename.contains(old_name) {
            continue;
        }
        let target = folder.join(filename.replace(old_name, new_name));
        if target.exists() {
            return Err(already_exists(&target));
        }
        plan.push((folder.join(filename), target));
    }
    Ok(plan)
}

/// Replaces `old_name` with `new_name` in the names of files directly in
/// `folder`, and on each line of `.md5` checksum files.
fn rename_files(old_name: &str, new_name: &str, folder: &Path) -> io::Result<usize> {
    if old_name.is_empty() || old_name == new_name {
        return Ok(0);
    }
    let plan = plan_renames(folder, old_name, new_name)?;
    for filename in list_filenames(folder)? {
        if filename.ends_with(CHECKSUM_EXTENSION) {
            rewrite_checksums(&folder.join(filename), old_name, new_name)?;
        }
    }
    for (file, target) in &plan {
        let filename = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if filename.matches(old_name).count() > 1 {
            warn!("{filename} contains {old_name} more than once, replacing every occurrence");
        }
        if target.exists() {
            return Err(already_exists(target));
        }
        debug!("renaming file {} to {}", file.display(), target.display());
        fs::rename(file, target)?;
    }
    if !plan.is_empty() {
        debug!("renamed {} files in {}", plan.len(), folder.display());
    }
    Ok(plan.len())
}

fn rewrite_checksums(file: &Path, old_name: &str, new_name: &str) -> io::Result<()> {
    let content = fs::read_to_string(file)?;
    if !content.contains(old_name) {
        return Ok(());
    }
    let mut rewritten: String = content
        .lines()
        .map(|line| line.replacen(old_name, new_name, 1))
        .collect::<Vec<_>>()
        .join("\n");
    if content.ends_with('\n') {
        rewritten.push('\n');
    }
    fs::write(file, rewritten)
}
