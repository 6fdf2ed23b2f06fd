use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::warn;
use walkdir::WalkDir;

use super::FileService;
use super::tombstone::DELETED_FILENAME;
use crate::types::FileEntity;

impl FileService {
    /// Every file of the entity: its home folder, its archive folders, then
    /// any file under the home and archive roots whose name contains one of
    /// the entity's alternate names.
    ///
    /// A folder that is missing or unreadable contributes nothing.
    #[must_use]
    pub fn files<E: FileEntity + ?Sized>(&self, entity: &E) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for (role, drive) in self.drives.storage() {
            let folder = drive.folder(entity);
            match list_folder(&folder) {
                Ok(listed) => files.extend(listed),
                Err(e) => warn!("could not list {role} folder {}: {e}", folder.display()),
            }
        }

        let patterns = alternate_patterns(entity.alternate_names());
        if !patterns.is_empty() {
            for (_, drive) in self.drives.storage() {
                files.extend(search_tree(drive.root(), &patterns));
            }
        }
        files
    }

    /// Network labels of the home and archive folders that exist right now.
    #[must_use]
    pub fn folder_labels<E: FileEntity + ?Sized>(&self, entity: &E, unix: bool) -> Vec<String> {
        self.drives
            .storage()
            .filter(|(_, drive)| drive.folder(entity).is_dir())
            .map(|(_, drive)| drive.label(entity, unix))
            .collect()
    }

    /// Strips the first matching home or archive folder from `file`.
    ///
    /// A path outside every entity folder is returned unchanged, so callers
    /// can tell by its still being absolute that it is not a managed file.
    #[must_use]
    pub fn relativize<E: FileEntity + ?Sized>(&self, entity: &E, file: &Path) -> PathBuf {
        self.drives
            .storage()
            .find_map(|(_, drive)| {
                file.strip_prefix(drive.folder(entity))
                    .ok()
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| file.to_path_buf())
    }

    /// Staged files waiting on the upload drive: files at its root whose
    /// name contains the entity name, then files in the entity's upload
    /// folder.
    #[must_use]
    pub fn upload_files<E: FileEntity + ?Sized>(&self, entity: &E) -> Vec<PathBuf> {
        let upload = self.drives.upload();
        let mut files = Vec::new();
        match list_folder(upload.root()) {
            Ok(listed) => files.extend(listed.into_iter().filter(|file| {
                file.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.contains(entity.name()))
            })),
            Err(e) => warn!("could not list upload folder {}: {e}", upload.root().display()),
        }
        let folder = upload.folder(entity);
        match list_folder(&folder) {
            Ok(listed) => files.extend(listed),
            Err(e) => warn!("could not list upload folder {}: {e}", folder.display()),
        }
        files
    }
}

/// Regular, visible files directly inside `folder`; a missing folder is empty.
fn list_folder(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if is_listed(&path) && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_listed(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name != DELETED_FILENAME && !name.starts_with('.'))
}

fn alternate_patterns(names: &[String]) -> Vec<Pattern> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter_map(|name| {
            Pattern::new(&format!("*{}*", Pattern::escape(name)))
                .inspect_err(|e| warn!("ignoring alternate name {name}: {e}"))
                .ok()
        })
        .collect()
}

fn search_tree(root: &Path, patterns: &[Pattern]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_listed(entry.path()))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| patterns.iter().any(|p| p.matches(name)))
        })
        .map(|entry| entry.into_path())
        .collect()
}
