//! Configured directory trees and the folder each entity owns on them.
//!
//! Everything here is pure path computation: nothing touches the disk, so
//! the same entity snapshot always maps to the same folder and label.

mod layout;

use std::fmt;
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;

pub use layout::FolderLayout;

use crate::error::Result;
use crate::types::FileEntity;

/// A base directory plus the network labels users know it by.
#[derive(Debug, Clone)]
pub struct Drive {
    root: PathBuf,
    windows_label: String,
    unix_label: String,
    layout: FolderLayout,
}

impl Drive {
    pub fn new(
        root: impl Into<PathBuf>,
        windows_label: impl Into<String>,
        unix_label: impl Into<String>,
        layout: FolderLayout,
    ) -> Self {
        Self {
            root: root.into(),
            windows_label: windows_label.into(),
            unix_label: unix_label.into(),
            layout,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn layout(&self) -> FolderLayout {
        self.layout
    }

    #[must_use]
    pub fn subfolder<E: FileEntity + ?Sized>(&self, entity: &E) -> PathBuf {
        self.layout.subfolder(entity)
    }

    #[must_use]
    pub fn folder<E: FileEntity + ?Sized>(&self, entity: &E) -> PathBuf {
        self.root.join(self.subfolder(entity))
    }

    /// Human-readable location of the entity folder on the network.
    #[must_use]
    pub fn label<E: FileEntity + ?Sized>(&self, entity: &E, unix: bool) -> String {
        self.render_label(&self.subfolder(entity), unix)
    }

    pub fn bundle_folder<E: FileEntity>(
        &self,
        entities: &[E],
        actor: Option<&str>,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        let subfolder = self.layout.bundle_subfolder(entities, actor, date)?;
        Ok(self.root.join(subfolder))
    }

    pub fn bundle_label<E: FileEntity>(
        &self,
        entities: &[E],
        actor: Option<&str>,
        date: NaiveDate,
        unix: bool,
    ) -> Result<String> {
        let subfolder = self.layout.bundle_subfolder(entities, actor, date)?;
        Ok(self.render_label(&subfolder, unix))
    }

    fn render_label(&self, subfolder: &Path, unix: bool) -> String {
        let (base, separator, foreign) = if unix {
            (&self.unix_label, '/', '\\')
        } else {
            (&self.windows_label, '\\', '/')
        };
        let base = base.replace(foreign, &separator.to_string());
        let mut label = base.trim_end_matches(separator).to_string();
        for component in subfolder.components() {
            if let Component::Normal(segment) = component {
                label.push(separator);
                label.push_str(&segment.to_string_lossy().replace(foreign, &separator.to_string()));
            }
        }
        label
    }
}

/// Where a drive sits in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveRole {
    Home,
    Archive(usize),
    Upload,
    Analysis,
}

impl DriveRole {
    #[must_use]
    pub fn is_home(self) -> bool {
        self == DriveRole::Home
    }
}

impl fmt::Display for DriveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveRole::Home => f.write_str("home"),
            DriveRole::Archive(index) => write!(f, "archive[{index}]"),
            DriveRole::Upload => f.write_str("upload"),
            DriveRole::Analysis => f.write_str("analysis"),
        }
    }
}

/// The full, immutable set of drives, built once at startup.
#[derive(Debug, Clone)]
pub struct Drives {
    home: Drive,
    archives: Vec<Drive>,
    upload: Drive,
    analysis: Drive,
    analysis_symlinks: bool,
}

impl Drives {
    pub fn new(
        home: Drive,
        archives: Vec<Drive>,
        upload: Drive,
        analysis: Drive,
        analysis_symlinks: bool,
    ) -> Self {
        Self {
            home,
            archives,
            upload,
            analysis,
            analysis_symlinks,
        }
    }

    #[must_use]
    pub fn home(&self) -> &Drive {
        &self.home
    }

    #[must_use]
    pub fn archives(&self) -> &[Drive] {
        &self.archives
    }

    #[must_use]
    pub fn upload(&self) -> &Drive {
        &self.upload
    }

    #[must_use]
    pub fn analysis(&self) -> &Drive {
        &self.analysis
    }

    #[must_use]
    pub fn analysis_symlinks(&self) -> bool {
        self.analysis_symlinks
    }

    /// Home first, then archives in configured order.
    pub fn storage(&self) -> impl Iterator<Item = (DriveRole, &Drive)> {
        std::iter::once((DriveRole::Home, &self.home)).chain(
            self.archives
                .iter()
                .enumerate()
                .map(|(index, drive)| (DriveRole::Archive(index), drive)),
        )
    }

    /// Every drive holding a per-entity folder, in the order renames visit them.
    pub fn all(&self) -> impl Iterator<Item = (DriveRole, &Drive)> {
        self.storage().chain([
            (DriveRole::Upload, &self.upload),
            (DriveRole::Analysis, &self.analysis),
        ])
    }
}
