mod server;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use server::ServerConfig;

use crate::drive::{Drive, Drives, FolderLayout};
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "labfiles.toml";

/// One `[home]`, `[[archives]]`, `[upload]` or `[analysis]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub folder: PathBuf,
    #[serde(default)]
    pub windows_label: String,
    #[serde(default)]
    pub unix_label: String,
}

impl DriveConfig {
    fn build(&self, layout: FolderLayout) -> Drive {
        Drive::new(
            self.folder.clone(),
            self.windows_label.clone(),
            self.unix_label.clone(),
            layout,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(flatten)]
    pub drive: DriveConfig,
    /// Link files into analysis folders instead of copying them.
    #[serde(default)]
    pub symlinks: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub home: DriveConfig,
    #[serde(default)]
    pub archives: Vec<DriveConfig>,
    pub upload: DriveConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("could not read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let named = [
            ("home", &self.home),
            ("upload", &self.upload),
            ("analysis", &self.analysis.drive),
        ];
        let archives = self.archives.iter().map(|a| ("archives", a));
        for (name, drive) in named.into_iter().chain(archives) {
            if !drive.folder.is_absolute() {
                return Err(Error::Config(format!(
                    "{name} folder must be absolute: {}",
                    drive.folder.display()
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn drives(&self) -> Drives {
        Drives::new(
            self.home.build(FolderLayout::Dated),
            self.archives
                .iter()
                .map(|a| a.build(FolderLayout::Dated))
                .collect(),
            self.upload.build(FolderLayout::ByKind),
            self.analysis.drive.build(FolderLayout::Flat),
            self.analysis.symlinks,
        )
    }
}
