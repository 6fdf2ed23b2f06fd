use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use super::FileService;
use crate::error::{Error, Result};
use crate::types::{DeletedFile, FileEntity};

/// Name of the per-folder log of soft-deleted files.
pub const DELETED_FILENAME: &str = ".deleted";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Append-only, tab-separated record of files removed from one folder.
pub struct TombstoneLog {
    path: PathBuf,
}

impl TombstoneLog {
    #[must_use]
    pub fn in_folder(folder: &Path) -> Self {
        Self {
            path: folder.join(DELETED_FILENAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &DeletedFile) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_record(record).as_bytes())?;
        file.flush()
    }

    /// Records in log order. A folder without a log has no records.
    pub fn read(&self) -> io::Result<Vec<DeletedFile>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let record = parse_record(line);
                if record.is_none() {
                    warn!("skipping malformed line in {}: {line:?}", self.path.display());
                }
                record
            })
            .collect())
    }
}

fn format_record(record: &DeletedFile) -> String {
    format!(
        "{}\t{}\t{}\n",
        record.filename,
        record.modified.format(TIMESTAMP_FORMAT),
        record.deleted.format(TIMESTAMP_FORMAT)
    )
}

fn parse_record(line: &str) -> Option<DeletedFile> {
    let mut fields = line.split('\t');
    let filename = fields.next().filter(|f| !f.is_empty())?;
    let modified = parse_timestamp(fields.next()?)?;
    let deleted = parse_timestamp(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }
    Some(DeletedFile {
        filename: filename.to_string(),
        modified,
        deleted,
    })
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

fn to_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0).unwrap_or(time)
}

impl FileService {
    /// Soft-deletes one file of the entity's home folder.
    ///
    /// The tombstone line is written before the file is removed; if the
    /// removal then fails, the log names a file that still exists.
    pub fn delete_file<E: FileEntity + ?Sized>(
        &self,
        entity: &E,
        file: &Path,
    ) -> Result<DeletedFile> {
        let folder = self.drives.home().folder(entity);
        let target = folder.join(file);
        let filename = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::invalid(format!("file {} is empty", file.display())))?
            .to_string();
        if target.parent() != Some(folder.as_path()) {
            return Err(Error::invalid(format!(
                "file {} not in folder {}",
                file.display(),
                folder.display()
            )));
        }
        if filename == DELETED_FILENAME {
            return Err(Error::invalid("the deleted files log cannot be deleted"));
        }
        if filename.contains(['\t', '\n', '\r']) {
            return Err(Error::invalid(format!(
                "file {filename:?} cannot be recorded in the deleted files log"
            )));
        }

        let metadata = fs::metadata(&target).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound,
            _ => Error::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(Error::invalid(format!("{} is not a file", file.display())));
        }
        let modified = DateTime::<Local>::from(metadata.modified()?).naive_local();
        let record = DeletedFile {
            filename,
            modified: to_seconds(modified),
            deleted: to_seconds(Local::now().naive_local()),
        };

        TombstoneLog::in_folder(&folder).append(&record)?;
        fs::remove_file(&target)?;
        debug!("deleted file {}", target.display());
        Ok(record)
    }

    /// Files previously soft-deleted from the entity's home folder.
    #[must_use]
    pub fn deleted_files<E: FileEntity + ?Sized>(&self, entity: &E) -> Vec<DeletedFile> {
        let log = TombstoneLog::in_folder(&self.drives.home().folder(entity));
        log.read().unwrap_or_else(|e| {
            warn!("could not read {}: {e}", log.path().display());
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::types::EntityKind;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_append_format() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = TombstoneLog::in_folder(temp.path());
        log.append(&DeletedFile {
            filename: "old.txt".to_string(),
            modified: at(1, 10),
            deleted: at(2, 9),
        })
        .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "old.txt\t2024-01-01T10:00:00\t2024-01-02T09:00:00\n");
    }

    #[test]
    fn test_append_keeps_previous_lines() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = TombstoneLog::in_folder(temp.path());
        for name in ["a.txt", "b.txt"] {
            log.append(&DeletedFile {
                filename: name.to_string(),
                modified: at(1, 10),
                deleted: at(2, 9),
            })
            .unwrap();
        }

        let records = log.read().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename, "a.txt");
        assert_eq!(records[1].filename, "b.txt");
        assert_eq!(records[1].deleted, at(2, 9));
    }

    #[test]
    fn test_read_skips_malformed_and_accepts_fractions() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = TombstoneLog::in_folder(temp.path());
        fs::write(
            log.path(),
            "good.txt\t2024-01-01T10:00:00.123456\t2024-01-02T09:00:00\n\
             broken line\n\
             bad.txt\tnot-a-date\t2024-01-02T09:00:00\n",
        )
        .unwrap();

        let records = log.read().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "good.txt");
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(TombstoneLog::in_folder(temp.path()).read().unwrap().is_empty());
    }

    #[test]
    fn test_delete_file_writes_tombstone_and_hides_file() {
        let fixture = Fixture::new(0);
        let sample = entity(EntityKind::Sample, "Sample42");
        let home = fixture.service.drives().home().folder(&sample);
        write(&home.join("old.txt"), "old");
        write(&home.join("keep.txt"), "keep");

        let record = fixture
            .service
            .delete_file(&sample, &home.join("old.txt"))
            .unwrap();

        assert_eq!(record.filename, "old.txt");
        assert!(!home.join("old.txt").exists());
        let content = fs::read_to_string(home.join(DELETED_FILENAME)).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("old.txt\t"));
        assert_eq!(fixture.service.files(&sample), vec![home.join("keep.txt")]);
        assert_eq!(fixture.service.deleted_files(&sample), vec![record]);
    }

    #[test]
    fn test_delete_file_accepts_bare_filename() {
        let fixture = Fixture::new(0);
        let sample = entity(EntityKind::Sample, "Sample42");
        let home = fixture.service.drives().home().folder(&sample);
        write(&home.join("old.txt"), "old");

        fixture
            .service
            .delete_file(&sample, Path::new("old.txt"))
            .unwrap();

        assert!(!home.join("old.txt").exists());
    }

    #[test]
    fn test_delete_file_outside_home_folder_is_invalid() {
        let fixture = Fixture::new(1);
        let sample = entity(EntityKind::Sample, "Sample42");
        let drives = fixture.service.drives();
        let archived = drives.archives()[0].folder(&sample).join("old.txt");
        write(&archived, "old");
        let nested = drives.home().folder(&sample).join("sub/old.txt");
        write(&nested, "old");

        for file in [&archived, &nested] {
            let result = fixture.service.delete_file(&sample, file);
            assert!(matches!(result, Err(Error::InvalidInput(_))));
            assert!(file.exists());
        }
    }

    #[test]
    fn test_delete_missing_file_is_not_found() {
        let fixture = Fixture::new(0);
        let sample = entity(EntityKind::Sample, "Sample42");
        let result = fixture.service.delete_file(&sample, Path::new("ghost.txt"));
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_delete_file_with_log_separator_in_name_is_invalid() {
        let fixture = Fixture::new(0);
        let sample = entity(EntityKind::Sample, "Sample42");
        let home = fixture.service.drives().home().folder(&sample);
        for name in ["bad\tname.txt", "bad\nname.txt"] {
            write(&home.join(name), "x");

            let result = fixture.service.delete_file(&sample, Path::new(name));

            assert!(matches!(result, Err(Error::InvalidInput(_))), "{name:?}");
            assert!(home.join(name).is_file());
        }
        assert!(!home.join(DELETED_FILENAME).exists());
    }

    #[test]
    fn test_delete_tombstone_log_is_invalid() {
        let fixture = Fixture::new(0);
        let sample = entity(EntityKind::Sample, "Sample42");
        let home = fixture.service.drives().home().folder(&sample);
        write(&home.join(DELETED_FILENAME), "");
        let result = fixture
            .service
            .delete_file(&sample, Path::new(DELETED_FILENAME));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
