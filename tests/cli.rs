//! CLI integration tests for the labfiles binary.
//!
//! Each test writes its own configuration into an isolated temp directory,
//! so tests can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_fs::TempDir;
use chrono::{Days, Local, NaiveDate, Utc};
use labfiles::store::{SqliteStore, Store};
use labfiles::types::{EntityKind, EntityRecord, PublicFileGrant};
use predicates::prelude::*;
use uuid::Uuid;

struct TestContext {
    temp_dir: TempDir,
    config: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config = common::write_config(temp_dir.path());
        Self { temp_dir, config }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("labfiles").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd().arg("init").assert()
    }

    fn open_store(&self) -> SqliteStore {
        let store = SqliteStore::new(self.root().join("data/labfiles.db")).expect("open store");
        store.initialize().expect("initialize store");
        store
    }
}

fn dataset(name: &str) -> EntityRecord {
    EntityRecord {
        id: Uuid::new_v4().to_string(),
        kind: EntityKind::Dataset,
        name: name.to_string(),
        date: NaiveDate::from_ymd_opt(2023, 6, 1).expect("valid date"),
        creation_date: Utc::now(),
        assay: None,
        alternate_names: vec![],
    }
}

fn grant(entity: &EntityRecord, path: &str, expiry_date: NaiveDate) -> PublicFileGrant {
    PublicFileGrant {
        id: Uuid::new_v4().to_string(),
        entity_kind: entity.kind,
        entity_id: entity.id.clone(),
        path: path.to_string(),
        expiry_date,
        created_at: Utc::now(),
    }
}

#[test]
fn init_creates_database_file_and_admin_token_file() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("labfiles_"));

    assert!(ctx.root().join("data/labfiles.db").is_file());
    let token = fs::read_to_string(ctx.root().join("data/.admin_token")).expect("token file");
    assert!(token.starts_with("labfiles_"));
    assert!(ctx.open_store().has_admin_token().unwrap());
}

#[test]
fn init_rejects_second_initialization() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn serve_requires_initialization() {
    let ctx = TestContext::new();

    ctx.cmd()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("labfiles init"));
}

#[test]
fn missing_config_file_is_reported() {
    let ctx = TestContext::new();

    Command::cargo_bin("labfiles")
        .expect("failed to find binary")
        .args(["--config"])
        .arg(ctx.root().join("absent.toml"))
        .arg("grants")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn grants_reports_no_public_files() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .arg("grants")
        .assert()
        .success()
        .stdout(predicate::str::contains("No public files"));
}

#[test]
fn grants_lists_only_active_grants() {
    let ctx = TestContext::new();
    ctx.init().success();

    let today = Local::now().date_naive();
    let store = ctx.open_store();
    let active = dataset("DsA");
    let expired = dataset("DsB");
    store.create_entity(&active).unwrap();
    store.create_entity(&expired).unwrap();
    store
        .upsert_public_file(&grant(&active, "tracks/cov.bw", today))
        .unwrap();
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap();
    store
        .upsert_public_file(&grant(&expired, "old.bw", yesterday))
        .unwrap();
    drop(store);

    ctx.cmd()
        .arg("grants")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://lanaseq.example.org/dataset-file/DsA/tracks/cov.bw",
        ))
        .stdout(predicate::str::contains("DsB").not());
}
