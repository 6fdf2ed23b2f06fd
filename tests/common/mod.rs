#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use labfiles::auth::TokenGenerator;
use labfiles::config::AppConfig;
use labfiles::server::{AppState, create_router};
use labfiles::store::{SqliteStore, Store};
use labfiles::types::Token;

/// Drives, database and admin token under one temp dir, in TOML form.
pub fn write_config(root: &Path) -> PathBuf {
    let path = |name: &str| root.join(name).to_string_lossy().replace('\\', "/");
    let config = format!(
        r#"
[server]
data_dir = '{data}'
public_base_url = "https://lanaseq.example.org"

[home]
folder = '{home}'
windows_label = '\\lanaseq01\home'
unix_label = "smb://lanaseq01/home"

[[archives]]
folder = '{archive}'
windows_label = '\\lanaseq01\archive'
unix_label = "smb://lanaseq01/archive"

[upload]
folder = '{upload}'

[analysis]
folder = '{analysis}'
"#,
        data = path("data"),
        home = path("home"),
        archive = path("archive"),
        upload = path("upload"),
        analysis = path("analysis"),
    );
    let config_path = root.join("labfiles.toml");
    fs::write(&config_path, config).expect("write config");
    config_path
}

pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub admin_token: String,
    server: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config_path = write_config(temp_dir.path());
        let config = AppConfig::load(&config_path).expect("load config");
        fs::create_dir_all(&config.server.data_dir).expect("create data dir");

        let store = SqliteStore::new(config.server.db_path()).expect("open store");
        store.initialize().expect("initialize store");

        let generator = TokenGenerator::new().expect("token generator");
        let (admin_token, lookup, hash) = generator.generate().expect("generate token");
        store
            .create_token(&Token {
                id: uuid::Uuid::new_v4().to_string(),
                token_hash: hash,
                token_lookup: lookup,
                is_admin: true,
                created_at: Utc::now(),
                expires_at: None,
                last_used_at: None,
            })
            .expect("create admin token");

        let state = Arc::new(AppState::new(
            Arc::new(store),
            config.drives(),
            config.server.public_base_url.clone(),
        ));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url: format!("http://127.0.0.1:{port}"),
            admin_token,
            server,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Writes a file, creating parent folders.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        fs::write(&path, content).expect("write file");
        path
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}
