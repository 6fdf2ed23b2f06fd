//! # Labfiles
//!
//! File storage for laboratory samples and datasets, usable both as a
//! standalone server and as a library.
//!
//! Every entity owns one folder per configured drive, derived from its kind,
//! date and name. The library lists those folders, soft-deletes files with a
//! tombstone log, moves folders when an entity is renamed, ingests staged
//! uploads and shares single files anonymously until an expiry date.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! labfiles = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use labfiles::config::AppConfig;
//! use labfiles::server::{AppState, create_router};
//! use labfiles::store::{SqliteStore, Store};
//!
//! let config = AppConfig::load(Path::new("labfiles.toml")).unwrap();
//! let store = SqliteStore::new(config.server.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     config.drives(),
//!     config.server.public_base_url.clone(),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `labfiles` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod drive;
pub mod error;
pub mod files;
pub mod server;
pub mod store;
pub mod types;

pub use error::{Error, Result};
