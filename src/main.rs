use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use labfiles::auth::TokenGenerator;
use labfiles::config::{AppConfig, DEFAULT_CONFIG_FILE};
use labfiles::files::public_file_url;
use labfiles::server::{AppState, create_router};
use labfiles::store::{SqliteStore, Store};
use labfiles::types::Token;

fn create_admin_token(generator: &TokenGenerator) -> anyhow::Result<(Token, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        is_admin: true,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    Ok((token, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "labfiles")]
#[command(about = "Sample and dataset file storage server", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the server (create database and admin token)
    Init,

    /// Start the server
    Serve {
        /// Host to bind to, overrides the configuration
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to, overrides the configuration
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// List public files whose grant has not expired
    Grants,
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    AppConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn run_init(config: &AppConfig) -> anyhow::Result<()> {
    let server = &config.server;
    fs::create_dir_all(&server.data_dir)?;

    let store = SqliteStore::new(server.db_path())?;
    store.initialize()?;

    let token_file = server.admin_token_path();

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new()?;
    let (token, raw_token) = create_admin_token(&generator)?;

    store.create_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn open_initialized_store(config: &AppConfig) -> anyhow::Result<SqliteStore> {
    let not_initialized =
        "Server not initialized. Run 'labfiles init' first to create the database and admin token.";
    if !config.server.db_path().exists() {
        bail!(not_initialized);
    }
    let store = SqliteStore::new(config.server.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(not_initialized);
    }
    Ok(store)
}

fn run_grants(config: &AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(open_initialized_store(config)?);
    let state = AppState::new(store, config.drives(), config.server.public_base_url.clone());

    let grants = state.public.list_active_grants()?;
    if grants.is_empty() {
        println!("No public files");
        return Ok(());
    }
    for grant in grants {
        let name = state
            .store
            .get_entity(grant.entity_kind, &grant.entity_id)?
            .map(|entity| entity.name)
            .unwrap_or_else(|| grant.entity_id.clone());
        let url = public_file_url(
            config.server.public_base_url.as_deref(),
            grant.entity_kind,
            &name,
            &grant.path,
        );
        println!(
            "{}\t{}\t{}\t{}\t{url}",
            grant.entity_kind, name, grant.path, grant.expiry_date
        );
    }
    Ok(())
}

async fn run_serve(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = open_initialized_store(&config)?;
    info!(
        "Admin token available at {}",
        config.server.admin_token_path().display()
    );

    let drives = config.drives();
    info!("Home folder {}", drives.home().root().display());
    for archive in drives.archives() {
        info!("Archive folder {}", archive.root().display());
    }

    let state = Arc::new(AppState::new(
        Arc::new(store),
        drives,
        config.server.public_base_url.clone(),
    ));

    let app = create_router(state);
    let addr = config.server.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("labfiles=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config)?,
        Commands::Serve { host, port } => run_serve(config, host, port).await?,
        Commands::Grants => run_grants(&config)?,
    }

    Ok(())
}
