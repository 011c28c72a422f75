//! Probe UI server - HTTP front end over one fact graph session.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use probe::core::messages::Locale;
use probe::io::bridge::ProcessEngine;
use probe::io::config::{DEFAULT_CONFIG_FILE, load_config};
use probe::session::Session;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "probe-ui")]
#[command(about = "Web front end for querying and editing a fact graph")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Config file (TOML); missing file means defaults
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Fact dictionary to load at start; reloaded when the file changes
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Message language (`en` or `zh-tw`); overrides the config file
    #[arg(long)]
    locale: Option<Locale>,

    /// Directory containing UI static files (defaults to ./ui/dist)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("probe_ui=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    info!(locale = %config.locale, command = ?config.engine.command, "starting probe-ui");

    let session = Session::from_config(ProcessEngine::new(config.engine.clone()), &config);
    let dictionary = args
        .dictionary
        .map(|path| path.canonicalize().unwrap_or(path));
    let state = AppState::new(session, dictionary.clone());

    if let Some(path) = &dictionary {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        state
            .load_dictionary(source)
            .await
            .map_err(|status| anyhow::anyhow!("initial dictionary load failed: {status}"))?;
    }
    sse::start_dictionary_watcher(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .layer(cors)
        .with_state(state);

    let ui_dir = args
        .ui_dir
        .unwrap_or_else(|| PathBuf::from("ui").join("dist"));
    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
