use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use ytdlpod::backend::YtDlp;
use ytdlpod::config::Config;
use ytdlpod::web::{self, AppState};

/// Get the default config file path (~/.config/ytdlpod/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("ytdlpod")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "ytdlpod",
    about = "Serve yt-dlp playlists as podcast feeds with on-demand audio"
)]
struct Args {
    /// Config file (defaults to ~/.config/ytdlpod/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(long, value_name = "ADDR", env = "YTDLPOD_BIND")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    if let Some(dir) = &config.scratch_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create scratch directory {}", dir.display()))?;
    }

    let backend = YtDlp::new(config.ytdlp_path.clone())
        .with_base_args(config.ytdlp_extra_args.clone())
        .with_timeouts(config.extract_timeout(), config.download_timeout());
    let state = AppState::from_config(&config, Arc::new(backend));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!(
        addr = %config.bind,
        public_url = config.public_url.as_ref().map(|u| u.as_str()).unwrap_or("<from Host header>"),
        "Listening"
    );

    axum::serve(listener, web::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
