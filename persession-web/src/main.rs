//! Persession Web Server
//!
//! Serves cookie-identified sessions over HTTP.

use anyhow::Context;
use clap::Parser;
use persession_core::{init_logging, LoggingConfig, PersessionConfig};
use persession_web::server::PersessionServerBuilder;
use persession_web::WebConfig;
use tracing::info;

/// Persession Web Server - persistent cookie sessions over HTTP
#[derive(Parser)]
#[command(name = "persession-web")]
#[command(about = "HTTP server for persistent cookie sessions")]
#[command(version)]
struct Args {
    /// Server host to bind to [default: PERSESSION_HOST or 127.0.0.1]
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on [default: PERSESSION_PORT or 8080]
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Database URL for session storage (selects the sqlite backend)
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Layer the flags that were given over `config`
    fn apply(self, mut config: WebConfig) -> WebConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.config.is_some() {
            config.config_path = self.config;
        }
        if self.database_url.is_some() {
            config.database_url = self.database_url;
        }
        config
    }

    fn logging_config(&self) -> anyhow::Result<LoggingConfig> {
        let mut logging = match &self.config {
            Some(path) => PersessionConfig::from_file(path)?.logging,
            None => LoggingConfig::default(),
        };

        if let Some(level) = &self.log_level {
            logging.level = level.clone();
            logging.filter_directives = vec![
                format!("persession_core={}", level),
                format!("persession_store={}", level),
                format!("persession_web={}", level),
                "tower_http=debug".to_string(),
            ];
        }

        Ok(logging)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.logging_config()?)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Environment first, command line on top
    let config = args.apply(WebConfig::from_env());

    info!("📍 Server: http://{}", config.address());
    if let Some(path) = &config.config_path {
        info!("🔧 Configuration: {}", path);
    }
    if let Some(url) = &config.database_url {
        info!("🗄️  Database: {}", url);
    }

    let server = PersessionServerBuilder::with_config(config)
        .build()
        .await
        .context("Failed to build server")?;

    server.start().await.context("Server failed")?;
    Ok(())
}
