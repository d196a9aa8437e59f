use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tubechat_cli::{
    app::{App, Command},
    config::Config,
};
use tubechat_client::HttpGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config);

    tracing::info!(base_url = %config.backend.base_url, "Starting tubechat");

    let gateway = HttpGateway::new(config.gateway()).context("Failed to create backend client")?;
    let mut app = App::new(Arc::new(gateway), config.ui.clone());

    // Optional channel id to open straight away
    if let Some(channel_id) = std::env::args().nth(1) {
        app.handle(Command::Open(channel_id)).await;
    }

    app.run().await
}

/// Logs go to stderr so they do not interleave with the transcript
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
