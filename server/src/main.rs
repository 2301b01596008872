use anyhow::Result;
use clap::Parser;
use server::build_router;
use server::config::ServerConfig;
use server::engine::SearchEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Data directory holding one artifact folder per platform
    #[arg(long, default_value = "./data")]
    data: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig::from_env(&args.data);

    let engine = Arc::new(SearchEngine::for_data_dir(&config.data_dir, config.max_matrix_bytes));
    engine.warm_up().await;
    let app = build_router(engine, &config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, data = %config.data_dir.display(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
