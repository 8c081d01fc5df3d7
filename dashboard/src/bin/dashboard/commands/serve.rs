use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;

use crate::context::DashboardContext;
use crate::output::Console;

pub const EXAMPLES: &str = "\
Examples:
  dashboard serve                           Serve the nearest dashboard.toml
  dashboard serve --bind 0.0.0.0:3000       Listen on another address than server.bind
  dashboard serve --prefix /admin/api       Mount the routes under another prefix";

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (defaults to `server.bind`)
    #[arg(long)]
    pub bind: Option<String>,

    /// Path prefix of the API (defaults to `server.prefix`)
    #[arg(long)]
    pub prefix: Option<String>,
}

pub async fn handle_serve(args: ServeArgs, config: Option<&Path>, console: &Console) -> Result<()> {
    let ctx = DashboardContext::load(config)?;
    console.detail(&format!("Using {}", ctx.config_path.display()));

    console.pending("Building resources");
    let registry = Arc::new(ctx.registry()?);
    console.settle();
    console.done(&format!("Loaded {} resources", registry.len()));

    let bind = args.bind.unwrap_or_else(|| ctx.config.server.bind.clone());
    let prefix = args.prefix.unwrap_or_else(|| ctx.config.server.prefix.clone());
    let app = dashboard::http::app(Arc::clone(&registry), &prefix);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    console.pair("Listening", &format!("http://{bind}{prefix}"));
    for descriptor in registry.descriptors() {
        console.item(&format!("{prefix}/{}", descriptor.uri_key));
    }
    log::info!("serving on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    console.note("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for ctrl-c: {err}");
    }
}
