//! # slackhook entry point
//!
//! Runs the Slack endpoint with a `/ping` command registered, which is enough
//! to check an installation end to end.

use anyhow::Context;
use slackhook::{ConfigLoader, RequestContext, SlackApp, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;

    telemetry::init_tracing(&config)?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        info!(config = %redacted_json, "Configuration");
    }

    let app = SlackApp::new(config)?;
    app.on_command("/ping", |ctx: RequestContext| async move {
        format!("pong ({})", ctx.workspace_id)
    });

    app.run().await?;
    Ok(())
}
