// ABOUTME: Serve command implementation.
// ABOUTME: Runs the webhook receiver until interrupted.

use omk::config::Settings;
use omk::error::Result;
use omk::output::Output;
use omk::registry::Registry;
use omk::webhook::WebhookServer;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub async fn serve(
    registry: Registry,
    settings: &Settings,
    bind: Option<SocketAddr>,
    output: &Output,
) -> Result<()> {
    let addr = bind.unwrap_or(settings.webhook.bind);
    let secret = settings.webhook_secret()?;

    let listener = TcpListener::bind(addr).await?;
    output.progress(&format!(
        "Listening for GitHub webhooks on http://{}{}",
        listener.local_addr()?,
        settings.webhook.path
    ));

    let server = WebhookServer::new(registry, settings.webhook.path.clone(), secret);
    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for interrupt: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    output.success("Webhook receiver stopped");
    Ok(())
}
