use std::sync::Arc;

use anyhow::{Context, Result};
use feishu_core::ReplyClient;
use feishu_ingress::{AppState, ChatReplier, IngressConfig, build_dispatcher, router};
use feishu_telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let telemetry = TelemetryConfig::from_env("feishu-ingress", env!("CARGO_PKG_VERSION"));
    init_telemetry(telemetry)?;

    let cfg = IngressConfig::from_env()?;
    let replier: Option<Arc<dyn ChatReplier>> = if cfg.replies_enabled() {
        let client = ReplyClient::new(cfg.reply_options())
            .await
            .context("failed to obtain tenant access token")?;
        Some(Arc::new(client))
    } else {
        tracing::warn!("FEISHU_APP_ID/FEISHU_APP_SECRET not set, replies disabled");
        None
    };
    if cfg.encrypt_key.is_empty() {
        tracing::warn!("FEISHU_ENCRYPT_KEY not set, expecting plaintext callbacks");
    }

    let app = router(AppState::new(build_dispatcher(&cfg, replier)));

    tracing::info!("feishu-ingress listening on {}", cfg.bind);
    let listener = tokio::net::TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
