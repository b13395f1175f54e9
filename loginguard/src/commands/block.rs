use anyhow::Result;
use tracing::*;

use super::common::services;

pub(crate) async fn command(
    cli: &crate::Cli,
    ip: &str,
    reason: Option<&str>,
    duration: Option<u32>,
) -> Result<()> {
    let services = services(cli).await?;
    let manual = &services.config.store.manual_block;
    let record = services
        .blocker
        .block_manual(
            ip,
            reason.unwrap_or(&manual.default_reason),
            duration.unwrap_or(manual.duration_minutes),
        )
        .await?;
    info!(
        ip = %record.ip_address,
        block_count = record.block_count,
        "Blocked until {}",
        record
            .expiry_at
            .map(|e| e.to_rfc3339())
            .unwrap_or_else(|| "forever".into()),
    );
    services.close().await
}
