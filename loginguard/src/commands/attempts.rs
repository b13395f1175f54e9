use anyhow::Result;
use chrono::Duration;
use loginguard_core::clock::Clock;
use loginguard_core::stores::AttemptStore;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli, limit: Option<u64>, recent: bool) -> Result<()> {
    let services = services(cli).await?;
    let retention = &services.config.store.retention;
    let attempts = if recent {
        let since =
            services.clock.now() - Duration::hours(retention.recent_window_hours.into());
        services.attempts.since(since).await?
    } else {
        services
            .attempts
            .recent(limit.unwrap_or(retention.history_limit))
            .await?
    };
    services.close().await?;

    for attempt in attempts {
        println!(
            "{}  {:<15}  {:<8}  {}",
            attempt.timestamp.to_rfc3339(),
            attempt.ip_address,
            attempt.status,
            attempt.username,
        );
    }
    Ok(())
}
