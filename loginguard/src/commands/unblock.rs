use anyhow::Result;
use tracing::*;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli, ip: &str) -> Result<()> {
    let services = services(cli).await?;
    if services.blocker.unblock(ip).await? {
        info!(%ip, "Unblocked");
    } else {
        warn!(%ip, "IP was not blocked");
    }
    services.close().await
}
