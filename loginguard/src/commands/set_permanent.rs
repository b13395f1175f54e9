use anyhow::Result;
use tracing::*;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli, ip: &str, permanent: bool) -> Result<()> {
    let services = services(cli).await?;
    let updated = services.blocker.set_permanent(ip, permanent).await?;
    services.close().await?;
    if !updated {
        anyhow::bail!("No block record for {ip}");
    }
    info!(%ip, permanent, "Block updated");
    Ok(())
}
