use anyhow::Result;
use tracing::*;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let services = services(cli).await?;
    services.close().await?;
    info!("No problems found");
    Ok(())
}
