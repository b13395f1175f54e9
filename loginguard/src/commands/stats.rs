use anyhow::Result;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let services = services(cli).await?;
    let status = services.security_status().await?;
    services.close().await?;

    println!("Users:                     {}", status.total_users);
    println!("Active blocks:             {}", status.active_blocks);
    println!("Failed attempts (24h):     {}", status.failed_attempts_last_24h);
    println!("Successful logins (24h):   {}", status.successful_logins_last_24h);
    Ok(())
}
