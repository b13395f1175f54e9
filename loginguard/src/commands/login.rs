use anyhow::Result;
use tracing::*;

use super::common::{read_password, services};

pub(crate) async fn command(cli: &crate::Cli, ip: &str, username: &str) -> Result<()> {
    let services = services(cli).await?;

    // blocked IPs are not prompted for a password
    if let Some(result) = services.engine.reject_if_blocked(ip, username).await? {
        services.close().await?;
        anyhow::bail!("{}", result.message);
    }

    let password = read_password(&format!("Password for {username}"))?;
    let outcome = services.login_gate.login(ip, username, &password).await?;
    let remaining = services.engine.remaining_attempts(ip).await?;
    services.close().await?;

    match outcome.user {
        Some(user) => {
            println!("{} (user id {})", outcome.result.message, user.id);
            Ok(())
        }
        None if outcome.result.blocked => anyhow::bail!("{}", outcome.result.message),
        None => {
            warn!(remaining_attempts = remaining, "Invalid credentials");
            anyhow::bail!("{}", outcome.result.message)
        }
    }
}
