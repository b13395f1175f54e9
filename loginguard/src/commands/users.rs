use anyhow::Result;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli) -> Result<()> {
    let services = services(cli).await?;
    let users = services.authenticator.list_users().await?;
    services.close().await?;

    if users.is_empty() {
        eprintln!("No users");
    }
    for user in users {
        let last_login = user
            .last_login
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_owned());
        println!(
            "{:<24} {:<8} created {}  last login {}",
            user.username,
            user.status,
            user.created_at.to_rfc3339(),
            last_login,
        );
    }
    Ok(())
}
