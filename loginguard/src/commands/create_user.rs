use anyhow::Result;
use loginguard_common::Secret;
use tracing::*;

use super::common::{read_password, services};

pub(crate) async fn command(
    cli: &crate::Cli,
    username: &str,
    password: Option<&str>,
) -> Result<()> {
    let password = match password {
        Some(password) => Secret::new(password.to_owned()),
        None => read_password(&format!("Password for {username}"))?,
    };

    let services = services(cli).await?;
    let user = services
        .authenticator
        .create_user(username, &password)
        .await?;
    info!(id = %user.id, "Created user {}", user.username);
    services.close().await
}
