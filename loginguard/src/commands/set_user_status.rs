use anyhow::Result;
use loginguard_common::UserStatus;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli, username: &str, active: bool) -> Result<()> {
    let status = if active {
        UserStatus::Active
    } else {
        UserStatus::Disabled
    };

    let services = services(cli).await?;
    services
        .authenticator
        .set_user_status(username, status)
        .await?;
    services.close().await
}
