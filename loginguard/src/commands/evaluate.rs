use anyhow::Result;

use super::common::services;

pub(crate) async fn command(cli: &crate::Cli, ip: &str, username: &str, success: bool) -> Result<()> {
    let services = services(cli).await?;
    let result = services.engine.evaluate(ip, username, success).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    services.close().await
}
