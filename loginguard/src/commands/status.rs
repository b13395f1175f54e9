use anyhow::Result;
use loginguard_core::clock::Clock;

use super::common::{format_block, services};

pub(crate) async fn command(cli: &crate::Cli, ip: &str) -> Result<()> {
    let services = services(cli).await?;
    let blocked = services.blocker.is_blocked(ip).await?;
    let remaining = services.engine.remaining_attempts(ip).await?;
    let record = services.blocker.find(ip).await?;

    println!("IP:                 {ip}");
    println!("Blocked:            {}", if blocked { "yes" } else { "no" });
    println!("Remaining attempts: {remaining}");
    if let Some(record) = record {
        println!("Record:             {}", format_block(&record, services.clock.now()));
    }
    services.close().await
}
