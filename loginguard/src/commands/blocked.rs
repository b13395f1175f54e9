use anyhow::Result;
use loginguard_core::clock::Clock;

use super::common::{format_block, services};

pub(crate) async fn command(cli: &crate::Cli, active_only: bool) -> Result<()> {
    let services = services(cli).await?;
    let now = services.clock.now();
    let records = services.blocker.list().await?;
    services.close().await?;

    let records: Vec<_> = records
        .into_iter()
        .filter(|r| !active_only || r.is_active(now))
        .collect();
    if records.is_empty() {
        eprintln!("No blocked IPs");
    }
    for record in records {
        println!("{}", format_block(&record, now));
    }
    Ok(())
}
