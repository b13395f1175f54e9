use std::io::stdin;

use anyhow::Result;
use chrono::{DateTime, Utc};
use dialoguer::theme::ColorfulTheme;
use loginguard_common::{BlockRecord, Secret};
use loginguard_core::Services;

use crate::config::load_config;

pub(crate) async fn services(cli: &crate::Cli) -> Result<Services> {
    let config = load_config(&cli.config, true)?;
    Services::new(config).await
}

/// Prompts on a terminal, otherwise reads one line from stdin.
pub(crate) fn read_password(prompt: &str) -> Result<Secret<String>> {
    if console::user_attended() {
        return Ok(Secret::new(
            dialoguer::Password::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .interact()?,
        ));
    }

    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(Secret::new(input.trim_end_matches(['\r', '\n']).to_owned()))
}

pub(crate) fn format_block(record: &BlockRecord, now: DateTime<Utc>) -> String {
    let state = if record.is_permanent {
        "permanent".to_owned()
    } else if record.is_active(now) {
        "active".to_owned()
    } else {
        "expired".to_owned()
    };
    let expiry = match record.expiry_at {
        Some(expiry) => expiry.to_rfc3339(),
        None => "-".to_owned(),
    };
    format!(
        "{:<15}  {:<9}  x{:<3}  blocked {}  until {}  {}",
        record.ip_address,
        state,
        record.block_count,
        record.blocked_at.to_rfc3339(),
        expiry,
        record.reason,
    )
}
