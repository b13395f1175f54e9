use std::sync::Arc;

use anyhow::Result;
use time::{format_description, UtcOffset};
use tracing_subscriber::filter::dynamic_filter_fn;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub fn init_logging(debug: u8) -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        match debug {
            0 => std::env::set_var("RUST_LOG", "loginguard=info"),
            1 => std::env::set_var("RUST_LOG", "loginguard=debug"),
            _ => std::env::set_var("RUST_LOG", "debug"),
        }
    }

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let env_filter = Arc::new(EnvFilter::from_default_env());
    let attended = console::user_attended_stderr();
    let enable_colors = attended;

    let full_fmt_layer = {
        let env_filter = env_filter.clone();
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(enable_colors)
            .with_timer(OffsetTime::new(
                offset,
                format_description::parse("[day].[month].[year] [hour]:[minute]:[second]")?,
            ))
            .with_filter(dynamic_filter_fn(move |m, c| {
                env_filter.enabled(m, c.clone())
            }))
    };
    let compact_fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(enable_colors)
        .with_target(false)
        .with_timer(OffsetTime::new(
            offset,
            format_description::parse("[hour]:[minute]:[second]")?,
        ))
        .with_filter(dynamic_filter_fn(move |m, c| {
            env_filter.enabled(m, c.clone())
        }));

    // stdout is reserved for command output
    tracing_subscriber::registry()
        .with((!attended).then_some(full_fmt_layer))
        .with(attended.then_some(compact_fmt_layer))
        .init();
    Ok(())
}
