use log::{debug, LevelFilter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use time::macros::format_description;
use tracing_subscriber::filter::EnvFilter as TracingEnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;

use crate::cli::command::Commands;
use crate::cli::Cli;
use crate::state::MinerSettings;

struct SimpleTimeFormatter;

impl FormatTime for SimpleTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let datetime = i64::try_from(timestamp)
            .ok()
            .and_then(|ts| time::OffsetDateTime::from_unix_timestamp(ts).ok())
            .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);

        let format = format_description!("[hour]:[minute]:[second]");
        let formatted = datetime
            .format(format)
            .unwrap_or_else(|_| String::from("??:??:??"));

        write!(w, "{formatted}")
    }
}

/// `--log-level` wins, then `log_level` from an existing settings file under
/// the work dir, then `info`.
fn resolve_level(cli_level: Option<&str>, work_dir: &Path) -> Result<LevelFilter, log::ParseLevelError> {
    if let Some(level) = cli_level {
        return level.parse();
    }

    Ok(MinerSettings::peek(&work_dir.join("config"))
        .and_then(|settings| settings.level_filter())
        .unwrap_or(LevelFilter::Info))
}

pub fn setup_logging(cli: Option<&Cli>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut log_level = LevelFilter::Info;

    if let Some(cli) = cli {
        if let Commands::Run {
            log_level: cmd_log_level,
            work_dir,
            ..
        } = &cli.command
        {
            log_level = resolve_level(cmd_log_level.as_deref(), work_dir)?;
        }
    }

    let env_filter = TracingEnvFilter::from_default_env()
        .add_directive(log_level.to_string().parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?)
        .add_directive("nusb=warn".parse()?);

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(SimpleTimeFormatter)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    debug!("Logging initialised at {log_level}");
    Ok(())
}
