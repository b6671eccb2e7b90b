use std::path::Path;

use once_cell::sync::OnceCell;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::error::{AppError, AppResult};

/// `None` once an embedder's dispatcher was found in place of ours.
static PULSE_LOG_GUARD: OnceCell<Option<WorkerGuard>> = OnceCell::new();

const PULSE_LOG_DIRECTIVES: &str = "info,app::db=info,app::sync=debug";
const PULSE_LOG_FILE: &str = "hr-pulse.log";

/// Routes `app::*` events to a daily file under `log_dir` and to stderr.
///
/// Only the first call does any work. When the host process already owns the
/// global dispatcher, that dispatcher is kept and no file sink is created.
pub fn init_logging(log_dir: &Path) -> AppResult<()> {
    PULSE_LOG_GUARD
        .get_or_try_init(|| install_pulse_sinks(log_dir))
        .map(|_| ())
}

fn install_pulse_sinks(log_dir: &Path) -> AppResult<Option<WorkerGuard>> {
    std::fs::create_dir_all(log_dir)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(PULSE_LOG_DIRECTIVES))
        .map_err(|err| AppError::other(format!("invalid log directives: {err}")))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, PULSE_LOG_FILE));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339()),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(UtcTime::rfc_3339()),
        )
        .try_init();

    match installed {
        Ok(()) => Ok(Some(guard)),
        Err(err) => {
            warn!(
                target: "app::db",
                error = %err,
                "global subscriber already set; pulse file log disabled"
            );
            Ok(None)
        }
    }
}
