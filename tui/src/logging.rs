use std::fs::OpenOptions;

use tracing::Subscriber;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use wallpick_core::Config;

const LOG_FILE_NAME: &str = "wallpick-tui.log";
const DEFAULT_FILTER: &str = "wallpick_core=info,wallpick_tui=info";

/// Routes `tracing` output to `<home>/log/wallpick-tui.log`. The terminal
/// belongs to the UI, so nothing is ever written to stdout or stderr. When the
/// file cannot be opened the session runs without logs.
///
/// The returned guard flushes the writer on drop and must outlive the UI.
pub(crate) fn init(config: &Config) -> Option<WorkerGuard> {
    let log_dir = config.log_dir();
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        eprintln!("logging disabled: cannot create {}: {err}", log_dir.display());
        return None;
    }

    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    // Only the current user may read the log; it can contain local paths.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = match log_file_opts.open(log_dir.join(LOG_FILE_NAME)) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("logging disabled: cannot open log file: {err}");
            return None;
        }
    };

    let (non_blocking, guard) = non_blocking(log_file);

    // RUST_LOG overrides the default filter.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt_layer(non_blocking).with_filter(env_filter);

    if let Err(err) = tracing_subscriber::registry().with(file_layer).try_init() {
        eprintln!("logging disabled: {err}");
        return None;
    }
    Some(guard)
}

/// Plain-text layer that also logs when each instrumented stage finishes,
/// with its busy and idle time.
fn fmt_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
}
