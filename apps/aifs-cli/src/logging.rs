// logging.rs - Tracing setup: stderr plus a daily log file.
//
// `RUST_LOG` overrides the default `aifs=info` filter. The file layer
// writes `<data>/logs/aifs.log.YYYY-MM-DD` through a non-blocking writer
// whose guard must live until exit.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aifs=info"))
}

/// Install the global subscriber. Returns the file writer's guard; `None`
/// when the log directory cannot be created, in which case only stderr is
/// used.
pub fn init(logs_dir: &Path) -> Option<WorkerGuard> {
    let stderr = fmt::layer().with_writer(std::io::stderr).with_ansi(false);

    let (file_layer, guard) = match std::fs::create_dir_all(logs_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(logs_dir, "aifs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("warning: cannot create {}: {}", logs_dir.display(), e);
            (None, None)
        }
    };

    let installed = tracing_subscriber::registry()
        .with(filter())
        .with(stderr)
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        return None;
    }
    guard
}
