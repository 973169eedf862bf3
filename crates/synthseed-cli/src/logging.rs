use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

use crate::error::{RunError, RunResult};

pub const INFO_LOG: &str = "info.ndjson";
pub const ERROR_LOG: &str = "errors.ndjson";

/// Files receiving the run logs.
#[derive(Debug, Clone)]
pub struct LogPaths {
    pub info: PathBuf,
    pub errors: PathBuf,
}

/// Install the global subscriber.
///
/// Every event at INFO and above goes to `info.ndjson`, ERROR events are
/// also appended to `errors.ndjson`, and a human-readable copy goes to
/// stderr filtered by `RUST_LOG` (default `warn`).
pub fn init_run_logging(logs_dir: &Path) -> RunResult<LogPaths> {
    create_dir_all(logs_dir)?;
    let paths = LogPaths {
        info: logs_dir.join(INFO_LOG),
        errors: logs_dir.join(ERROR_LOG),
    };

    let info_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(shared_writer(&paths.info)?)
        .with_filter(LevelFilter::INFO);

    let error_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_writer(shared_writer(&paths.errors)?)
        .with_filter(LevelFilter::ERROR);

    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    tracing_subscriber::registry()
        .with(info_layer)
        .with(error_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|err| RunError::Logging(err.to_string()))?;

    Ok(paths)
}

fn shared_writer(path: &Path) -> RunResult<BoxMakeWriter> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let file = Arc::new(Mutex::new(file));
    Ok(BoxMakeWriter::new(move || SharedWriter {
        file: Arc::clone(&file),
    }))
}

struct SharedWriter {
    file: Arc<Mutex<File>>,
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("failed to lock log file"))?;
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("failed to lock log file"))?;
        file.flush()
    }
}
