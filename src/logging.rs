use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use camino::Utf8Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::KiraError;

/// Shared log sink that tees the run's log lines into the workspace log file.
///
/// Writes made while no file is attached are dropped.
#[derive(Clone, Default)]
pub struct LogCapture {
    sink: Arc<Mutex<Option<File>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, path: &Utf8Path) -> Result<(), KiraError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("open {path}: {err}")))?;
        let mut guard = self
            .sink
            .lock()
            .map_err(|_| KiraError::Filesystem("log sink poisoned".to_string()))?;
        *guard = Some(file);
        Ok(())
    }

    pub fn detach(&self) {
        if let Ok(mut guard) = self.sink.lock() {
            if let Some(mut file) = guard.take() {
                let _ = file.flush();
            }
        }
    }

    /// Current contents of the log file at `path`, one entry per line.
    pub fn read_lines(&self, path: &Utf8Path) -> Result<Vec<String>, KiraError> {
        if let Ok(mut guard) = self.sink.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

pub struct CaptureWriter {
    sink: Arc<Mutex<Option<File>>>,
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .sink
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log sink poisoned"))?;
        if let Some(file) = guard.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .sink
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log sink poisoned"))?;
        match guard.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            sink: Arc::clone(&self.sink),
        }
    }
}

/// Console logging on stderr plus a plain-text copy into `capture`.
pub fn init_tracing(capture: &LogCapture) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(capture.clone()),
        )
        .init();
}
