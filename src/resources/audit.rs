use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::{Factory, Managed, RegistryError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Constructor arguments of an [`AuditLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub path: PathBuf,
}

impl AuditConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::new("audit.log")
    }
}

/// The open file together with the number of lines written through it.
struct AuditSink {
    file: File,
    counter: u64,
}

/// Append-only, timestamped audit log.
///
/// Each line is written and synced to disk before `audit` returns. The file is
/// owned by the logger and closed exactly once: by [`AuditLogger::shutdown`],
/// or when the logger is dropped if `shutdown` never ran.
pub struct AuditLogger {
    path: PathBuf,
    sink: Mutex<Option<AuditSink>>,
}

impl Managed for AuditLogger {
    type Args = AuditConfig;
}

impl AuditLogger {
    /// Opens (creating if needed) the file at `config.path` for appending.
    ///
    /// # Errors
    ///
    /// `ResourceUnavailable` if the file cannot be opened.
    pub fn open(config: AuditConfig) -> Result<Self, RegistryError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|source| RegistryError::ResourceUnavailable {
                path: config.path.clone(),
                source,
            })?;

        tracing::info!(path = %config.path.display(), "audit log opened");

        Ok(Self {
            path: config.path,
            sink: Mutex::new(Some(AuditSink { file, counter: 0 })),
        })
    }

    /// Lazy factory opening the first caller's path.
    pub fn factory() -> Factory<Self> {
        Factory::with_args(|config| Ok(Self::open(config)?))
    }

    /// Eager factory opening `path`.
    pub fn default_factory(path: impl Into<PathBuf>) -> Factory<Self> {
        let config = AuditConfig::new(path);
        Factory::no_args(move || Ok(Self::open(config.clone())?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `"<timestamp>: <message>; counter: <n>"` and syncs it to disk.
    ///
    /// Returns the counter value written with the line.
    ///
    /// A failed write may leave part of the line in the file, so it closes the
    /// log: the caller gets `ResourceUnavailable` and every later call gets
    /// `ResourceClosed`. Nothing is ever appended after a partial line.
    ///
    /// # Errors
    ///
    /// - `ResourceClosed` after [`shutdown`](Self::shutdown) or a failed write
    /// - `ResourceUnavailable` if the write or sync fails
    pub fn audit(&self, message: &str) -> Result<u64, RegistryError> {
        let mut guard = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        let sink = guard.as_mut().ok_or_else(|| RegistryError::ResourceClosed {
            path: self.path.clone(),
        })?;

        let counter = sink.counter + 1;
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let line = format!("{timestamp}: {message}; counter: {counter}\n");

        let written = sink
            .file
            .write_all(line.as_bytes())
            .and_then(|()| sink.file.sync_data());

        match written {
            Ok(()) => {
                sink.counter = counter;
                Ok(counter)
            }
            Err(source) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %source,
                    "audit write failed, closing audit log"
                );
                *guard = None;
                Err(RegistryError::ResourceUnavailable {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Number of lines written so far.
    pub fn counter(&self) -> u64 {
        self.sink
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map_or(0, |sink| sink.counter)
    }

    pub fn is_open(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    /// Closes the file. Returns `false` if it was already closed.
    pub fn shutdown(&self) -> bool {
        let sink = self.sink.lock().unwrap_or_else(|p| p.into_inner()).take();
        match sink {
            Some(sink) => {
                tracing::info!(path = %self.path.display(), lines = sink.counter, "audit log closed");
                drop(sink);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}
