// src/progress.rs

//! Build progress reporting
//!
//! The archive writer and the build orchestrator report what they do through
//! the `BuildReporter` trait and have no knowledge of how it is presented.
//!
//! Implementations:
//! - `LogReporter`: Logs to tracing
//! - `SilentReporter`: No-op for scripted/quiet modes and tests
//! - `CallbackReporter`: Forwards every notification as a `BuildEvent`

use tracing::{debug, info};

/// Sink for build notifications
pub trait BuildReporter: Send + Sync {
    /// Build title, emitted once at the start
    fn on_title(&self, label: &str);

    /// A new ingestion section starts (sources, vendor, ...)
    fn on_section_start(&self, label: &str);

    /// An entry was stored in the archive
    fn on_file_added(&self, archive_path: &str);

    /// An entry was compressed after being stored
    fn on_compressed(&self, archive_path: &str);

    /// The build committed; summary lines describe the artifact
    fn on_success(&self, summary: &[String]);
}

/// Silent reporter (no-op)
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl SilentReporter {
    pub fn new() -> Self {
        Self
    }
}

impl BuildReporter for SilentReporter {
    fn on_title(&self, _label: &str) {}
    fn on_section_start(&self, _label: &str) {}
    fn on_file_added(&self, _archive_path: &str) {}
    fn on_compressed(&self, _archive_path: &str) {}
    fn on_success(&self, _summary: &[String]) {}
}

/// Logging reporter
///
/// Titles, sections and the summary go to `info`; per-entry notifications
/// go to `debug` to keep large vendor trees readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl BuildReporter for LogReporter {
    fn on_title(&self, label: &str) {
        info!("{}", label);
    }

    fn on_section_start(&self, label: &str) {
        info!("Adding {}", label);
    }

    fn on_file_added(&self, archive_path: &str) {
        debug!("  + {}", archive_path);
    }

    fn on_compressed(&self, archive_path: &str) {
        debug!("  ~ {} (compressed)", archive_path);
    }

    fn on_success(&self, summary: &[String]) {
        for line in summary {
            info!("{}", line);
        }
    }
}

/// Events emitted by the callback reporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Title(String),
    SectionStart(String),
    FileAdded(String),
    Compressed(String),
    Success(Vec<String>),
}

/// Callback-based reporter
///
/// Calls a user-provided function for every notification.
pub struct CallbackReporter<F>
where
    F: Fn(BuildEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackReporter<F>
where
    F: Fn(BuildEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> BuildReporter for CallbackReporter<F>
where
    F: Fn(BuildEvent) + Send + Sync,
{
    fn on_title(&self, label: &str) {
        (self.callback)(BuildEvent::Title(label.to_string()));
    }

    fn on_section_start(&self, label: &str) {
        (self.callback)(BuildEvent::SectionStart(label.to_string()));
    }

    fn on_file_added(&self, archive_path: &str) {
        (self.callback)(BuildEvent::FileAdded(archive_path.to_string()));
    }

    fn on_compressed(&self, archive_path: &str) {
        (self.callback)(BuildEvent::Compressed(archive_path.to_string()));
    }

    fn on_success(&self, summary: &[String]) {
        (self.callback)(BuildEvent::Success(summary.to_vec()));
    }
}
