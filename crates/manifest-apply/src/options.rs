//! Applier options and the verbose output sink.

use crate::manifest::FilePredicate;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::warn;

/// Shared writable stream for progress and failure lines
pub type OutputSink = Arc<Mutex<dyn Write + Send>>;

/// Default pause between reconciliation rounds
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(200);

/// Options controlling a manifest run
#[derive(Clone)]
pub struct ApplyOptions {
    /// Patch allow-listed fields of objects that already exist
    pub update: bool,
    /// Stream every outcome to `output` as it happens
    pub verbose: bool,
    /// Restrict which manifest files are loaded
    pub filters: Vec<FilePredicate>,
    /// Where progress and failure lines are written
    pub output: OutputSink,
    /// Pause between rounds
    pub retry_interval: Duration,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            update: false,
            verbose: false,
            filters: Vec::new(),
            output: Arc::new(Mutex::new(std::io::stderr())),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl fmt::Debug for ApplyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyOptions")
            .field("update", &self.update)
            .field("verbose", &self.verbose)
            .field("filters", &self.filters.len())
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

impl ApplyOptions {
    /// Write one line to the output sink when verbose
    pub(crate) fn report(&self, line: fmt::Arguments<'_>) {
        if !self.verbose {
            return;
        }
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(output, "{line}") {
            warn!("Failed to write to output sink: {}", e);
        }
    }
}
