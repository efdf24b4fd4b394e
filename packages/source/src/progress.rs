//! Progress reporting for batch runs.
//!
//! [`ProgressCallback`] keeps the loaders and pipeline stages independent
//! of how progress is rendered. The CLI draws `indicatif` bars; tests use
//! [`StageProgress::silent`].

use std::sync::Arc;

/// Receives progress updates from a long-running batch step.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of units (files or stages) expected.
    fn set_total(&self, total: u64);

    /// Advances progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// One indicator per pipeline stage.
///
/// Loading counts source files, cleaning counts rows, and analysis counts
/// output tables. Loading and cleaning show the current city.
#[derive(Clone)]
pub struct StageProgress {
    /// Source files read.
    pub load: Arc<dyn ProgressCallback>,
    /// Rows cleaned into records.
    pub clean: Arc<dyn ProgressCallback>,
    /// Analysis tables computed.
    pub analyze: Arc<dyn ProgressCallback>,
}

impl StageProgress {
    /// Stages that report nothing.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            load: null_progress(),
            clean: null_progress(),
            analyze: null_progress(),
        }
    }
}
