// src/progress.rs

//! Progress reporting.
//!
//! Reporting is observational only: a sink that fails is logged and ignored.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Snapshot of a running computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub done: usize,
    /// Exact coalition count, or the estimated sample target when sampling.
    pub total: usize,
    /// `true` when `total` is an estimate.
    pub approximate: bool,
    pub percent: f64,
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.approximate { "~" } else { "" };
        write!(
            f,
            "Count: {}/{}{} ({:.1}%)",
            self.done, marker, self.total, self.percent
        )
    }
}

/// A sink could not take an update.
#[derive(Debug, Error)]
#[error("progress sink unavailable: {0}")]
pub struct ProgressError(pub String);

/// Receives progress updates.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: &ProgressUpdate) -> Result<(), ProgressError>;
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: &ProgressUpdate) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Writes updates to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, update: &ProgressUpdate) -> Result<(), ProgressError> {
        log::info!("{}", update);
        Ok(())
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: &ProgressUpdate) -> Result<(), ProgressError> {
        self(update);
        Ok(())
    }
}

/// Per-call reporter: throttles updates and emits the final 100% update once.
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    total: usize,
    approximate: bool,
    every: usize,
    last_reported: usize,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>, total: usize, approximate: bool, every: usize) -> Self {
        ProgressReporter {
            sink,
            total,
            approximate,
            every: every.max(1),
            last_reported: 0,
            finished: false,
        }
    }

    /// Reports `done` if at least `every` items passed since the last update.
    /// The terminal update is left to [`finish`](Self::finish).
    pub fn update(&mut self, done: usize) {
        if self.finished || done >= self.total || done < self.last_reported + self.every {
            return;
        }
        self.last_reported = done;
        let percent = 100.0 * done as f64 / self.total.max(1) as f64;
        self.emit(ProgressUpdate {
            done,
            total: self.total,
            approximate: self.approximate,
            percent,
        });
    }

    /// Emits the 100% update. Later calls do nothing.
    ///
    /// An early stop reports the samples actually used as the total.
    pub fn finish(&mut self, done: usize) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.emit(ProgressUpdate {
            done,
            total: if self.approximate { done } else { self.total },
            approximate: self.approximate,
            percent: 100.0,
        });
    }

    fn emit(&self, update: ProgressUpdate) {
        if let Err(e) = self.sink.report(&update) {
            log::warn!("ignoring progress failure: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressUpdate>>);

    impl ProgressSink for Recorder {
        fn report(&self, update: &ProgressUpdate) -> Result<(), ProgressError> {
            self.0.lock().unwrap().push(*update);
            Ok(())
        }
    }

    struct Broken;

    impl ProgressSink for Broken {
        fn report(&self, _update: &ProgressUpdate) -> Result<(), ProgressError> {
            Err(ProgressError("closed".to_string()))
        }
    }

    #[test]
    fn throttles_and_finishes_once() {
        let recorder = Arc::new(Recorder::default());
        let mut reporter = ProgressReporter::new(recorder.clone(), 16, false, 4);
        for done in 1..=16 {
            reporter.update(done);
        }
        reporter.finish(16);
        reporter.finish(16);

        let updates = recorder.0.lock().unwrap();
        let done: Vec<_> = updates.iter().map(|u| u.done).collect();
        assert_eq!(done, vec![4, 8, 12, 16]);
        assert_eq!(updates.iter().filter(|u| u.percent == 100.0).count(), 1);
        assert_eq!(updates.last().unwrap().total, 16);
    }

    #[test]
    fn early_finish_reports_used_samples() {
        let recorder = Arc::new(Recorder::default());
        let mut reporter = ProgressReporter::new(recorder.clone(), 1000, true, 1000);
        reporter.finish(250);
        let updates = recorder.0.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].done, 250);
        assert_eq!(updates[0].total, 250);
        assert!(updates[0].approximate);
    }

    #[test]
    fn broken_sink_is_ignored() {
        let mut reporter = ProgressReporter::new(Arc::new(Broken), 4, false, 1);
        reporter.update(1);
        reporter.finish(4);
    }

    #[test]
    fn display_format() {
        let update = ProgressUpdate {
            done: 15,
            total: 16,
            approximate: false,
            percent: 93.75,
        };
        assert_eq!(update.to_string(), "Count: 15/16 (93.8%)");
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = seen.clone();
        let sink: Arc<dyn ProgressSink> = Arc::new(move |_: &ProgressUpdate| {
            *counter.lock().unwrap() += 1;
        });
        let mut reporter = ProgressReporter::new(sink, 2, false, 1);
        reporter.update(1);
        reporter.finish(2);
        assert_eq!(*seen.lock().unwrap(), 2);
    }
}
