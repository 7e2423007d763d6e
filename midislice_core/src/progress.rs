use std::time::Duration;

/// Milestones reported while the output payload is assembled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Slicing has started; `total_duration` is the playable source length.
    Start { total_duration: Duration },
    /// A segment has been copied; `processed` is the playhead position.
    Advance { processed: Duration },
    /// All segments have been copied.
    Finish,
}

/// Observer of slicing progress. All methods default to doing nothing.
pub trait ProgressReporter {
    fn start(&mut self, _total_duration: Duration) {}

    fn advance(&mut self, _processed: Duration) {}

    fn finish(&mut self) {}
}

/// Adapts a closure over [`ProgressEvent`] into a [`ProgressReporter`].
pub(crate) struct CallbackProgress<F>(pub(crate) F);

impl<F: FnMut(ProgressEvent)> ProgressReporter for CallbackProgress<F> {
    fn start(&mut self, total_duration: Duration) {
        (self.0)(ProgressEvent::Start { total_duration });
    }

    fn advance(&mut self, processed: Duration) {
        (self.0)(ProgressEvent::Advance { processed });
    }

    fn finish(&mut self) {
        (self.0)(ProgressEvent::Finish);
    }
}

/// Reporter that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Convert seconds into a [`Duration`], saturating out-of-range values.
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}
