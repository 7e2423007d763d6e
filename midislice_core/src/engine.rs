//! Round-robin slicing of PCM payloads.
//!
//! The engine walks a [`DurationSequence`] against the playable length of
//! the first source, cutting each segment from the next source in turn. Cut
//! points are rounded down onto a byte grid anchored at each source's `data`
//! payload, so every slice starts and ends on the same alignment as the first.

use std::fmt;
use std::sync::Arc;

use crate::container::AudioFormat;
use crate::diagnostics::{Diagnostics, Silent};
use crate::error::{GlitchError, Result};
use crate::progress::{seconds_to_duration, NoProgress, ProgressReporter};
use crate::source::SourceBuffer;
use crate::timing::DurationSequence;

/// Default upper bound on segments per run.
pub const DEFAULT_MAX_SEGMENTS: usize = 1_000_000;

/// Tolerance absorbing floating point error when converting seconds to bytes.
const BYTE_EPSILON: f64 = 1e-6;

/// Which `fmt ` field supplies the byte grid that cut points snap to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlignmentMode {
    /// The declared bits-per-sample value, used directly as a byte count.
    #[default]
    BitsPerSample,
    /// The size of one sample frame (`channels * bits_per_sample / 8`).
    BlockAlign,
}

impl AlignmentMode {
    pub fn divisor(self, format: &AudioFormat) -> usize {
        let divisor = match self {
            AlignmentMode::BitsPerSample => usize::from(format.bits_per_sample),
            AlignmentMode::BlockAlign => format.frame_size(),
        };
        divisor.max(1)
    }
}

/// Tuning for a [`SliceEngine`].
#[derive(Clone, Debug)]
pub struct EngineOptions {
    alignment: AlignmentMode,
    require_equal_lengths: bool,
    max_segments: usize,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            alignment: AlignmentMode::default(),
            require_equal_lengths: true,
            max_segments: DEFAULT_MAX_SEGMENTS,
            diagnostics: Arc::new(Silent),
        }
    }
}

impl EngineOptions {
    pub fn alignment(mut self, alignment: AlignmentMode) -> Self {
        self.alignment = alignment;
        self
    }

    /// Whether sources must agree on `data` chunk offset and length.
    pub fn require_equal_lengths(mut self, require: bool) -> Self {
        self.require_equal_lengths = require;
        self
    }

    pub fn max_segments(mut self, limit: usize) -> Self {
        self.max_segments = limit;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn diagnostics_sink(&self) -> &dyn Diagnostics {
        self.diagnostics.as_ref()
    }
}

/// One planned slice of the output.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentPlan {
    pub index: usize,
    pub source_index: usize,
    pub duration_index: usize,
    /// Duration asked for by the sequence.
    pub requested_seconds: f64,
    /// Duration actually taken after clamping to the remaining source length.
    pub seconds: f64,
    /// Playhead position at which the segment starts.
    pub start_seconds: f64,
    /// Absolute byte offset of the first copied byte in the source file.
    pub start: usize,
    /// Absolute byte offset one past the last copied byte.
    pub end: usize,
}

impl SegmentPlan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for SegmentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} source {} at {:.3}s for {:.3}s (bytes {}..{})",
            self.index, self.source_index, self.start_seconds, self.seconds, self.start, self.end
        )
    }
}

struct SlicingState {
    playhead_seconds: f64,
    segment_index: usize,
    initial_alignment_offset: Option<usize>,
}

impl SlicingState {
    fn new() -> Self {
        Self {
            playhead_seconds: 0.0,
            segment_index: 0,
            initial_alignment_offset: None,
        }
    }
}

/// Cuts and reassembles PCM payloads from equally formatted sources.
#[derive(Debug)]
pub struct SliceEngine<'a> {
    sources: &'a [SourceBuffer],
    options: EngineOptions,
    divisor: usize,
    total_seconds: f64,
}

impl<'a> SliceEngine<'a> {
    /// Validate that `sources` can be sliced together.
    pub fn new(sources: &'a [SourceBuffer], options: EngineOptions) -> Result<Self> {
        let first = sources.first().ok_or(GlitchError::MissingArgument {
            name: "wav",
            hint: "supply the path of at least one WAV file",
        })?;

        for (source_index, source) in sources.iter().enumerate().skip(1) {
            check_same_format(first, source, source_index, options.require_equal_lengths)?;
        }

        let divisor = options.alignment.divisor(first.format());
        let total_seconds = first.duration_seconds();
        options.diagnostics.emit(format_args!(
            "{} source(s), {:.6}s available, alignment divisor {} bytes ({:?})",
            sources.len(),
            total_seconds,
            divisor,
            options.alignment
        ));

        Ok(Self {
            sources,
            options,
            divisor,
            total_seconds,
        })
    }

    /// Playable length of the first source, which bounds the output.
    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    pub fn format(&self) -> &AudioFormat {
        self.sources[0].format()
    }

    /// Byte grid that cut points snap to.
    pub fn divisor(&self) -> usize {
        self.divisor
    }

    /// Compute every segment without copying any audio.
    pub fn plan(&self, durations: &DurationSequence) -> Result<Vec<SegmentPlan>> {
        let mut segments = Vec::new();
        self.walk(durations, |segment| {
            segments.push(segment.clone());
            Ok(())
        })?;
        Ok(segments)
    }

    /// Assemble the output payload.
    pub fn run(&self, durations: &DurationSequence) -> Result<Vec<u8>> {
        self.run_with_reporter(durations, &mut NoProgress)
    }

    /// Assemble the output payload, reporting progress after each segment.
    pub fn run_with_reporter(
        &self,
        durations: &DurationSequence,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<Vec<u8>> {
        reporter.start(seconds_to_duration(self.total_seconds));

        let capacity = self.sources[0].data_length();
        let mut collected = Vec::with_capacity(capacity);
        self.walk(durations, |segment| {
            let source = &self.sources[segment.source_index];
            collected.extend_from_slice(&source.bytes()[segment.start..segment.end]);
            reporter.advance(seconds_to_duration(
                segment.start_seconds + segment.seconds,
            ));
            Ok(())
        })?;

        reporter.finish();
        self.options.diagnostics.emit(format_args!(
            "collected {} bytes of {} available",
            collected.len(),
            self.sources[0].data_length()
        ));
        Ok(collected)
    }

    fn walk<F>(&self, durations: &DurationSequence, mut visit: F) -> Result<()>
    where
        F: FnMut(&SegmentPlan) -> Result<()>,
    {
        let mut state = SlicingState::new();
        while state.playhead_seconds < self.total_seconds {
            if state.segment_index >= self.options.max_segments {
                return Err(GlitchError::SegmentLimitExceeded {
                    limit: self.options.max_segments,
                });
            }
            let segment = self.next_segment(&mut state, durations)?;
            visit(&segment)?;
        }
        Ok(())
    }

    fn next_segment(
        &self,
        state: &mut SlicingState,
        durations: &DurationSequence,
    ) -> Result<SegmentPlan> {
        let index = state.segment_index;
        let source_index = index % self.sources.len();
        let duration_index = index % durations.len();
        let source = &self.sources[source_index];
        let requested_seconds = durations.cyclic(index);

        let start_seconds = state.playhead_seconds;
        let remaining = self.total_seconds - start_seconds;
        let (seconds, playhead_after) = if requested_seconds >= remaining {
            (remaining, self.total_seconds)
        } else {
            (requested_seconds, start_seconds + requested_seconds)
        };

        let bytes_per_second = f64::from(source.format().bytes_per_second);
        let start_bit = start_seconds * bytes_per_second;
        let end_bit = start_bit + seconds * bytes_per_second;

        // Offsets are aligned relative to each source's own payload.
        let start_rel = byte_floor(start_bit);
        let bias = *state
            .initial_alignment_offset
            .get_or_insert(start_rel % self.divisor);
        let limit = align_down(source.data_length(), self.divisor, bias);
        let start =
            source.data_start() + align_down(start_rel, self.divisor, bias).min(limit);
        let end = source.data_start()
            + align_down(byte_floor(end_bit), self.divisor, bias).min(limit);

        if start > end || end > source.bytes().len() {
            return Err(GlitchError::RangeOverrun {
                start,
                end,
                limit: source.bytes().len(),
            });
        }
        if playhead_after > self.total_seconds {
            return Err(GlitchError::TimingOverrun {
                playhead: playhead_after,
                total: self.total_seconds,
            });
        }

        let segment = SegmentPlan {
            index,
            source_index,
            duration_index,
            requested_seconds,
            seconds,
            start_seconds,
            start,
            end,
        };
        self.options.diagnostics.emit(format_args!(
            "{segment} from {}",
            source.label()
        ));

        state.playhead_seconds = playhead_after;
        state.segment_index += 1;
        Ok(segment)
    }
}

fn check_same_format(
    first: &SourceBuffer,
    other: &SourceBuffer,
    source_index: usize,
    require_equal_lengths: bool,
) -> Result<()> {
    let (a, b) = (first.format(), other.format());
    let mut fields = Vec::with_capacity(6);
    if require_equal_lengths {
        fields.push(("data start", first.data_start() as u64, other.data_start() as u64));
        fields.push(("data length", first.data_length() as u64, other.data_length() as u64));
    }
    fields.extend([
        ("channel count", u64::from(a.channels), u64::from(b.channels)),
        ("sample rate", u64::from(a.sample_rate), u64::from(b.sample_rate)),
        (
            "bytes per second",
            u64::from(a.bytes_per_second),
            u64::from(b.bytes_per_second),
        ),
        (
            "bits per sample",
            u64::from(a.bits_per_sample),
            u64::from(b.bits_per_sample),
        ),
    ]);

    match fields.into_iter().find(|(_, expected, found)| expected != found) {
        Some((field, expected, found)) => Err(GlitchError::FormatMismatch {
            field,
            source_index,
            expected,
            found,
        }),
        None => Ok(()),
    }
}

fn byte_floor(position: f64) -> usize {
    (position + BYTE_EPSILON).floor() as usize
}

/// Round `position` down onto the grid `bias + k * divisor`.
fn align_down(position: usize, divisor: usize, bias: usize) -> usize {
    if position < bias {
        return position;
    }
    bias + (position - bias) / divisor * divisor
}
