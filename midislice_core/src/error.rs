use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while slicing audio to a rhythm.
#[derive(Debug, Error)]
pub enum GlitchError {
    /// A required input was not supplied.
    ///
    /// Inputs are checked in declaration order: the timing source (`midi`)
    /// first, then the audio sources (`wav`).
    #[error("missing {name} argument: {hint}")]
    MissingArgument {
        name: &'static str,
        hint: &'static str,
    },

    /// A value needed to derive timing is zero or absent.
    #[error("missing or zero {field}")]
    MissingField { field: &'static str },

    /// An expected RIFF/WAVE sub-chunk is absent or does not fit in the buffer.
    #[error("malformed WAV container: '{tag}' chunk at byte {offset}: {detail}")]
    MalformedContainer {
        tag: String,
        offset: usize,
        detail: String,
    },

    /// The `fmt ` chunk declares something other than integer PCM.
    #[error("unsupported audio format tag {tag} (only PCM/1 is supported)")]
    UnsupportedEncoding { tag: u16 },

    /// A decoded format field has a value that cannot describe audio.
    #[error("invalid {field} value {value} in 'fmt ' chunk")]
    InvalidFormat { field: &'static str, value: u32 },

    /// Channel count and bit depth describe a frame too large for a WAV header.
    #[error("{channels} channel(s) of {bits_per_sample}-bit samples exceed the block align field")]
    BlockAlignOverflow { channels: u16, bits_per_sample: u16 },

    /// A secondary source disagrees with the first source's format.
    #[error(
        "files are not of the same format: source {source_index} has {field} = {found}, expected {expected}"
    )]
    FormatMismatch {
        field: &'static str,
        source_index: usize,
        expected: u64,
        found: u64,
    },

    /// A computed byte range falls outside the source buffer.
    #[error("internal slicing error: byte range {start}..{end} exceeds limit {limit}")]
    RangeOverrun { start: usize, end: usize, limit: usize },

    /// The playhead moved past the available source duration.
    #[error("internal chunk timing error: playhead {playhead}s exceeds total {total}s")]
    TimingOverrun { playhead: f64, total: f64 },

    /// A supplied duration is negative or not a finite number.
    #[error("duration #{index} is invalid: {value}")]
    InvalidDuration { index: usize, value: f64 },

    /// The duration list cannot advance the playhead.
    #[error("duration list must contain at least one value greater than zero")]
    InvalidDurations,

    /// The MIDI file uses SMPTE timecode rather than ticks per quarter note.
    #[error("MIDI files with timecode-based time division are not supported")]
    UnsupportedTiming,

    /// The run would produce more segments than allowed.
    #[error("slicing would exceed the maximum of {limit} segments")]
    SegmentLimitExceeded { limit: usize },

    /// The assembled payload does not fit a RIFF size field.
    #[error("output data of {length} bytes is too large for a WAV container")]
    OutputTooLarge { length: usize },

    /// The output path exists and overwriting was not requested.
    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// Wrapper around errors produced by the MIDI parser.
    #[error("failed to parse MIDI data: {0}")]
    Midi(#[from] midly::Error),

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GlitchError {
    pub(crate) fn malformed(tag: &[u8], offset: usize, detail: impl Into<String>) -> Self {
        GlitchError::MalformedContainer {
            tag: String::from_utf8_lossy(tag).into_owned(),
            offset,
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = GlitchError> = std::result::Result<T, E>;
