//! Re-sequence PCM WAV recordings to the rhythm of a MIDI track.
//!
//! Segment lengths come from a MIDI file's note events or from a literal
//! list of seconds. Segments are cut in turn from each source recording and
//! concatenated behind a freshly synthesized WAV header.

pub mod container;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod header;
pub mod midi;
pub mod progress;
pub mod source;
pub mod timing;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

pub use crate::container::{AudioFormat, ChunkDescriptor, DescriptorTable};
pub use crate::diagnostics::{Diagnostics, LogDiagnostics, Silent};
pub use crate::engine::{AlignmentMode, EngineOptions, SegmentPlan, SliceEngine};
pub use crate::error::{GlitchError, Result};
pub use crate::header::{assemble, build_header, HEADER_LEN};
pub use crate::midi::{MidiEvent, MidiEventKind, MidiTimeline};
pub use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
pub use crate::source::SourceBuffer;
pub use crate::timing::DurationSequence;

use crate::progress::CallbackProgress;

/// Tempo assumed when none is given.
pub const DEFAULT_BPM: f64 = 120.0;
/// Appended to the MIDI path to name the output when no path is given.
pub const GLITCH_SUFFIX: &str = "_glitch.wav";
/// Output file name used for literal duration lists when no path is given.
pub const DEFAULT_OUTPUT: &str = "glitch.wav";

/// Where segment lengths come from.
#[derive(Clone, Debug, PartialEq)]
pub enum TimingSource {
    /// Note events of the first track of a standard MIDI file.
    Midi(PathBuf),
    /// Literal segment lengths in seconds.
    Durations(Vec<f64>),
}

impl TimingSource {
    fn default_output(&self) -> PathBuf {
        match self {
            TimingSource::Midi(path) => {
                let mut name = OsString::from(path.as_os_str());
                name.push(GLITCH_SUFFIX);
                PathBuf::from(name)
            }
            TimingSource::Durations(_) => PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

/// Configuration for a slicing run.
#[derive(Clone, Debug)]
pub struct Config {
    pub timing: TimingSource,
    /// Source recordings, used in round-robin order.
    pub wav_paths: Vec<PathBuf>,
    /// Tempo used to convert MIDI ticks into seconds.
    pub beats_per_minute: f64,
    /// Destination of the assembled WAV file.
    pub output_path: PathBuf,
    /// Replace `output_path` if it already exists.
    pub overwrite: bool,
    pub engine: EngineOptions,
}

impl Config {
    /// Construct a [`Config`] with default tempo, output path and engine options.
    pub fn new<I, P>(timing: TimingSource, wav_paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::builder().timing(timing).wavs(wav_paths).build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve the segment durations described by [`Config::timing`].
    pub fn load_durations(&self) -> Result<DurationSequence> {
        match &self.timing {
            TimingSource::Durations(seconds) => DurationSequence::from_durations(seconds.clone()),
            TimingSource::Midi(path) => {
                let timeline = MidiTimeline::load(path)?;
                let events = timeline.first_track()?;
                let sink = self.engine.diagnostics_sink();
                sink.emit(format_args!(
                    "{}: {} events, {} ticks per quarter note at {} bpm",
                    path.display(),
                    events.len(),
                    timeline.time_division,
                    self.beats_per_minute
                ));
                let durations = DurationSequence::from_midi_track(
                    events,
                    self.beats_per_minute,
                    timeline.time_division,
                )?;
                sink.emit(format_args!("durations: {:?}", durations.as_slice()));
                Ok(durations)
            }
        }
    }

    /// Read and parse every source recording.
    pub fn load_sources(&self) -> Result<Vec<SourceBuffer>> {
        self.wav_paths.iter().map(SourceBuffer::load).collect()
    }
}

/// Builder for [`Config`].
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    timing: Option<TimingSource>,
    wav_paths: Vec<PathBuf>,
    beats_per_minute: Option<f64>,
    output_path: Option<PathBuf>,
    overwrite: bool,
    engine: EngineOptions,
}

impl ConfigBuilder {
    pub fn timing(mut self, timing: TimingSource) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn midi<P: Into<PathBuf>>(self, path: P) -> Self {
        self.timing(TimingSource::Midi(path.into()))
    }

    pub fn durations(self, seconds: Vec<f64>) -> Self {
        self.timing(TimingSource::Durations(seconds))
    }

    pub fn wav<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.wav_paths.push(path.into());
        self
    }

    pub fn wavs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.wav_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn beats_per_minute(mut self, bpm: f64) -> Self {
        self.beats_per_minute = Some(bpm);
        self
    }

    pub fn output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn engine(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }

    pub fn alignment(mut self, alignment: AlignmentMode) -> Self {
        self.engine = self.engine.alignment(alignment);
        self
    }

    /// Route engine diagnostics through the `log` facade.
    pub fn verbose(mut self, verbose: bool) -> Self {
        let sink: Arc<dyn Diagnostics> = if verbose {
            Arc::new(LogDiagnostics)
        } else {
            Arc::new(Silent)
        };
        self.engine = self.engine.diagnostics(sink);
        self
    }

    /// Validate the collected settings.
    ///
    /// Missing inputs are reported in declaration order: the timing source
    /// (`midi`) before the recordings (`wav`).
    pub fn build(self) -> Result<Config> {
        let timing = self.timing.ok_or(GlitchError::MissingArgument {
            name: "midi",
            hint: "give the path of a MIDI \"beat\" file or a list of durations",
        })?;
        if self.wav_paths.is_empty() {
            return Err(GlitchError::MissingArgument {
                name: "wav",
                hint: "give the path of at least one WAV file",
            });
        }
        let beats_per_minute = self.beats_per_minute.unwrap_or(DEFAULT_BPM);
        if !beats_per_minute.is_finite() || beats_per_minute <= 0.0 {
            return Err(GlitchError::MissingField {
                field: "beats per minute",
            });
        }
        let output_path = self
            .output_path
            .unwrap_or_else(|| timing.default_output());

        Ok(Config {
            timing,
            wav_paths: self.wav_paths,
            beats_per_minute,
            output_path,
            overwrite: self.overwrite,
            engine: self.engine,
        })
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    /// Length of the assembled PCM payload in bytes.
    pub data_bytes: usize,
    /// Length of the assembled audio in seconds.
    pub duration_seconds: f64,
}

/// Slice the configured recordings and write the assembled WAV file.
pub fn run(config: Config) -> Result<RunSummary> {
    run_with_reporter(config, &mut NoProgress)
}

/// Like [`run`], invoking `callback` as segments are assembled.
pub fn run_with_progress<F>(config: Config, callback: F) -> Result<RunSummary>
where
    F: FnMut(ProgressEvent),
{
    run_with_reporter(config, &mut CallbackProgress(callback))
}

/// Like [`run`], reporting to an arbitrary [`ProgressReporter`].
///
/// Nothing is written unless the whole payload was assembled.
pub fn run_with_reporter(
    config: Config,
    reporter: &mut dyn ProgressReporter,
) -> Result<RunSummary> {
    ensure_writable(&config.output_path, config.overwrite)?;

    let durations = config.load_durations()?;
    let sources = config.load_sources()?;
    let engine = SliceEngine::new(&sources, config.engine.clone())?;
    info!(
        "slicing {} source(s) over {:.3}s with {} duration(s)",
        sources.len(),
        engine.total_seconds(),
        durations.len()
    );

    let data = engine.run_with_reporter(&durations, reporter)?;
    let format = *engine.format();
    let header = build_header(data.len(), &format)?;
    fs::write(&config.output_path, assemble(&header, &data))?;

    let summary = RunSummary {
        output_path: config.output_path,
        data_bytes: data.len(),
        duration_seconds: data.len() as f64 / f64::from(format.bytes_per_second),
    };
    info!(
        "wrote {:.3}s of audio to '{}'",
        summary.duration_seconds,
        summary.output_path.display()
    );
    Ok(summary)
}

/// Compute the segments a run would assemble, without writing anything.
pub fn plan_segments(config: &Config) -> Result<Vec<SegmentPlan>> {
    let durations = config.load_durations()?;
    let sources = config.load_sources()?;
    SliceEngine::new(&sources, config.engine.clone())?.plan(&durations)
}

fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && path.exists() {
        return Err(GlitchError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}
