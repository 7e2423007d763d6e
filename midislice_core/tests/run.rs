use midislice_core::{
    plan_segments, run, run_with_progress, Config, EngineOptions, GlitchError, ProgressEvent,
    SourceBuffer, TimingSource, HEADER_LEN,
};
use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tempfile::tempdir;

/// Generate a 16-bit PCM WAV fixture at runtime.
///
/// Each channel carries a sine wave; `frequency` lets the tests tell two
/// fixtures apart without committing binary assets to the repository.
fn write_test_tone<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency: f32,
) -> Result<(), Box<dyn Error>> {
    let total_frames = sample_rate as u64 * duration_ms / 1_000;
    let mut samples = Vec::with_capacity(total_frames as usize * channels as usize * 2);

    for n in 0..total_frames {
        let theta = (n as f32 / sample_rate as f32) * 2.0 * std::f32::consts::PI * frequency;
        let sample = (theta.sin() * i16::MAX as f32 * 0.5) as i16;
        for _ in 0..channels {
            samples.extend_from_slice(&sample.to_le_bytes());
        }
    }

    let block_align = channels * 2;
    let mut file = File::create(path)?;
    let data_len = samples.len() as u32;
    file.write_all(b"RIFF")?;
    file.write_all(&(36u32 + data_len).to_le_bytes())?;
    file.write_all(b"WAVE")?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?;
    file.write_all(&channels.to_le_bytes())?;
    file.write_all(&sample_rate.to_le_bytes())?;
    file.write_all(&(sample_rate * u32::from(block_align)).to_le_bytes())?;
    file.write_all(&block_align.to_le_bytes())?;
    file.write_all(&16u16.to_le_bytes())?;
    file.write_all(b"data")?;
    file.write_all(&data_len.to_le_bytes())?;
    file.write_all(&samples)?;
    Ok(())
}

/// Write a single-track MIDI file with one note per `(rest, length)` pair, in ticks.
fn write_beat_file<P: AsRef<Path>>(
    path: P,
    ticks_per_quarter: u16,
    notes: &[(u8, u8)],
) -> Result<(), Box<dyn Error>> {
    let mut track = Vec::new();
    for &(rest, length) in notes {
        track.extend_from_slice(&[rest, 0x90, 60, 100]);
        track.extend_from_slice(&[length, 0x80, 60, 0]);
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let mut file = File::create(path)?;
    file.write_all(b"MThd")?;
    file.write_all(&6u32.to_be_bytes())?;
    file.write_all(&0u16.to_be_bytes())?;
    file.write_all(&1u16.to_be_bytes())?;
    file.write_all(&ticks_per_quarter.to_be_bytes())?;
    file.write_all(b"MTrk")?;
    file.write_all(&(track.len() as u32).to_be_bytes())?;
    file.write_all(&track)?;
    Ok(())
}

struct WavInfo {
    sample_rate: Option<u32>,
    channels: Option<usize>,
    frames: Option<u64>,
}

fn inspect_wav(path: &Path) -> Result<WavInfo, Box<dyn Error>> {
    let mss = MediaSourceStream::new(Box::new(File::open(path)?), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("wav");
    let inspected = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let track = inspected
        .format
        .default_track()
        .ok_or("output has no default track")?;

    Ok(WavInfo {
        sample_rate: track.codec_params.sample_rate,
        channels: track.codec_params.channels.map(|channels| channels.count()),
        frames: track.codec_params.n_frames,
    })
}

#[test]
fn run_with_duration_list_writes_a_decodable_wav() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let first = work_dir.path().join("0.wav");
    let second = work_dir.path().join("1.wav");
    write_test_tone(&first, 8_000, 2, 1_000, 440.0)?;
    write_test_tone(&second, 8_000, 2, 1_000, 660.0)?;
    let output = work_dir.path().join("out.wav");

    let config = Config::builder()
        .durations(vec![0.125; 5])
        .wavs([&first, &second])
        .beats_per_minute(80.0)
        .output(&output)
        .build()?;
    let summary = run(config)?;

    assert_eq!(summary.output_path, output);
    let bytes = fs::read(&output)?;
    assert_eq!(bytes.len(), HEADER_LEN + summary.data_bytes);
    assert_eq!(summary.data_bytes % 16, 0);
    assert!((summary.duration_seconds - 1.0).abs() < 0.001);

    let written = SourceBuffer::load(&output)?;
    assert_eq!(written.data_start(), HEADER_LEN);
    assert_eq!(written.data_length(), summary.data_bytes);
    assert_eq!(written.format().channels, 2);
    assert_eq!(written.format().block_align, 4);

    let inspected = inspect_wav(&output)?;
    assert_eq!(inspected.sample_rate, Some(8_000));
    assert_eq!(inspected.channels, Some(2));
    assert_eq!(inspected.frames, Some(summary.data_bytes as u64 / 4));

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_with_midi_file_writes_next_to_the_beat_file() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let midi_path = work_dir.path().join("beat.mid");
    // 96 ticks per quarter at 120 bpm: 48 ticks last 0.25s. The rest before
    // the third note counts towards its length.
    write_beat_file(&midi_path, 96, &[(0, 48), (0, 96), (48, 24)])?;
    let wav = work_dir.path().join("tone.wav");
    write_test_tone(&wav, 8_000, 1, 1_500, 440.0)?;

    let config = Config::new(TimingSource::Midi(midi_path.clone()), [&wav])?;
    let expected_output = work_dir.path().join("beat.mid_glitch.wav");
    assert_eq!(config.output_path, expected_output);

    let plan = plan_segments(&config)?;
    let seconds: Vec<f64> = plan.iter().map(|segment| segment.requested_seconds).collect();
    for (actual, expected) in seconds.iter().zip([0.25, 0.5, 0.375]) {
        assert!((actual - expected).abs() < 1e-9, "{seconds:?}");
    }

    let summary = run(config)?;
    assert_eq!(summary.output_path, expected_output);
    assert!(expected_output.is_file());
    assert!((summary.duration_seconds - 1.5).abs() < 0.001);

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_refuses_to_replace_existing_output_unless_asked() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let wav = work_dir.path().join("tone.wav");
    write_test_tone(&wav, 8_000, 1, 500, 440.0)?;
    let output = work_dir.path().join("glitch.wav");
    fs::write(&output, b"keep me")?;

    let builder = Config::builder()
        .durations(vec![0.1])
        .wav(&wav)
        .output(&output);

    let err = run(builder.clone().build()?).expect_err("existing output should be kept");
    match err {
        GlitchError::OutputExists(path) => assert_eq!(path, output),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fs::read(&output)?, b"keep me");

    run(builder.overwrite(true).build()?)?;
    assert_ne!(fs::read(&output)?, b"keep me");

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_rejects_mismatched_formats_without_writing() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let mono = work_dir.path().join("mono.wav");
    let stereo = work_dir.path().join("stereo.wav");
    write_test_tone(&mono, 8_000, 1, 500, 440.0)?;
    write_test_tone(&stereo, 8_000, 2, 250, 440.0)?;
    let output = work_dir.path().join("out.wav");

    let config = Config::builder()
        .durations(vec![0.1])
        .wavs([&mono, &stereo])
        .output(&output)
        .build()?;
    let err = run(config).expect_err("format mismatch should fail");

    assert!(matches!(
        err,
        GlitchError::FormatMismatch {
            field: "channel count",
            source_index: 1,
            ..
        }
    ));
    assert!(!output.exists());

    work_dir.close()?;
    Ok(())
}

#[test]
fn shorter_first_source_bounds_the_output() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let short = work_dir.path().join("short.wav");
    let long = work_dir.path().join("long.wav");
    write_test_tone(&short, 44_100, 2, 2_000, 440.0)?;
    write_test_tone(&long, 44_100, 2, 2_500, 220.0)?;
    let output = work_dir.path().join("out.wav");

    let config = Config::builder()
        .durations(vec![1.0])
        .wavs([&short, &long])
        .output(&output)
        .engine(EngineOptions::default().require_equal_lengths(false))
        .build()?;

    let plan = plan_segments(&config)?;
    let sources: Vec<usize> = plan.iter().map(|segment| segment.source_index).collect();
    assert_eq!(sources, vec![0, 1]);

    let summary = run(config)?;
    assert_eq!(summary.data_bytes, 2 * 176_400);
    assert!((summary.duration_seconds - 2.0).abs() < f64::EPSILON);

    work_dir.close()?;
    Ok(())
}

#[test]
fn progress_events_bracket_the_run() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let wav = work_dir.path().join("tone.wav");
    write_test_tone(&wav, 8_000, 1, 1_000, 440.0)?;

    let config = Config::builder()
        .durations(vec![0.3])
        .wav(&wav)
        .output(work_dir.path().join("out.wav"))
        .build()?;

    let mut events = Vec::new();
    run_with_progress(config, |event| events.push(event))?;

    assert!(matches!(events.first(), Some(ProgressEvent::Start { .. })));
    assert_eq!(events.last(), Some(&ProgressEvent::Finish));
    let advances: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Advance { processed } => Some(*processed),
            _ => None,
        })
        .collect();
    assert_eq!(advances.len(), 4);
    assert!(advances.windows(2).all(|pair| pair[0] <= pair[1]));

    work_dir.close()?;
    Ok(())
}
