//! Segment durations derived from literal lists or MIDI note events.

use crate::error::{GlitchError, Result};
use crate::midi::{MidiEvent, MidiEventKind};

/// Ordered segment lengths in seconds, consumed cyclically by the slicer.
#[derive(Clone, Debug, PartialEq)]
pub struct DurationSequence {
    seconds: Vec<f64>,
}

impl DurationSequence {
    /// Use a literal list of seconds.
    ///
    /// Every entry must be finite and non-negative, and at least one must be
    /// greater than zero so that cycling through the list makes progress.
    pub fn from_durations(seconds: Vec<f64>) -> Result<Self> {
        if let Some((index, &value)) = seconds
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_finite() || **value < 0.0)
        {
            return Err(GlitchError::InvalidDuration { index, value });
        }
        if !seconds.iter().any(|value| *value > 0.0) {
            return Err(GlitchError::InvalidDurations);
        }
        Ok(Self { seconds })
    }

    /// Derive durations from a track's note events.
    ///
    /// A note-on restarts the tick count at its own delta, every later event
    /// adds its delta, and each note-off closes one duration.
    pub fn from_midi_track(
        events: &[MidiEvent],
        beats_per_minute: f64,
        ticks_per_quarter_note: u16,
    ) -> Result<Self> {
        if !beats_per_minute.is_finite() || beats_per_minute <= 0.0 {
            return Err(GlitchError::MissingField {
                field: "beats per minute",
            });
        }
        if ticks_per_quarter_note == 0 {
            return Err(GlitchError::MissingField {
                field: "ticks per quarter note",
            });
        }

        let seconds_per_tick = 60.0 / (beats_per_minute * f64::from(ticks_per_quarter_note));
        let mut note_ticks: u64 = 0;
        let mut seconds = Vec::new();

        for event in events {
            let delta = u64::from(event.delta_time);
            match event.kind {
                MidiEventKind::NoteOn => note_ticks = delta,
                MidiEventKind::NoteOff => {
                    note_ticks += delta;
                    seconds.push(note_ticks as f64 * seconds_per_tick);
                }
                MidiEventKind::Other(_) => note_ticks += delta,
            }
        }

        Self::from_durations(seconds)
    }

    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.seconds
    }

    /// Entry for segment `index`, wrapping around the list.
    pub fn cyclic(&self, index: usize) -> f64 {
        self.seconds[index % self.seconds.len()]
    }
}
