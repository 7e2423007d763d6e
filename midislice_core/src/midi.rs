//! Standard MIDI file tokenization, reduced to what timing extraction needs.

use std::fs;
use std::path::Path;

use midly::{MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::{GlitchError, Result};

/// Type code reported for meta events.
pub const META: u8 = 0xFF;
/// Type code reported for system-exclusive and escape events.
pub const SYSEX: u8 = 0xF0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiEventKind {
    NoteOn,
    NoteOff,
    /// Any other event, carrying its type code.
    Other(u8),
}

/// One track event: its kind and the ticks elapsed since the previous event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    pub kind: MidiEventKind,
    pub delta_time: u32,
}

impl MidiEvent {
    pub fn new(kind: MidiEventKind, delta_time: u32) -> Self {
        Self { kind, delta_time }
    }
}

/// Tick resolution and per-track event lists of a MIDI file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiTimeline {
    /// Ticks per quarter note.
    pub time_division: u16,
    pub tracks: Vec<Vec<MidiEvent>>,
}

impl MidiTimeline {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Tokenize a standard MIDI file.
    ///
    /// A note-on with zero velocity is reported as a note-off.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes)?;
        let time_division = match smf.header.timing {
            Timing::Metrical(ticks) => ticks.as_int(),
            Timing::Timecode(..) => return Err(GlitchError::UnsupportedTiming),
        };

        let tracks = smf
            .tracks
            .iter()
            .map(|track| {
                track
                    .iter()
                    .map(|event| MidiEvent::new(classify(&event.kind), event.delta.as_int()))
                    .collect()
            })
            .collect();

        Ok(Self {
            time_division,
            tracks,
        })
    }

    /// Events of the first track, which carries the rhythm.
    pub fn first_track(&self) -> Result<&[MidiEvent]> {
        self.tracks
            .first()
            .map(Vec::as_slice)
            .ok_or(GlitchError::MissingField { field: "track" })
    }
}

fn classify(kind: &TrackEventKind<'_>) -> MidiEventKind {
    match kind {
        TrackEventKind::Midi { message, .. } => match message {
            MidiMessage::NoteOn { vel, .. } if vel.as_int() == 0 => MidiEventKind::NoteOff,
            MidiMessage::NoteOn { .. } => MidiEventKind::NoteOn,
            MidiMessage::NoteOff { .. } => MidiEventKind::NoteOff,
            MidiMessage::Aftertouch { .. } => MidiEventKind::Other(0xA),
            MidiMessage::Controller { .. } => MidiEventKind::Other(0xB),
            MidiMessage::ProgramChange { .. } => MidiEventKind::Other(0xC),
            MidiMessage::ChannelAftertouch { .. } => MidiEventKind::Other(0xD),
            MidiMessage::PitchBend { .. } => MidiEventKind::Other(0xE),
        },
        TrackEventKind::SysEx(_) | TrackEventKind::Escape(_) => MidiEventKind::Other(SYSEX),
        TrackEventKind::Meta(_) => MidiEventKind::Other(META),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode a variable-length quantity.
    fn vlq(mut value: u32, out: &mut Vec<u8>) {
        let mut stack = vec![(value & 0x7F) as u8];
        value >>= 7;
        while value > 0 {
            stack.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        out.extend(stack.into_iter().rev());
    }

    /// Build a format-0 MIDI file. Each event is `(delta, status, data1, data2)`.
    fn smf_bytes(division: u16, events: &[(u32, u8, u8, u8)]) -> Vec<u8> {
        let mut track = Vec::new();
        for &(delta, status, data1, data2) in events {
            vlq(delta, &mut track);
            track.extend_from_slice(&[status, data1, data2]);
        }
        vlq(0, &mut track);
        track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"MThd");
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&division.to_be_bytes());
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&track);
        bytes
    }

    #[test]
    fn tokenizes_note_events() {
        let bytes = smf_bytes(
            96,
            &[
                (0, 0x90, 60, 100),
                (96, 0x80, 60, 0),
                (48, 0xB0, 7, 90),
                (0, 0x91, 62, 80),
                (192, 0x91, 62, 0),
            ],
        );
        let timeline = MidiTimeline::parse(&bytes).unwrap();

        assert_eq!(timeline.time_division, 96);
        assert_eq!(
            timeline.first_track().unwrap(),
            &[
                MidiEvent::new(MidiEventKind::NoteOn, 0),
                MidiEvent::new(MidiEventKind::NoteOff, 96),
                MidiEvent::new(MidiEventKind::Other(0xB), 48),
                MidiEvent::new(MidiEventKind::NoteOn, 0),
                MidiEvent::new(MidiEventKind::NoteOff, 192),
                MidiEvent::new(MidiEventKind::Other(META), 0),
            ]
        );
    }

    #[test]
    fn rejects_timecode_division() {
        let bytes = smf_bytes(0xE728, &[(0, 0x90, 60, 100)]);
        assert!(matches!(
            MidiTimeline::parse(&bytes),
            Err(GlitchError::UnsupportedTiming)
        ));
    }

    #[test]
    fn reports_garbage_as_midi_error() {
        assert!(matches!(
            MidiTimeline::parse(b"not a midi file"),
            Err(GlitchError::Midi(_))
        ));
    }

    #[test]
    fn timeline_without_tracks_has_no_rhythm() {
        let timeline = MidiTimeline {
            time_division: 96,
            tracks: Vec::new(),
        };
        assert!(matches!(
            timeline.first_track(),
            Err(GlitchError::MissingField { field: "track" })
        ));
    }
}
