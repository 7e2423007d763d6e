//! RIFF/WAVE container parsing.
//!
//! The reader walks the container's sub-chunks into a [`DescriptorTable`]
//! and decodes the `fmt ` chunk into an [`AudioFormat`]. Only the fields
//! needed to slice raw PCM payloads are decoded; everything else in the
//! container is skipped.

use crate::error::{GlitchError, Result};

/// Four-character chunk identifier.
pub type ChunkTag = [u8; 4];

pub const RIFF_TAG: ChunkTag = *b"RIFF";
pub const WAVE_TAG: ChunkTag = *b"WAVE";
pub const FMT_TAG: ChunkTag = *b"fmt ";
pub const DATA_TAG: ChunkTag = *b"data";

/// `audioFormatTag` value for integer PCM.
pub const PCM_FORMAT_TAG: u16 = 1;

/// Size of the fixed `RIFF` + size + `WAVE` triplet.
const RIFF_HEADER_LEN: usize = 12;
/// Size of a sub-chunk's tag + length prefix.
const CHUNK_HEADER_LEN: usize = 8;
/// Minimum payload of a PCM `fmt ` chunk.
const FMT_MIN_LEN: usize = 16;

/// Location of one sub-chunk payload inside the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Byte offset of the first payload byte.
    pub start: usize,
    /// Declared payload length in bytes.
    pub length: usize,
}

/// Sub-chunk descriptors in container scan order.
///
/// Tags are unique: when a tag repeats, the later descriptor replaces the
/// earlier one but keeps its position in the order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorTable {
    entries: Vec<(ChunkTag, ChunkDescriptor)>,
}

impl DescriptorTable {
    fn insert(&mut self, tag: ChunkTag, descriptor: ChunkDescriptor) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == tag) {
            Some(entry) => entry.1 = descriptor,
            None => self.entries.push((tag, descriptor)),
        }
    }

    pub fn get(&self, tag: &ChunkTag) -> Option<ChunkDescriptor> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == tag)
            .map(|(_, descriptor)| *descriptor)
    }

    /// Look up a descriptor that must be present.
    pub fn require(&self, tag: &ChunkTag) -> Result<ChunkDescriptor> {
        self.get(tag)
            .ok_or_else(|| GlitchError::malformed(tag, 0, "chunk not found in container"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkTag, &ChunkDescriptor)> {
        self.entries.iter().map(|(tag, descriptor)| (tag, descriptor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decoded `fmt ` chunk fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    /// Declared byte rate (`sample_rate * bits_per_sample * channels / 8`).
    pub bytes_per_second: u32,
    /// Declared block align. Read but never validated.
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Size in bytes of one sample frame, computed from channels and bit depth.
    pub fn frame_size(&self) -> usize {
        usize::from(self.channels) * usize::from(self.bits_per_sample) / 8
    }
}

/// Walk a RIFF/WAVE byte sequence and record every sub-chunk it declares.
///
/// The walk trusts declared lengths: a chunk whose length runs past the end
/// of the buffer is recorded as declared and simply ends the scan.
pub fn scan_descriptors(bytes: &[u8]) -> Result<DescriptorTable> {
    if bytes.len() < RIFF_HEADER_LEN || bytes[0..4] != RIFF_TAG {
        return Err(GlitchError::malformed(
            &RIFF_TAG,
            0,
            format!("expected RIFF header, buffer holds {} bytes", bytes.len()),
        ));
    }
    if bytes[8..12] != WAVE_TAG {
        return Err(GlitchError::malformed(
            &WAVE_TAG,
            8,
            "RIFF form type is not WAVE",
        ));
    }

    let mut table = DescriptorTable::default();
    table.insert(
        RIFF_TAG,
        ChunkDescriptor {
            start: 0,
            length: RIFF_HEADER_LEN,
        },
    );

    let mut cursor = RIFF_HEADER_LEN;
    while cursor < bytes.len() - 1 {
        let Some(header) = bytes.get(cursor..cursor + CHUNK_HEADER_LEN) else {
            break;
        };
        let tag: ChunkTag = [header[0], header[1], header[2], header[3]];
        let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let start = cursor + CHUNK_HEADER_LEN;

        table.insert(tag, ChunkDescriptor { start, length });
        cursor = start.saturating_add(length);
    }

    Ok(table)
}

/// Decode the `fmt ` chunk located by `table`.
pub fn decode_format(table: &DescriptorTable, bytes: &[u8]) -> Result<AudioFormat> {
    let fmt = table.require(&FMT_TAG)?;
    if fmt.length < FMT_MIN_LEN {
        return Err(GlitchError::malformed(
            &FMT_TAG,
            fmt.start,
            format!("payload is {} bytes, expected at least {FMT_MIN_LEN}", fmt.length),
        ));
    }
    let payload = bytes
        .get(fmt.start..fmt.start + FMT_MIN_LEN)
        .ok_or_else(|| {
            GlitchError::malformed(
                &FMT_TAG,
                fmt.start,
                format!("payload runs past the end of a {}-byte buffer", bytes.len()),
            )
        })?;

    let format = AudioFormat {
        format_tag: read_u16(payload, 0),
        channels: read_u16(payload, 2),
        sample_rate: read_u32(payload, 4),
        bytes_per_second: read_u32(payload, 8),
        block_align: read_u16(payload, 12),
        bits_per_sample: read_u16(payload, 14),
    };

    if format.format_tag != PCM_FORMAT_TAG {
        return Err(GlitchError::UnsupportedEncoding {
            tag: format.format_tag,
        });
    }
    let required = [
        ("channel count", u32::from(format.channels)),
        ("sample rate", format.sample_rate),
        ("bytes per second", format.bytes_per_second),
        ("bits per sample", u32::from(format.bits_per_sample)),
    ];
    if let Some((field, value)) = required.into_iter().find(|(_, value)| *value == 0) {
        return Err(GlitchError::InvalidFormat { field, value });
    }

    Ok(format)
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
