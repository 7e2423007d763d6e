//! Canonical PCM header synthesis for the assembled output.

use crate::container::{AudioFormat, DATA_TAG, FMT_TAG, PCM_FORMAT_TAG, RIFF_TAG, WAVE_TAG};
use crate::error::{GlitchError, Result};

/// Length of the synthesized header.
pub const HEADER_LEN: usize = 44;

/// Bytes counted by the RIFF size field besides the data payload.
const RIFF_SIZE_OVERHEAD: u32 = 36;
const FMT_CHUNK_LEN: u32 = 16;

/// Build the 44-byte header describing `data_length` bytes of `format` audio.
///
/// No bytes are copied from any source header; block align is recomputed
/// from channel count and bit depth.
pub fn build_header(data_length: usize, format: &AudioFormat) -> Result<[u8; HEADER_LEN]> {
    let too_large = || GlitchError::OutputTooLarge {
        length: data_length,
    };
    let data_len = u32::try_from(data_length).map_err(|_| too_large())?;
    let riff_len = data_len.checked_add(RIFF_SIZE_OVERHEAD).ok_or_else(too_large)?;
    let block_align =
        u16::try_from(u32::from(format.bits_per_sample) * u32::from(format.channels) / 8)
            .map_err(|_| GlitchError::BlockAlignOverflow {
                channels: format.channels,
                bits_per_sample: format.bits_per_sample,
            })?;

    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&RIFF_TAG);
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());
    header[8..12].copy_from_slice(&WAVE_TAG);
    header[12..16].copy_from_slice(&FMT_TAG);
    header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.bytes_per_second.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(&DATA_TAG);
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    Ok(header)
}

/// Concatenate a synthesized header and its payload into a complete file image.
pub fn assemble(header: &[u8; HEADER_LEN], data: &[u8]) -> Vec<u8> {
    let mut file = Vec::with_capacity(HEADER_LEN + data.len());
    file.extend_from_slice(header);
    file.extend_from_slice(data);
    file
}
