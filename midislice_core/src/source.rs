use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::container::{decode_format, scan_descriptors, AudioFormat, DATA_TAG};
use crate::error::Result;

/// A fully loaded WAV file together with the location of its PCM payload.
#[derive(Clone, Debug)]
pub struct SourceBuffer {
    path: Option<PathBuf>,
    bytes: Vec<u8>,
    format: AudioFormat,
    data_start: usize,
    data_length: usize,
}

impl SourceBuffer {
    /// Read and parse the WAV file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let mut source = Self::from_bytes(bytes)?;
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    /// Parse an in-memory WAV file.
    ///
    /// A `data` chunk that declares more bytes than the buffer holds is
    /// clamped to the bytes actually present.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let table = scan_descriptors(&bytes)?;
        let format = decode_format(&table, &bytes)?;
        let data = table.require(&DATA_TAG)?;

        let available = bytes.len().saturating_sub(data.start);
        let data_length = if data.length > available {
            warn!(
                "data chunk declares {} bytes but only {} are present; using the available bytes",
                data.length, available
            );
            available
        } else {
            data.length
        };

        Ok(Self {
            path: None,
            bytes,
            format,
            data_start: data.start,
            data_length,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The whole file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Offset of the first payload byte of the `data` chunk.
    pub fn data_start(&self) -> usize {
        self.data_start
    }

    /// Payload length of the `data` chunk in bytes.
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// The PCM payload.
    pub fn data(&self) -> &[u8] {
        &self.bytes[self.data_start..self.data_start + self.data_length]
    }

    /// Playable length in seconds, from the declared byte rate.
    pub fn duration_seconds(&self) -> f64 {
        self.data_length as f64 / f64::from(self.format.bytes_per_second)
    }

    pub(crate) fn label(&self) -> String {
        match self.path() {
            Some(path) => path.display().to_string(),
            None => String::from("<memory>"),
        }
    }
}
