//! Raw camera sensor probe.

use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use super::sniff::{Signature, HEADER_LEN};
use super::{ImageMetadata, ProbeError, ProbeResult};
use crate::model::{ImageMode, ImageType, TiffCompression};

/// Smallest file worth handing to the raw decoder.
const MIN_RAW_LEN: u64 = 1024;

/// An opened raw sensor image.
#[derive(Debug, Clone)]
pub struct RawReader {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl RawReader {
    /// Open `path` as a raw sensor image.
    ///
    /// The header is checked first. Only files that may be raw are then
    /// loaded whole, so files over `max_bytes` are rejected as a mismatch.
    pub fn open(path: &Path, max_bytes: u64) -> ProbeResult<Self> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len > max_bytes {
            return Err(ProbeError::mismatch(format!(
                "file of {len} bytes exceeds the raw probe limit"
            )));
        }
        if len < MIN_RAW_LEN {
            return Err(ProbeError::mismatch("file too small for a raw image"));
        }

        let mut header = Vec::new();
        (&mut file).take(HEADER_LEN).read_to_end(&mut header)?;
        reject_known_container(Signature::detect(&header))?;

        file.rewind()?;
        let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
        file.read_to_end(&mut bytes)?;

        let image = rawloader::decode(&mut Cursor::new(bytes.as_slice()))
            .map_err(|e| ProbeError::mismatch(format!("unsupported raw format: {e}")))?;

        tracing::trace!(
            "{:?} decoded as raw from {} {}",
            path,
            image.clean_make,
            image.clean_model
        );

        Ok(Self {
            path: path.to_path_buf(),
            width: dimension(image.width)?,
            height: dimension(image.height)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_dimensions(path: &Path, width: u32, height: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            width,
            height,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Raw files are TIFF-based or carry their own vendor header. A container
/// the sniffer recognises as anything else is not raw.
fn reject_known_container(signature: Signature) -> ProbeResult<()> {
    match signature {
        Signature::Tiff | Signature::Unknown => Ok(()),
        Signature::Pdf => Err(ProbeError::mismatch("unsupported raw format: PDF document")),
        other => Err(ProbeError::mismatch(format!(
            "unsupported raw format: {other:?} container"
        ))),
    }
}

fn dimension(value: usize) -> ProbeResult<u32> {
    u32::try_from(value).map_err(|_| ProbeError::mismatch(format!("implausible sensor dimension {value}")))
}

impl ImageMetadata for RawReader {
    fn format(&self) -> ImageType {
        ImageType::Raw
    }

    fn color_mode(&self) -> ImageMode {
        ImageMode::Rgb
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn compression(&self) -> Option<TiffCompression> {
        Some(TiffCompression::Raw)
    }

    fn quality(&self) -> Option<u8> {
        None
    }

    /// Sensor pixel dimensions, not an optical resolution.
    fn sampling_resolution(&self) -> Option<(f64, f64)> {
        Some((f64::from(self.width), f64::from(self.height)))
    }

    fn recorded_date(&self) -> Option<NaiveDateTime> {
        None
    }
}
