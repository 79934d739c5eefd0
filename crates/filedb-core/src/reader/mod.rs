//! Format reader chain.
//!
//! A file is classified by content, never by extension: the raster probe runs
//! first, then the raw-sensor probe, then the PDF probe. A probe either opens
//! the file, reports a format mismatch (the next probe runs), or fails with an
//! I/O error (the chain stops and the file is reported unreadable).

mod jp2;
pub mod pdf;
pub mod raster;
pub mod raw;
pub mod sniff;

pub use pdf::{PageSource, PdfReader};
pub use raster::RasterReader;
pub use raw::RawReader;
pub use sniff::Signature;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::config::LimitsConfig;
use crate::error::{IdentifyError, IdentifyResult};
use crate::model::{ImageMode, ImageType, TiffCompression};

/// The probes of the chain, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    Image,
    Raw,
    Pdf,
}

impl ReaderKind {
    pub const CHAIN: [ReaderKind; 3] = [ReaderKind::Image, ReaderKind::Raw, ReaderKind::Pdf];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Raw => "raw",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a probe did not produce a reader.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The file is not in this probe's format. The chain moves on.
    #[error("{0}")]
    Mismatch(String),

    /// The file could not be read. The chain stops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProbeError {
    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        Self::Mismatch(reason.into())
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Read surface shared by raster and raw readers.
pub trait ImageMetadata {
    fn format(&self) -> ImageType;
    fn color_mode(&self) -> ImageMode;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// `None` when the container does not state a codec.
    fn compression(&self) -> Option<TiffCompression>;
    fn quality(&self) -> Option<u8>;
    /// Horizontal and vertical resolution.
    fn sampling_resolution(&self) -> Option<(f64, f64)>;
    fn recorded_date(&self) -> Option<NaiveDateTime>;
}

/// An opened file, tagged with the probe that accepted it.
#[derive(Debug)]
pub enum FormatReader {
    Image(RasterReader),
    Raw(RawReader),
    Pdf(PdfReader),
}

impl FormatReader {
    pub fn kind(&self) -> ReaderKind {
        match self {
            Self::Image(_) => ReaderKind::Image,
            Self::Raw(_) => ReaderKind::Raw,
            Self::Pdf(_) => ReaderKind::Pdf,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Image(r) => r.path(),
            Self::Raw(r) => r.path(),
            Self::Pdf(r) => r.path(),
        }
    }

    /// The image read surface, for raster and raw readers.
    pub fn image_metadata(&self) -> Option<&dyn ImageMetadata> {
        match self {
            Self::Image(r) => Some(r as &dyn ImageMetadata),
            Self::Raw(r) => Some(r as &dyn ImageMetadata),
            Self::Pdf(_) => None,
        }
    }

    /// Filesystem modification time in local time, truncated to the day.
    pub fn modified_date(&self) -> io::Result<NaiveDate> {
        let modified = std::fs::metadata(self.path())?.modified()?;
        Ok(DateTime::<Local>::from(modified).date_naive())
    }
}

/// Runs a single probe against a file.
pub trait Probe {
    fn probe(&self, kind: ReaderKind, path: &Path) -> ProbeResult<FormatReader>;
}

/// The built-in format readers.
#[derive(Debug, Clone)]
pub struct NativeProbe {
    max_probe_bytes: u64,
}

impl NativeProbe {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self {
            max_probe_bytes: limits.max_probe_bytes(),
        }
    }
}

impl Default for NativeProbe {
    fn default() -> Self {
        Self::new(&LimitsConfig::default())
    }
}

impl Probe for NativeProbe {
    fn probe(&self, kind: ReaderKind, path: &Path) -> ProbeResult<FormatReader> {
        match kind {
            ReaderKind::Image => RasterReader::open(path).map(FormatReader::Image),
            ReaderKind::Raw => RawReader::open(path, self.max_probe_bytes).map(FormatReader::Raw),
            ReaderKind::Pdf => PdfReader::open(path, self.max_probe_bytes).map(FormatReader::Pdf),
        }
    }
}

/// Outcome of a successful classification.
#[derive(Debug)]
pub struct Identified {
    pub reader: FormatReader,
    /// Probes that ran, in order, ending with the one that accepted the file.
    pub attempted: Vec<ReaderKind>,
}

/// Ordered fallback over the probes.
#[derive(Debug, Clone)]
pub struct FormatChain<P = NativeProbe> {
    probe: P,
}

impl FormatChain {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self::with_probe(NativeProbe::new(limits))
    }
}

impl<P: Probe> FormatChain<P> {
    pub fn with_probe(probe: P) -> Self {
        Self { probe }
    }

    /// Classify `path` and return the opened reader.
    pub fn identify(&self, path: &Path) -> IdentifyResult<Identified> {
        let mut attempted = Vec::with_capacity(ReaderKind::CHAIN.len());
        let mut last_error = String::new();

        for kind in ReaderKind::CHAIN {
            attempted.push(kind);
            match self.probe.probe(kind, path) {
                Ok(reader) => {
                    tracing::debug!("{:?} opened as {kind}", path);
                    return Ok(Identified { reader, attempted });
                }
                Err(ProbeError::Mismatch(reason)) => {
                    tracing::trace!("{:?} is not {kind}: {reason}", path);
                    last_error = format!("{kind}: {reason}");
                }
                Err(ProbeError::Io(e)) => return Err(IdentifyError::io(path, e)),
            }
        }

        Err(IdentifyError::Unsupported {
            path: path.to_path_buf(),
            last_error,
        })
    }
}
