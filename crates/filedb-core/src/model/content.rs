//! The `content` namespace: technical metadata attached to a file.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ImageMode, ImageType, TiffCompression};

/// A row of `content.image_file_infos`.
///
/// Dimensions ignore any orientation hint. `bps_x`/`bps_y` carry the
/// resolution reported by the reader (dpi for raster images, sensor pixel
/// dimensions for raw images).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFileInfo {
    pub image_type: ImageType,
    pub image_mode: ImageMode,
    pub width: u32,
    pub height: u32,
    /// `None` when the container does not say.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiff_compression: Option<TiffCompression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps_x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps_y: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<NaiveDateTime>,
}

/// A row of `content.pdf_file_infos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfFileInfo {
    pub number_of_pages: u32,
    /// `None` for a document without pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_nb_chr_per_page: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_nb_images_per_page: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<NaiveDateTime>,
}

/// The single technical record a file can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TechnicalInfo {
    Image(ImageFileInfo),
    Pdf(PdfFileInfo),
}

impl TechnicalInfo {
    /// Table-ish name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Pdf(_) => "pdf",
        }
    }

    pub fn as_image(&self) -> Option<&ImageFileInfo> {
        match self {
            Self::Image(info) => Some(info),
            Self::Pdf(_) => None,
        }
    }

    pub fn as_pdf(&self) -> Option<&PdfFileInfo> {
        match self {
            Self::Pdf(info) => Some(info),
            Self::Image(_) => None,
        }
    }
}
