//! EXIF/TIFF tag extraction from image containers.

use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::io::{self, BufRead, Seek};

use crate::model::TiffCompression;

/// TIFF resolution units.
const UNIT_NONE: u32 = 1;
const UNIT_CENTIMETER: u32 = 3;

/// The tags the catalog cares about, read from the primary image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    pub compression: Option<TiffCompression>,
    /// X and Y resolution in dots per inch
    pub resolution: Option<(f64, f64)>,
    pub recorded_date: Option<NaiveDateTime>,
    pub bits_per_sample: Option<u32>,
    pub samples_per_pixel: Option<u32>,
    pub photometric: Option<u32>,
}

/// Extracts EXIF metadata from image files.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract the summary from a TIFF, JPEG, PNG or WebP container.
    ///
    /// Returns `Ok(None)` when the container carries no usable EXIF block.
    /// Only I/O failures are errors; malformed metadata is treated as absent.
    pub fn extract<R: BufRead + Seek>(reader: &mut R) -> io::Result<Option<ExifSummary>> {
        let exif = match Reader::new().read_from_container(reader) {
            Ok(exif) => exif,
            Err(exif::Error::Io(e)) => return Err(e),
            Err(e) => {
                tracing::trace!("No EXIF data: {e}");
                return Ok(None);
            }
        };

        Ok(Some(ExifSummary {
            compression: Self::get_u32(&exif, Tag::Compression).map(TiffCompression::from_tag),
            resolution: Self::get_resolution(&exif),
            recorded_date: Self::get_datetime(&exif),
            bits_per_sample: Self::get_u32(&exif, Tag::BitsPerSample),
            samples_per_pixel: Self::get_u32(&exif, Tag::SamplesPerPixel),
            photometric: Self::get_u32(&exif, Tag::PhotometricInterpretation),
        }))
    }

    /// First value of an integer field.
    fn get_u32(exif: &exif::Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    }

    fn get_rational(exif: &exif::Exif, tag: Tag) -> Option<f64> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Rational(v) => v.first().map(|r| r.to_f64()),
                _ => f.value.get_uint(0).map(f64::from),
            })
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    /// Resolution converted to dpi. Unitless resolutions are aspect ratios and ignored.
    fn get_resolution(exif: &exif::Exif) -> Option<(f64, f64)> {
        let x = Self::get_rational(exif, Tag::XResolution)?;
        let y = Self::get_rational(exif, Tag::YResolution).unwrap_or(x);
        match Self::get_u32(exif, Tag::ResolutionUnit) {
            Some(UNIT_NONE) => None,
            Some(UNIT_CENTIMETER) => Some((x * 2.54, y * 2.54)),
            _ => Some((x, y)),
        }
    }

    /// Capture datetime, preferring DateTimeOriginal over DateTime.
    fn get_datetime(exif: &exif::Exif) -> Option<NaiveDateTime> {
        [Tag::DateTimeOriginal, Tag::DateTime]
            .into_iter()
            .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
            .find_map(|f| match &f.value {
                Value::Ascii(parts) => parts.first().and_then(|s| parse_exif_datetime(s)),
                _ => None,
            })
    }
}

fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(u32::from(dt.hour), u32::from(dt.minute), u32::from(dt.second))
}
