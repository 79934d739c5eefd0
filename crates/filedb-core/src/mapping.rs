//! Translation from digests and opened readers to catalog rows.
//!
//! Nothing here touches the catalog: the functions only build the
//! `storage.files` row and the single technical record a file gets.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::model::{FileRecord, ImageFileInfo, PdfFileInfo, TechnicalInfo};
use crate::pipeline::hash::ContentHasher;
use crate::reader::{FormatReader, ImageMetadata, PdfReader};

/// The technical record for an opened reader.
pub fn technical_info(reader: &FormatReader) -> TechnicalInfo {
    match reader {
        FormatReader::Image(r) => TechnicalInfo::Image(image_file_info(r)),
        FormatReader::Raw(r) => TechnicalInfo::Image(image_file_info(r)),
        FormatReader::Pdf(r) => TechnicalInfo::Pdf(pdf_file_info(r)),
    }
}

/// `bps_x`/`bps_y` receive the sampling resolution, rounded.
pub fn image_file_info<M: ImageMetadata + ?Sized>(meta: &M) -> ImageFileInfo {
    let (bps_x, bps_y) = match meta.sampling_resolution() {
        Some((x, y)) => (to_u32(x), to_u32(y)),
        None => (None, None),
    };
    ImageFileInfo {
        image_type: meta.format(),
        image_mode: meta.color_mode(),
        width: meta.width(),
        height: meta.height(),
        tiff_compression: meta.compression(),
        quality: meta.quality(),
        bps_x,
        bps_y,
        recorded_date: meta.recorded_date(),
    }
}

/// Computes the page statistics if the reader has not yet.
///
/// The recorded date is the creation time as written in the document, in its
/// own offset.
pub fn pdf_file_info(reader: &PdfReader) -> PdfFileInfo {
    PdfFileInfo {
        number_of_pages: reader.page_count(),
        median_nb_chr_per_page: reader.median_chars_per_page(),
        median_nb_images_per_page: reader.median_images_per_page(),
        recorded_date: reader.creation_date().map(|d| d.naive_local()),
    }
}

/// Digest `path` and build its `storage.files` row.
///
/// The size is the number of bytes digested. Creation time falls back to the
/// modification time on filesystems that do not record it.
pub fn file_record(path: &Path, hasher: &ContentHasher) -> io::Result<FileRecord> {
    let output = hasher.digest_file(path)?;
    let metadata = std::fs::metadata(path)?;
    let modified = metadata.modified().ok().map(to_naive_utc);
    let created = metadata.created().ok().map(to_naive_utc).or(modified);

    let mut record = FileRecord::new(output.digest, output.bytes);
    record.created_at = created;
    record.earliest_mdate = modified;
    Ok(record)
}

fn to_naive_utc(time: SystemTime) -> NaiveDateTime {
    DateTime::<Utc>::from(time).naive_utc()
}

fn to_u32(value: f64) -> Option<u32> {
    let rounded = value.round();
    (rounded.is_finite() && rounded >= 0.0 && rounded <= f64::from(u32::MAX)).then_some(rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::model::{ImageMode, ImageType, TiffCompression, Validity};
    use crate::reader::{FormatChain, RawReader};
    use chrono::NaiveDate;

    #[test]
    fn test_identical_content_shares_identity() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("images/W1-I1/I0001.tif");
        let b = dir.path().join("backup/I0001.tif");
        std::fs::create_dir_all(a.parent().unwrap()).unwrap();
        std::fs::create_dir_all(b.parent().unwrap()).unwrap();
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let hasher = ContentHasher::default();
        let first = file_record(&a, &hasher).unwrap();
        let second = file_record(&b, &hasher).unwrap();
        assert_eq!(first.content_key(), second.content_key());
        assert_eq!(first.size, 10);
        assert_eq!(first.persistent_id, first.digest);
        assert_eq!(first.validity, Validity::NotSet);
        assert!(first.created_at.is_some());
        assert!(first.earliest_mdate.is_some());
    }

    #[test]
    fn test_different_content_differs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"other").unwrap();

        let hasher = ContentHasher::default();
        assert_ne!(
            file_record(&a, &hasher).unwrap().digest,
            file_record(&b, &hasher).unwrap().digest
        );
    }

    #[test]
    fn test_file_record_missing_file() {
        let err = file_record(Path::new("/nonexistent/a.tif"), &ContentHasher::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_tiff_scan_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("I08860001.tif");
        crate::reader::raster::tests::write_gray16_tiff(&path, 6200, 653, 600);

        let identified = FormatChain::new(&LimitsConfig::default()).identify(&path).unwrap();
        let info = technical_info(&identified.reader);
        let image = info.as_image().unwrap();
        assert_eq!(image.image_type, ImageType::SingleImageTiff);
        assert_eq!((image.width, image.height), (6200, 653));
        assert_eq!(image.tiff_compression, Some(TiffCompression::TiffLzw));
        assert_eq!((image.bps_x, image.bps_y), (Some(600), Some(600)));
        assert_eq!(image.quality, None);
    }

    #[test]
    fn test_raw_info_uses_sensor_dimensions() {
        let reader = FormatReader::Raw(RawReader::from_dimensions(Path::new("DSC0001.ARW"), 7968, 5320));
        let info = technical_info(&reader);
        let image = info.as_image().unwrap();
        assert_eq!(image.image_type, ImageType::Raw);
        assert_eq!(image.image_mode, ImageMode::Rgb);
        assert_eq!(image.tiff_compression, Some(TiffCompression::Raw));
        assert_eq!((image.bps_x, image.bps_y), (Some(7968), Some(5320)));
        assert_eq!(image.recorded_date, None);
    }

    #[test]
    fn test_pdf_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("W22084.pdf");
        crate::reader::pdf::tests::write_pdf(&path, 5, "D:20240929101500+02'00'");

        let identified = FormatChain::new(&LimitsConfig::default()).identify(&path).unwrap();
        let info = technical_info(&identified.reader);
        let pdf = info.as_pdf().unwrap();
        assert_eq!(pdf.number_of_pages, 5);
        assert_eq!(
            pdf.recorded_date.map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 9, 29)
        );
        assert_eq!(pdf.median_nb_images_per_page, Some(0.0));
    }

    #[test]
    fn test_pdf_recorded_date_keeps_document_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("W22084.pdf");
        crate::reader::pdf::tests::write_pdf(&path, 1, "D:20240929003000+02'00'");

        let identified = FormatChain::new(&LimitsConfig::default()).identify(&path).unwrap();
        let pdf = pdf_file_info(match &identified.reader {
            FormatReader::Pdf(r) => r,
            other => panic!("unexpected reader: {other:?}"),
        });
        let expected = NaiveDate::from_ymd_opt(2024, 9, 29)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap();
        assert_eq!(pdf.recorded_date, Some(expected));
    }

    #[test]
    fn test_to_u32() {
        assert_eq!(to_u32(299.6), Some(300));
        assert_eq!(to_u32(-1.0), None);
        assert_eq!(to_u32(f64::NAN), None);
    }
}
