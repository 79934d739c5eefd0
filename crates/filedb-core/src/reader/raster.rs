//! Raster image probe: JPEG, PNG, single-image TIFF and JPEG 2000.
//!
//! Only headers are read. Pixel data is never decoded.

use chrono::NaiveDateTime;
use image::{ExtendedColorType, ImageDecoder, ImageError, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use super::jp2;
use super::sniff::{ContainerHints, Signature, HEADER_LEN};
use super::{ImageMetadata, ProbeError, ProbeResult};
use crate::model::{ImageMode, ImageType, TiffCompression};
use crate::pipeline::metadata::{ExifSummary, MetadataExtractor};

/// TIFF PhotometricInterpretation for palette images.
const PHOTOMETRIC_PALETTE: u32 = 3;

/// An opened raster image.
#[derive(Debug, Clone)]
pub struct RasterReader {
    path: PathBuf,
    image_type: ImageType,
    mode: ImageMode,
    width: u32,
    height: u32,
    compression: Option<TiffCompression>,
    resolution: Option<(f64, f64)>,
    recorded_date: Option<NaiveDateTime>,
}

impl RasterReader {
    /// Open `path` as a raster image.
    ///
    /// Files that are not one of the supported containers, or whose header
    /// the decoder rejects, are a mismatch.
    pub fn open(path: &Path) -> ProbeResult<Self> {
        let mut file = File::open(path)?;
        let mut header = Vec::new();
        (&mut file).take(HEADER_LEN).read_to_end(&mut header)?;
        file.rewind()?;

        let signature = Signature::detect(&header);
        if signature == Signature::Jp2 {
            return Self::from_jp2(path, &header);
        }
        let hints = ContainerHints::from_header(signature, &header);

        let mut reader = BufReader::new(file);
        let (image_type, width, height, decoded_mode) = probe_container(&mut reader)?;
        reader.rewind()?;
        let exif = MetadataExtractor::extract(&mut reader)?.unwrap_or_default();

        let mode = refine_mode(decoded_mode, &hints, &exif);
        let compression = match image_type {
            // Absent tag means uncompressed.
            ImageType::SingleImageTiff => Some(exif.compression.unwrap_or(TiffCompression::Raw)),
            _ => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            image_type,
            mode,
            width,
            height,
            compression,
            resolution: hints.dpi.or(exif.resolution),
            recorded_date: exif.recorded_date,
        })
    }

    fn from_jp2(path: &Path, header: &[u8]) -> ProbeResult<Self> {
        let jp2 = jp2::parse_header(header)
            .ok_or_else(|| ProbeError::mismatch("malformed JPEG 2000 header"))?;
        Ok(Self {
            path: path.to_path_buf(),
            image_type: ImageType::Jp2,
            mode: jp2.image_mode(),
            width: jp2.width,
            height: jp2.height,
            compression: None,
            resolution: jp2.dpi,
            recorded_date: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Identify the container and read dimensions and colour type from its header.
fn probe_container<R: BufRead + Seek>(reader: R) -> ProbeResult<(ImageType, u32, u32, ImageMode)> {
    let mut guessed = ImageReader::new(reader).with_guessed_format()?;
    guessed.no_limits();

    let image_type = match guessed.format() {
        Some(ImageFormat::Jpeg) => ImageType::Jpg,
        Some(ImageFormat::Png) => ImageType::Png,
        Some(ImageFormat::Tiff) => ImageType::SingleImageTiff,
        Some(other) => {
            return Err(ProbeError::mismatch(format!(
                "unsupported image container {other:?}"
            )))
        }
        None => return Err(ProbeError::mismatch("unrecognized image container")),
    };

    let decoder = guessed.into_decoder().map_err(classify)?;
    let (width, height) = decoder.dimensions();
    Ok((image_type, width, height, mode_from_color(decoder.original_color_type())))
}

fn classify(err: ImageError) -> ProbeError {
    match err {
        ImageError::IoError(e) => ProbeError::Io(e),
        other => ProbeError::Mismatch(other.to_string()),
    }
}

fn mode_from_color(color: ExtendedColorType) -> ImageMode {
    match color {
        ExtendedColorType::L1 => ImageMode::Bilevel,
        ExtendedColorType::L8 => ImageMode::L,
        ExtendedColorType::Rgb8 | ExtendedColorType::Rgb16 => ImageMode::Rgb,
        ExtendedColorType::Rgba8 | ExtendedColorType::Rgba16 => ImageMode::Rgba,
        ExtendedColorType::Cmyk8 => ImageMode::Cmyk,
        _ => ImageMode::Other,
    }
}

/// Palette and bilevel storage are expanded by the decoder, so the
/// container's own description wins.
fn refine_mode(decoded: ImageMode, hints: &ContainerHints, exif: &ExifSummary) -> ImageMode {
    if hints.palette || exif.photometric == Some(PHOTOMETRIC_PALETTE) {
        return ImageMode::P;
    }
    if exif.bits_per_sample == Some(1) && exif.samples_per_pixel.unwrap_or(1) == 1 {
        return ImageMode::Bilevel;
    }
    decoded
}

impl ImageMetadata for RasterReader {
    fn format(&self) -> ImageType {
        self.image_type
    }

    fn color_mode(&self) -> ImageMode {
        self.mode
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn compression(&self) -> Option<TiffCompression> {
        self.compression
    }

    // Encoders do not record their quality setting in the container.
    fn quality(&self) -> Option<u8> {
        None
    }

    fn sampling_resolution(&self) -> Option<(f64, f64)> {
        self.resolution
    }

    fn recorded_date(&self) -> Option<NaiveDateTime> {
        self.recorded_date
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::codecs::jpeg::{JpegEncoder, PixelDensity};
    use tiff::encoder::{colortype, compression::Lzw, Rational, TiffEncoder};
    use tiff::tags::ResolutionUnit;

    /// A 16-bit grayscale, LZW compressed scan at the given resolution.
    pub(crate) fn write_gray16_tiff(path: &Path, width: u32, height: u32, dpi: u32) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let mut image = encoder
            .new_image_with_compression::<colortype::Gray16, _>(width, height, Lzw)
            .unwrap();
        image.resolution(ResolutionUnit::Inch, Rational { n: dpi, d: 1 });
        let data = vec![0u16; (width * height) as usize];
        image.write_data(&data).unwrap();
    }

    #[test]
    fn test_lzw_tiff_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("I08860001.tif");
        write_gray16_tiff(&path, 6200, 653, 600);

        let reader = RasterReader::open(&path).unwrap();
        assert_eq!(reader.format(), ImageType::SingleImageTiff);
        assert_eq!((reader.width(), reader.height()), (6200, 653));
        assert_eq!(reader.compression(), Some(TiffCompression::TiffLzw));
        assert_eq!(reader.sampling_resolution(), Some((600.0, 600.0)));
        assert_eq!(reader.color_mode(), ImageMode::Other);
        assert_eq!(reader.quality(), None);
        assert_eq!(reader.recorded_date(), None);
    }

    #[test]
    fn test_jpeg_density_from_jfif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("I0001.jpg");
        {
            let mut file = File::create(&path).unwrap();
            let mut encoder = JpegEncoder::new_with_quality(&mut file, 85);
            encoder.set_pixel_density(PixelDensity::dpi(300));
            encoder.encode_image(&image::RgbImage::new(32, 16)).unwrap();
        }

        let reader = RasterReader::open(&path).unwrap();
        assert_eq!(reader.format(), ImageType::Jpg);
        assert_eq!(reader.color_mode(), ImageMode::Rgb);
        assert_eq!((reader.width(), reader.height()), (32, 16));
        assert_eq!(reader.compression(), None);
        assert_eq!(reader.sampling_resolution(), Some((300.0, 300.0)));
    }

    #[test]
    fn test_grayscale_png_without_density() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        image::GrayImage::new(5, 7).save(&path).unwrap();

        let reader = RasterReader::open(&path).unwrap();
        assert_eq!(reader.format(), ImageType::Png);
        assert_eq!(reader.color_mode(), ImageMode::L);
        assert_eq!(reader.sampling_resolution(), None);
        assert_eq!(reader.compression(), None);
    }

    #[test]
    fn test_jp2_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("I0001.jp2");
        std::fs::write(&path, jp2::tests::sample_jp2(2550, 3300, 3)).unwrap();

        let reader = RasterReader::open(&path).unwrap();
        assert_eq!(reader.format(), ImageType::Jp2);
        assert_eq!(reader.color_mode(), ImageMode::Rgb);
        assert_eq!((reader.width(), reader.height()), (2550, 3300));
        let (x, _) = reader.sampling_resolution().unwrap();
        assert_eq!(x.round(), 300.0);
    }

    #[test]
    fn test_unknown_container_is_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not an image").unwrap();
        assert!(matches!(RasterReader::open(&path), Err(ProbeError::Mismatch(_))));
    }

    #[test]
    fn test_unsupported_raster_is_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.bmp");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        assert!(matches!(RasterReader::open(&path), Err(ProbeError::Mismatch(_))));
    }

    #[test]
    fn test_missing_file_is_io() {
        let result = RasterReader::open(Path::new("/nonexistent/I0001.tif"));
        assert!(matches!(result, Err(ProbeError::Io(_))));
    }

    #[test]
    fn test_refine_mode() {
        let palette = ContainerHints {
            dpi: None,
            palette: true,
        };
        let exif = ExifSummary::default();
        assert_eq!(refine_mode(ImageMode::Rgb, &palette, &exif), ImageMode::P);

        let bilevel = ExifSummary {
            bits_per_sample: Some(1),
            samples_per_pixel: Some(1),
            ..Default::default()
        };
        assert_eq!(
            refine_mode(ImageMode::L, &ContainerHints::default(), &bilevel),
            ImageMode::Bilevel
        );
        assert_eq!(
            refine_mode(ImageMode::Rgb, &ContainerHints::default(), &exif),
            ImageMode::Rgb
        );
    }
}
