//! Magic-byte classification and container-level hints read from file headers.

/// How many leading bytes the probes look at.
pub(crate) const HEADER_LEN: u64 = 64 * 1024;

/// PDF readers accept the header anywhere in the first kilobyte.
const PDF_HEADER_WINDOW: usize = 1024;

const JP2_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, b'j', b'P', b' ', b' ', 0x0D, 0x0A, 0x87, 0x0A,
];

/// Container family recognised from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Jpeg,
    Png,
    Tiff,
    Jp2,
    Pdf,
    Unknown,
}

impl Signature {
    pub fn detect(header: &[u8]) -> Self {
        match header {
            [0xFF, 0xD8, 0xFF, ..] => Self::Jpeg,
            [0x89, b'P', b'N', b'G', ..] => Self::Png,
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Self::Tiff,
            h if h.starts_with(&JP2_SIGNATURE) => Self::Jp2,
            h if find(&h[..h.len().min(PDF_HEADER_WINDOW)], b"%PDF-").is_some() => Self::Pdf,
            _ => Self::Unknown,
        }
    }
}

/// Hints a container states in its header, independent of the pixel decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerHints {
    /// Resolution in dots per inch
    pub dpi: Option<(f64, f64)>,
    /// Pixels are palette indices
    pub palette: bool,
}

impl ContainerHints {
    pub fn from_header(signature: Signature, header: &[u8]) -> Self {
        match signature {
            Signature::Jpeg => Self {
                dpi: jfif_density(header),
                palette: false,
            },
            Signature::Png => png_hints(header),
            _ => Self::default(),
        }
    }
}

/// Density from a JFIF APP0 segment at the start of a JPEG stream.
fn jfif_density(header: &[u8]) -> Option<(f64, f64)> {
    // FF D8 | FF E0 len(2) "JFIF\0" version(2) units(1) xdensity(2) ydensity(2)
    let app0 = header.get(2..20)?;
    if app0[0..2] != [0xFF, 0xE0] || &app0[4..9] != b"JFIF\0" {
        return None;
    }
    let x = f64::from(u16::from_be_bytes([app0[12], app0[13]]));
    let y = f64::from(u16::from_be_bytes([app0[14], app0[15]]));
    match app0[11] {
        1 => Some((x, y)),
        2 => Some((x * 2.54, y * 2.54)),
        _ => None,
    }
}

fn png_hints(header: &[u8]) -> ContainerHints {
    let mut hints = ContainerHints::default();
    let mut offset = 8;
    while let Some(chunk_header) = header.get(offset..offset + 8) {
        let len = u32::from_be_bytes([chunk_header[0], chunk_header[1], chunk_header[2], chunk_header[3]]) as usize;
        let kind = &chunk_header[4..8];
        let data = header.get(offset + 8..offset + 8 + len);
        match (kind, data) {
            (b"IHDR", Some(ihdr)) if ihdr.len() >= 10 => hints.palette = ihdr[9] == 3,
            (b"pHYs", Some(phys)) if phys.len() >= 9 && phys[8] == 1 => {
                let x = u32::from_be_bytes([phys[0], phys[1], phys[2], phys[3]]);
                let y = u32::from_be_bytes([phys[4], phys[5], phys[6], phys[7]]);
                hints.dpi = Some((f64::from(x) * 0.0254, f64::from(y) * 0.0254));
            }
            (b"IDAT", _) | (b"IEND", _) => break,
            _ => {}
        }
        // chunk header + data + crc
        offset += 12 + len;
    }
    hints
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_jpeg() {
        assert_eq!(Signature::detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Signature::Jpeg);
    }

    #[test]
    fn test_detect_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(Signature::detect(&header), Signature::Png);
    }

    #[test]
    fn test_detect_tiff_both_byte_orders() {
        assert_eq!(Signature::detect(&[b'I', b'I', 0x2A, 0x00]), Signature::Tiff);
        assert_eq!(Signature::detect(&[b'M', b'M', 0x00, 0x2A]), Signature::Tiff);
        assert_eq!(Signature::detect(&[b'I', b'I', 0x00, 0x00]), Signature::Unknown);
    }

    #[test]
    fn test_detect_jp2() {
        let mut header = JP2_SIGNATURE.to_vec();
        header.extend_from_slice(&[0, 0, 0, 0x14, b'f', b't', b'y', b'p']);
        assert_eq!(Signature::detect(&header), Signature::Jp2);
    }

    #[test]
    fn test_detect_pdf_with_leading_garbage() {
        let mut header = b"\x00\x00junk\n".to_vec();
        header.extend_from_slice(b"%PDF-1.7\n");
        assert_eq!(Signature::detect(&header), Signature::Pdf);
    }

    #[test]
    fn test_detect_empty_and_text() {
        assert_eq!(Signature::detect(&[]), Signature::Unknown);
        assert_eq!(Signature::detect(b"plain text"), Signature::Unknown);
    }

    #[test]
    fn test_jfif_density_in_dpi_and_dpcm() {
        let mut header = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        header.extend_from_slice(b"JFIF\0");
        header.extend_from_slice(&[1, 1, 1, 0x01, 0x2C, 0x01, 0x2C, 0, 0]);
        let hints = ContainerHints::from_header(Signature::Jpeg, &header);
        assert_eq!(hints.dpi, Some((300.0, 300.0)));

        header[13] = 2;
        let hints = ContainerHints::from_header(Signature::Jpeg, &header);
        let (x, _) = hints.dpi.unwrap();
        assert!((x - 762.0).abs() < 1e-9);

        header[13] = 0;
        assert_eq!(ContainerHints::from_header(Signature::Jpeg, &header).dpi, None);
    }

    fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut chunk = (data.len() as u32).to_be_bytes().to_vec();
        chunk.extend_from_slice(kind);
        chunk.extend_from_slice(data);
        chunk.extend_from_slice(&[0, 0, 0, 0]);
        chunk
    }

    #[test]
    fn test_png_palette_and_phys() {
        let mut header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        header.extend(png_chunk(b"IHDR", &[0, 0, 0, 4, 0, 0, 0, 4, 8, 3, 0, 0, 0]));
        let mut phys = 2835u32.to_be_bytes().to_vec();
        phys.extend_from_slice(&2835u32.to_be_bytes());
        phys.push(1);
        header.extend(png_chunk(b"pHYs", &phys));
        header.extend(png_chunk(b"IDAT", &[1, 2, 3]));

        let hints = ContainerHints::from_header(Signature::Png, &header);
        assert!(hints.palette);
        let (x, y) = hints.dpi.unwrap();
        assert_eq!(x.round(), 72.0);
        assert_eq!(y.round(), 72.0);
    }

    #[test]
    fn test_truncated_png_header_is_tolerated() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I'];
        assert_eq!(
            ContainerHints::from_header(Signature::Png, &header),
            ContainerHints::default()
        );
    }
}
