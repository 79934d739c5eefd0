//! JPEG 2000 (JP2) header boxes.
//!
//! The raster decoder does not handle JPEG 2000, but everything the catalog
//! records about a JP2 file lives in the `jp2h` header box.

use crate::model::ImageMode;

/// Contents of the `ihdr` and `res ` boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jp2Header {
    pub width: u32,
    pub height: u32,
    pub components: u16,
    /// Bits per component, `None` when components differ
    pub bits: Option<u8>,
    /// Capture (or display) resolution in dots per inch
    pub dpi: Option<(f64, f64)>,
}

impl Jp2Header {
    pub fn image_mode(&self) -> ImageMode {
        match (self.components, self.bits) {
            (1, Some(1)) => ImageMode::Bilevel,
            (1, Some(8)) => ImageMode::L,
            (3, Some(8)) => ImageMode::Rgb,
            (4, Some(8)) => ImageMode::Rgba,
            _ => ImageMode::Other,
        }
    }
}

struct Jp2Box<'a> {
    kind: [u8; 4],
    body: &'a [u8],
}

/// Iterate the boxes contained in `data`, stopping at the first malformed one.
fn boxes(mut data: &[u8]) -> impl Iterator<Item = Jp2Box<'_>> {
    std::iter::from_fn(move || {
        let header = data.get(..8)?;
        let kind = [header[4], header[5], header[6], header[7]];
        let (header_len, total_len) = match u32::from_be_bytes([header[0], header[1], header[2], header[3]]) {
            0 => (8, data.len()),
            1 => {
                let ext = data.get(8..16)?;
                let len = u64::from_be_bytes(ext.try_into().ok()?);
                (16, usize::try_from(len).ok()?)
            }
            len => (8, len as usize),
        };
        // Truncated boxes are clamped so a header read from the file prefix still parses.
        let end = total_len.clamp(header_len, data.len().max(header_len));
        let body = data.get(header_len..end.min(data.len()))?;
        data = data.get(end..).unwrap_or_default();
        Some(Jp2Box { kind, body })
    })
}

/// Parse the JP2 header from the leading bytes of a file.
///
/// Returns `None` when the `jp2h`/`ihdr` boxes are missing or malformed.
pub fn parse_header(data: &[u8]) -> Option<Jp2Header> {
    let jp2h = boxes(data).find(|b| &b.kind == b"jp2h")?;
    let mut header = None;
    let mut capture = None;
    let mut display = None;
    for child in boxes(jp2h.body) {
        match &child.kind {
            b"ihdr" => header = parse_ihdr(child.body),
            b"res " => {
                for res in boxes(child.body) {
                    match &res.kind {
                        b"resc" => capture = parse_resolution(res.body),
                        b"resd" => display = parse_resolution(res.body),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    header.map(|h| Jp2Header {
        dpi: capture.or(display),
        ..h
    })
}

fn parse_ihdr(body: &[u8]) -> Option<Jp2Header> {
    let b = body.get(..14)?;
    let height = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
    let width = u32::from_be_bytes([b[4], b[5], b[6], b[7]]);
    let components = u16::from_be_bytes([b[8], b[9]]);
    let bits = (b[10] != 0xFF).then(|| (b[10] & 0x7F) + 1);
    Some(Jp2Header {
        width,
        height,
        components,
        bits,
        dpi: None,
    })
}

/// Grid points per metre, as `num / den * 10^exp`, converted to dpi.
fn parse_resolution(body: &[u8]) -> Option<(f64, f64)> {
    let b = body.get(..10)?;
    let component = |num: [u8; 2], den: [u8; 2], exp: u8| -> Option<f64> {
        let den = u16::from_be_bytes(den);
        (den != 0).then(|| {
            f64::from(u16::from_be_bytes(num)) / f64::from(den) * 10f64.powi(i32::from(exp as i8)) * 0.0254
        })
    };
    let vertical = component([b[0], b[1]], [b[2], b[3]], b[8])?;
    let horizontal = component([b[4], b[5]], [b[6], b[7]], b[9])?;
    Some((horizontal, vertical))
}
