//! PDF probe with per-page statistics.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::cell::OnceCell;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use super::sniff;
use super::{ProbeError, ProbeResult};
use crate::math::median;

/// Readers accept the header anywhere in the first kilobyte.
const PDF_HEADER_WINDOW: u64 = 1024;

/// Per-page counts a PDF reader computes its statistics from.
pub trait PageSource {
    /// Extracted text characters on each page, in page order.
    fn char_counts(&self) -> Vec<u64>;

    /// Embedded image objects on each page, in page order.
    fn image_counts(&self) -> Vec<u64>;
}

/// Page counts read from a parsed document.
struct DocumentPages {
    document: Document,
}

impl DocumentPages {
    fn page_ids(&self) -> impl Iterator<Item = (u32, ObjectId)> + '_ {
        self.document.get_pages().into_iter()
    }
}

impl PageSource for DocumentPages {
    fn char_counts(&self) -> Vec<u64> {
        self.page_ids()
            .map(|(number, _)| match self.document.extract_text(&[number]) {
                Ok(text) => page_char_count(&text),
                Err(e) => {
                    tracing::warn!("Cannot extract text from page {number}: {e}");
                    0
                }
            })
            .collect()
    }

    fn image_counts(&self) -> Vec<u64> {
        self.page_ids()
            .map(|(number, id)| match self.document.get_page_images(id) {
                Ok(images) => images.len() as u64,
                Err(e) => {
                    tracing::warn!("Cannot list images on page {number}: {e}");
                    0
                }
            })
            .collect()
    }
}

/// Characters of a page's extracted text, line breaks included.
fn page_char_count(text: &str) -> u64 {
    text.chars().count() as u64
}

/// An opened PDF document.
///
/// The page statistics are computed on first access and kept for the life of
/// the reader.
pub struct PdfReader {
    path: PathBuf,
    page_count: u32,
    creation_date: Option<DateTime<FixedOffset>>,
    modification_date: Option<DateTime<FixedOffset>>,
    pages: Box<dyn PageSource + Send>,
    chars_per_page: OnceCell<Option<f64>>,
    images_per_page: OnceCell<Option<f64>>,
}

impl PdfReader {
    /// Open `path` as a PDF document.
    pub fn open(path: &Path, max_bytes: u64) -> ProbeResult<Self> {
        let mut file = File::open(path)?;
        let mut header = Vec::new();
        (&mut file).take(PDF_HEADER_WINDOW).read_to_end(&mut header)?;
        if sniff::find(&header, b"%PDF-").is_none() {
            return Err(ProbeError::mismatch("missing PDF header"));
        }

        let len = file.metadata()?.len();
        if len > max_bytes {
            return Err(ProbeError::mismatch(format!(
                "file of {len} bytes exceeds the PDF probe limit"
            )));
        }
        file.rewind()?;
        let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
        file.read_to_end(&mut bytes)?;

        let document = Document::load_mem(&bytes)
            .map_err(|e| ProbeError::mismatch(format!("cannot parse PDF: {e}")))?;
        Ok(Self::from_document(path, document))
    }

    /// Wrap an already parsed document.
    pub fn from_document(path: &Path, document: Document) -> Self {
        let page_count = document.get_pages().len() as u32;
        let creation_date = info_date(&document, b"CreationDate");
        let modification_date = info_date(&document, b"ModDate");
        Self::with_pages(
            path,
            page_count,
            creation_date,
            modification_date,
            Box::new(DocumentPages { document }),
        )
    }

    pub fn with_pages(
        path: &Path,
        page_count: u32,
        creation_date: Option<DateTime<FixedOffset>>,
        modification_date: Option<DateTime<FixedOffset>>,
        pages: Box<dyn PageSource + Send>,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            page_count,
            creation_date,
            modification_date,
            pages,
            chars_per_page: OnceCell::new(),
            images_per_page: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn creation_date(&self) -> Option<DateTime<FixedOffset>> {
        self.creation_date
    }

    pub fn modification_date(&self) -> Option<DateTime<FixedOffset>> {
        self.modification_date
    }

    /// Median of extracted characters per page, `None` without pages.
    pub fn median_chars_per_page(&self) -> Option<f64> {
        *self
            .chars_per_page
            .get_or_init(|| median(&self.pages.char_counts()))
    }

    /// Median of embedded images per page, `None` without pages.
    pub fn median_images_per_page(&self) -> Option<f64> {
        *self
            .images_per_page
            .get_or_init(|| median(&self.pages.image_counts()))
    }
}

impl fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfReader")
            .field("path", &self.path)
            .field("page_count", &self.page_count)
            .field("creation_date", &self.creation_date)
            .field("modification_date", &self.modification_date)
            .finish_non_exhaustive()
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    let info = resolve(document, document.trailer.get(b"Info").ok()?)?;
    info.as_dict().ok()
}

fn info_date(document: &Document, key: &[u8]) -> Option<DateTime<FixedOffset>> {
    let value = resolve(document, info_dictionary(document)?.get(key).ok()?)?;
    match value {
        Object::String(bytes, _) => parse_pdf_date(&decode_text_string(bytes)),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, else single-byte.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units = rest.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        _ => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parse a PDF date (`D:YYYYMMDDHHmmSSOHH'mm'`).
///
/// Everything after the year is optional. A missing offset is taken as UTC.
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, zone) = s.split_at(digits_end);

    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let field = |start: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + 2) {
            Some(v) => v.parse().ok(),
            None => Some(default),
        }
    };
    let date = NaiveDate::from_ymd_opt(year, field(4, 1)?, field(6, 1)?)?
        .and_hms_opt(field(8, 0)?, field(10, 0)?, field(12, 0)?)?;
    parse_offset(zone)?.from_local_datetime(&date).single()
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let mut chars = zone.chars();
    let sign = match chars.next() {
        None | Some('Z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let digits: String = chars.filter(char::is_ascii_digit).collect();
    let hours: i32 = digits.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minutes: i32 = digits.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
