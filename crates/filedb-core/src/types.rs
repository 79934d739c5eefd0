//! Output types of the ingestion pipeline.

use serde::Serialize;
use std::path::PathBuf;

use crate::catalog::CatalogRecord;
use crate::model::{FileRecord, ObjectId, TechnicalInfo};
use crate::reader::ReaderKind;

/// Everything learned about one file on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Location on the local filesystem
    pub file_path: PathBuf,

    /// Path inside the storage object
    pub content_path: String,

    /// Probe that opened the file
    pub reader: ReaderKind,

    /// The `storage.files` row
    pub file: FileRecord,

    /// The technical record
    pub info: TechnicalInfo,
}

impl CatalogEntry {
    /// The record to register this occurrence under `object`.
    pub fn to_record(&self, object: ObjectId) -> CatalogRecord {
        CatalogRecord {
            file: self.file.clone(),
            info: Some(self.info.clone()),
            object,
            content_path: self.content_path.clone(),
        }
    }
}

/// Counters for a scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Files digested and classified
    pub succeeded: usize,

    /// Files no reader could open
    pub unsupported: usize,

    /// Files that could not be read
    pub unreadable: usize,

    /// Bytes digested
    pub bytes: u64,

    /// Distinct contents after dedup
    pub distinct_files: usize,

    /// Occurrences registered
    pub paths: usize,

    /// Processing rate in files per second
    pub files_per_second: f64,

    /// Total processing time in seconds
    pub total_seconds: f64,
}

impl ScanStats {
    pub fn failed(&self) -> usize {
        self.unsupported + self.unreadable
    }

    /// Fill in the rate fields from the elapsed time.
    pub fn finish(&mut self, elapsed: std::time::Duration) {
        self.total_seconds = elapsed.as_secs_f64();
        self.files_per_second = if self.total_seconds > 0.0 {
            self.succeeded as f64 / self.total_seconds
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentDigest, PdfFileInfo};
    use std::time::Duration;

    fn sample_entry() -> CatalogEntry {
        CatalogEntry {
            file_path: PathBuf::from("/srv/Archive0/W22084/eBooks/W22084.pdf"),
            content_path: "eBooks/W22084.pdf".to_string(),
            reader: ReaderKind::Pdf,
            file: FileRecord::new(ContentDigest::from_bytes([7; 32]), 2048),
            info: TechnicalInfo::Pdf(PdfFileInfo {
                number_of_pages: 5,
                median_nb_chr_per_page: Some(1402.5),
                median_nb_images_per_page: Some(0.0),
                recorded_date: None,
            }),
        }
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_string(&sample_entry()).unwrap();
        assert!(json.contains("\"reader\":\"pdf\""));
        assert!(json.contains("\"kind\":\"pdf\""));
        assert!(json.contains("\"median_nb_chr_per_page\":1402.5"));
        assert!(json.contains("\"content_path\":\"eBooks/W22084.pdf\""));
    }

    #[test]
    fn test_entry_to_record() {
        let entry = sample_entry();
        let record = entry.to_record(ObjectId(3));
        assert_eq!(record.object, ObjectId(3));
        assert_eq!(record.file, entry.file);
        assert_eq!(record.info.as_ref(), Some(&entry.info));
        assert_eq!(record.content_path, "eBooks/W22084.pdf");
    }

    #[test]
    fn test_stats_rate() {
        let mut stats = ScanStats {
            succeeded: 10,
            unsupported: 2,
            unreadable: 1,
            ..Default::default()
        };
        stats.finish(Duration::from_secs(2));
        assert_eq!(stats.failed(), 3);
        assert!((stats.files_per_second - 5.0).abs() < 1e-9);
    }
}
