//! Bounded batching of complete records in front of a sink.

use super::{Catalog, CatalogRecord, CommitSummary};
use crate::error::CatalogError;

/// Destination of committed batches.
pub trait RecordSink {
    type Error;

    /// Register all records or none of them.
    fn commit(&mut self, records: Vec<CatalogRecord>) -> Result<CommitSummary, Self::Error>;
}

impl RecordSink for Catalog {
    type Error = CatalogError;

    fn commit(&mut self, records: Vec<CatalogRecord>) -> Result<CommitSummary, CatalogError> {
        Catalog::commit(self, records)
    }
}

/// Accumulates records and commits them `batch_size` at a time.
///
/// A record carries the file row together with its technical record, so a
/// commit boundary never separates them.
pub struct RecordBatcher<S: RecordSink> {
    sink: S,
    batch_size: usize,
    pending: Vec<CatalogRecord>,
    totals: CommitSummary,
    batches: usize,
}

impl<S: RecordSink> RecordBatcher<S> {
    pub fn new(sink: S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            totals: CommitSummary::default(),
            batches: 0,
        }
    }

    /// Queue a record, committing the batch once it is full.
    pub fn push(&mut self, record: CatalogRecord) -> Result<(), S::Error> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit whatever is pending. A failed batch is dropped.
    pub fn flush(&mut self) -> Result<(), S::Error> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let size = batch.len();
        let summary = self.sink.commit(batch)?;
        self.totals.merge(summary);
        self.batches += 1;
        tracing::trace!("Flushed batch {} ({size} records)", self.batches);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn totals(&self) -> CommitSummary {
        self.totals
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Flush and hand back the sink with the accumulated counters.
    pub fn finish(mut self) -> Result<(S, CommitSummary), S::Error> {
        self.flush()?;
        Ok((self.sink, self.totals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileRecord, ObjectId, Root, StorageObject};
    use crate::pipeline::hash::ContentHasher;

    #[derive(Default)]
    struct RecordingSink {
        batches: Vec<usize>,
        fail: bool,
    }

    impl RecordSink for RecordingSink {
        type Error = String;

        fn commit(&mut self, records: Vec<CatalogRecord>) -> Result<CommitSummary, String> {
            if self.fail {
                return Err("sink unavailable".to_string());
            }
            self.batches.push(records.len());
            Ok(CommitSummary {
                files_inserted: records.len(),
                ..Default::default()
            })
        }
    }

    fn record(n: u32, object: ObjectId) -> CatalogRecord {
        let data = n.to_be_bytes();
        CatalogRecord {
            file: FileRecord::new(ContentHasher::digest_bytes(&data), data.len() as u64),
            info: None,
            object,
            content_path: format!("images/I{n:04}.tif"),
        }
    }

    #[test]
    fn test_batches_are_bounded() {
        let mut batcher = RecordBatcher::new(RecordingSink::default(), 3);
        for n in 0..7 {
            batcher.push(record(n, ObjectId(1))).unwrap();
        }
        assert_eq!(batcher.pending(), 1);
        let (sink, totals) = batcher.finish().unwrap();
        assert_eq!(sink.batches, vec![3, 3, 1]);
        assert_eq!(totals.files_inserted, 7);
    }

    #[test]
    fn test_flush_on_empty_is_noop() {
        let mut batcher = RecordBatcher::new(RecordingSink::default(), 10);
        batcher.flush().unwrap();
        assert_eq!(batcher.batches(), 0);
        assert!(batcher.sink().batches.is_empty());
    }

    #[test]
    fn test_sink_error_propagates() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut batcher = RecordBatcher::new(sink, 2);
        batcher.push(record(1, ObjectId(1))).unwrap();
        assert_eq!(batcher.push(record(2, ObjectId(1))), Err("sink unavailable".to_string()));
        assert_eq!(batcher.pending(), 0);
    }

    #[test]
    fn test_catalog_sink() {
        let mut catalog = Catalog::new();
        let root = catalog.upsert_root(Root::new("Archive0", "ocfl").unwrap());
        let object = catalog
            .upsert_object(StorageObject::new("W22084", root).unwrap())
            .unwrap();

        let mut batcher = RecordBatcher::new(catalog, 10);
        for n in 0..4 {
            batcher.push(record(n, object)).unwrap();
        }
        batcher.push(record(0, object)).unwrap();
        let (catalog, totals) = batcher.finish().unwrap();
        assert_eq!(catalog.file_count(), 4);
        assert_eq!(catalog.path_count(), 4);
        assert_eq!(totals.files_existing, 1);
    }
}
