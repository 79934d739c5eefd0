//! Per-file ingestion: classification, digest and record assembly.

use futures_util::stream::{self, Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinError;

use crate::config::Config;
use crate::error::{IdentifyError, IdentifyResult};
use crate::mapping;
use crate::reader::FormatChain;
use crate::types::CatalogEntry;

use super::discovery::DiscoveredFile;
use super::hash::ContentHasher;

/// Turns files into catalog entries.
///
/// Cloning is cheap; clones share the readers and hasher. Files are handled
/// independently, so any number may be in flight at once.
#[derive(Clone)]
pub struct Ingestor {
    inner: Arc<Inner>,
    parallel_workers: usize,
}

struct Inner {
    chain: FormatChain,
    hasher: ContentHasher,
}

impl Ingestor {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                chain: FormatChain::new(&config.limits),
                hasher: ContentHasher::new(&config.digest),
            }),
            parallel_workers: config.processing.parallel_workers.max(1),
        }
    }

    /// Process one file on the current thread.
    ///
    /// The format chain runs first so unsupported files are rejected before
    /// they are digested and nothing is produced for them.
    pub fn ingest_blocking(&self, path: &Path, content_path: &str) -> IdentifyResult<CatalogEntry> {
        let start = std::time::Instant::now();
        let identified = self.inner.chain.identify(path)?;
        let info = mapping::technical_info(&identified.reader);
        let reader = identified.reader.kind();
        // The reader, and any handle it holds, is released before digesting.
        drop(identified);

        let file = mapping::file_record(path, &self.inner.hasher)
            .map_err(|e| IdentifyError::io(path, e))?;

        tracing::debug!(
            "Ingested {:?} as {} ({} bytes) in {:?}",
            content_path,
            reader,
            file.size,
            start.elapsed()
        );
        Ok(CatalogEntry {
            file_path: path.to_path_buf(),
            content_path: content_path.to_string(),
            reader,
            file,
            info,
        })
    }

    /// Process one file on the blocking thread pool.
    pub async fn ingest(&self, file: DiscoveredFile) -> IdentifyResult<CatalogEntry> {
        let this = self.clone();
        let path = file.path.clone();
        tokio::task::spawn_blocking(move || this.ingest_blocking(&file.path, &file.content_path))
            .await
            .unwrap_or_else(|e| Err(join_failure(path, e)))
    }

    /// Process many files with bounded parallelism.
    ///
    /// Results arrive in completion order, one per input file.
    pub fn ingest_all(
        &self,
        files: Vec<DiscoveredFile>,
    ) -> impl Stream<Item = IdentifyResult<CatalogEntry>> + '_ {
        stream::iter(files)
            .map(move |file| self.ingest(file))
            .buffer_unordered(self.parallel_workers)
    }
}

/// A decoder that panics has rejected the content; the file itself was readable.
fn join_failure(path: PathBuf, err: JoinError) -> IdentifyError {
    let reason = if err.is_panic() {
        "decoder panicked"
    } else {
        "ingestion cancelled"
    };
    tracing::warn!("{:?}: {reason}", path);
    IdentifyError::Unsupported {
        path,
        last_error: reason.to_string(),
    }
}
