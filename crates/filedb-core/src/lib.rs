//! filedb core - content identity and technical metadata for archive files.
//!
//! Every file in a storage tree is classified by content, digested, and
//! described by one typed technical record:
//!
//! ```text
//! path → format chain (raster → raw → PDF) → metadata → mapping → catalog
//!      ↘ SHA-256 digest ─────────────────────────────↗
//! ```
//!
//! Identical content found at many paths collapses onto a single file row in
//! the [`Catalog`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use filedb_core::{Config, FormatChain, mapping};
//!
//! let config = Config::load()?;
//! let identified = FormatChain::new(&config.limits).identify(path)?;
//! let info = mapping::technical_info(&identified.reader);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod mapping;
pub mod math;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod reader;
pub mod types;

pub use catalog::{Catalog, CatalogRecord, CommitSummary, RecordBatcher, RecordSink};
pub use config::Config;
pub use error::{CatalogError, ConfigError, FiledbError, IdentifyError, IdentifyResult, Result};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{ContentHasher, DiscoveredFile, FileDiscovery, Ingestor};
pub use reader::{FormatChain, FormatReader, ReaderKind};
pub use types::{CatalogEntry, ScanStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
