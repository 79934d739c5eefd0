//! Ingestion pipeline components.
//!
//! - **discovery**: find files under a storage object directory
//! - **hash**: streaming content digest
//! - **metadata**: EXIF/TIFF tags embedded in image containers
//! - **processor**: classify, digest and assemble records per file

pub mod discovery;
pub mod hash;
pub mod metadata;
pub mod processor;

pub use discovery::{DiscoveredFile, FileDiscovery};
pub use hash::{ContentHasher, DigestOutput};
pub use metadata::{ExifSummary, MetadataExtractor};
pub use processor::Ingestor;
