//! Streaming content digest for file identity.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::config::DigestConfig;
use crate::model::ContentDigest;

/// Digest of a stream together with the number of bytes it covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOutput {
    pub digest: ContentDigest,
    pub bytes: u64,
}

/// Computes SHA-256 content digests with bounded memory.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    buffer_size: usize,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(&DigestConfig::default())
    }
}

impl ContentHasher {
    /// Create a hasher reading in chunks of `config.buffer_size` bytes.
    pub fn new(config: &DigestConfig) -> Self {
        Self {
            buffer_size: config.buffer_size.max(1),
        }
    }

    /// Digest everything a reader yields until EOF.
    ///
    /// The result depends only on the bytes, not on how the reader chunks them.
    pub fn digest_reader<R: Read>(&self, mut reader: R) -> io::Result<DigestOutput> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut bytes = 0u64;
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..read]);
            bytes += read as u64;
        }
        Ok(DigestOutput {
            digest: ContentDigest::from_bytes(hasher.finalize().into()),
            bytes,
        })
    }

    /// Digest a file on disk.
    ///
    /// Fails with `UnexpectedEof` when fewer bytes were read than the file
    /// reported at open time, and `InvalidData` when it grew while being read.
    pub fn digest_file(&self, path: &Path) -> io::Result<DigestOutput> {
        let file = File::open(path)?;
        let expected = file.metadata()?.len();
        let output = self.digest_reader(BufReader::with_capacity(self.buffer_size, file))?;
        match output.bytes.cmp(&expected) {
            std::cmp::Ordering::Equal => Ok(output),
            std::cmp::Ordering::Less => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read {} of {} bytes", output.bytes, expected),
            )),
            std::cmp::Ordering::Greater => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file grew from {} to {} bytes while hashing", expected, output.bytes),
            )),
        }
    }

    /// Digest an in-memory buffer.
    pub fn digest_bytes(data: &[u8]) -> ContentDigest {
        ContentDigest::from_bytes(Sha256::digest(data).into())
    }
}
