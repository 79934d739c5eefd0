//! Relational model of the archive catalog.
//!
//! Two logical namespaces mirror the database schemas:
//! - [`storage`]: files, roots, objects and paths (the identity/dedup graph)
//! - [`content`]: per-format technical metadata foreign-keyed to a file

pub mod content;
pub mod enums;
pub mod storage;

pub use content::{ImageFileInfo, PdfFileInfo, TechnicalInfo};
pub use enums::{ImageMode, ImageType, RootFolder, TiffCompression, Validity};
pub use storage::{image_group_from_path, FileRecord, ObjectPath, Root, StorageObject};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a content digest and of a persistent id.
pub const DIGEST_LEN: usize = 32;

/// Fixed-width content digest (SHA-256), also the shape of a persistent id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hexadecimal rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// A random value of the same width, used for persistent ids on collision.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; DIGEST_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_LEN * 2 {
            return Err(format!("expected {} hex characters", DIGEST_LEN * 2));
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| format!("invalid hex: {e}"))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Primary key of a row in `storage.files`.
    FileId
);
row_id!(
    /// Primary key of a row in `storage.roots`.
    RootId
);
row_id!(
    /// Primary key of a row in `storage.objects`.
    ObjectId
);
row_id!(
    /// Primary key of a row in `storage.paths`.
    PathId
);
