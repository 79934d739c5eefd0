//! The `storage` namespace: deduplicated files and where they occur.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ContentDigest, FileId, ObjectId, RootFolder, RootId, Validity};
use crate::error::CatalogError;

const ROOT_NAME_MAX: usize = 32;
const ROOT_LAYOUT_MAX: usize = 50;
const RID_MAX: usize = 32;
const CONTENT_PATH_MAX_CHARS: usize = 256;

/// A row of `storage.files`: one per distinct content.
///
/// `(digest, size)` identifies the content; `persistent_id` is the archive-wide
/// identifier, equal to the digest unless a collision forced a random one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub digest: ContentDigest,
    pub size: u64,
    pub persistent_id: ContentDigest,
    pub validity: Validity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronom_number: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_mdate: Option<NaiveDateTime>,
}

impl FileRecord {
    /// A new record whose persistent id is provisionally the digest.
    pub fn new(digest: ContentDigest, size: u64) -> Self {
        Self {
            digest,
            size,
            persistent_id: digest,
            validity: Validity::NotSet,
            pronom_number: None,
            created_at: None,
            earliest_mdate: None,
        }
    }

    /// The dedup key.
    pub fn content_key(&self) -> (ContentDigest, u64) {
        (self.digest, self.size)
    }
}

/// A row of `storage.roots`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub name: String,
    pub layout: String,
}

impl Root {
    pub fn new(name: impl Into<String>, layout: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        let layout = layout.into();
        check_ascii("root name", &name, ROOT_NAME_MAX)?;
        check_ascii("root layout", &layout, ROOT_LAYOUT_MAX)?;
        Ok(Self { name, layout })
    }
}

/// A row of `storage.objects`: an archival unit within a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObject {
    pub bdrc_id: String,
    pub root: RootId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_at: Option<NaiveDateTime>,
}

impl StorageObject {
    pub fn new(bdrc_id: impl Into<String>, root: RootId) -> Result<Self, CatalogError> {
        let bdrc_id = bdrc_id.into();
        check_ascii("bdrc_id", &bdrc_id, RID_MAX)?;
        Ok(Self {
            bdrc_id,
            root,
            created_at: None,
            last_modified_at: None,
        })
    }
}

/// A row of `storage.paths`: one occurrence of a file inside an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPath {
    pub file: FileId,
    pub object: ObjectId,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<RootFolder>,
}

impl ObjectPath {
    /// Build a path row, deriving the root folder and image group from the content path.
    pub fn new(file: FileId, object: ObjectId, path: impl Into<String>) -> Result<Self, CatalogError> {
        let path = path.into();
        if path.is_empty() || path.chars().count() > CONTENT_PATH_MAX_CHARS {
            return Err(CatalogError::InvalidField {
                field: "path",
                message: format!("must be 1..={CONTENT_PATH_MAX_CHARS} characters"),
            });
        }
        Ok(Self {
            file,
            object,
            image_group: image_group_from_path(&path),
            root_folder: Some(RootFolder::from_content_path(&path)),
            path,
        })
    }
}

/// Image group RID from a `W…-I…` volume directory in a content path.
///
/// `images/W22084-I0886/I08860001.tif` yields `I0886`.
pub fn image_group_from_path(path: &str) -> Option<String> {
    path.split('/').find_map(|component| {
        let (work, group) = component.rsplit_once('-')?;
        let is_rid = |s: &str, prefix: char| {
            s.starts_with(prefix)
                && s.len() > 1
                && s.len() <= RID_MAX
                && s.chars().all(|c| c.is_ascii_alphanumeric())
        };
        (is_rid(work, 'W') && is_rid(group, 'I')).then(|| group.to_string())
    })
}

fn check_ascii(field: &'static str, value: &str, max: usize) -> Result<(), CatalogError> {
    if value.is_empty() || value.len() > max || !value.is_ascii() {
        return Err(CatalogError::InvalidField {
            field,
            message: format!("must be 1..={max} ASCII characters, got {value:?}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DIGEST_LEN;

    #[test]
    fn test_new_file_record_defaults() {
        let digest = ContentDigest::from_bytes([7; DIGEST_LEN]);
        let file = FileRecord::new(digest, 42);
        assert_eq!(file.persistent_id, digest);
        assert_eq!(file.validity, Validity::NotSet);
        assert!(file.pronom_number.is_none());
        assert_eq!(file.content_key(), (digest, 42));
    }

    #[test]
    fn test_unset_fields_are_skipped_in_json() {
        let file = FileRecord::new(ContentDigest::from_bytes([0; DIGEST_LEN]), 1);
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"validity\":\"not_set\""));
        assert!(!json.contains("pronom_number"));
        assert!(!json.contains("created_at"));
    }

    #[test]
    fn test_root_validation() {
        assert!(Root::new("Archive0", "ocfl-1.1").is_ok());
        assert!(Root::new("", "ocfl").is_err());
        assert!(Root::new("Archivé", "ocfl").is_err());
        assert!(Root::new("a".repeat(33), "ocfl").is_err());
    }

    #[test]
    fn test_object_rid_length() {
        assert!(StorageObject::new("W22084", RootId(1)).is_ok());
        let err = StorageObject::new("W".repeat(40), RootId(1)).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { field: "bdrc_id", .. }));
    }

    #[test]
    fn test_object_path_derives_categories() {
        let path = ObjectPath::new(FileId(1), ObjectId(2), "images/W22084-I0886/I08860001.tif").unwrap();
        assert_eq!(path.root_folder, Some(RootFolder::Images));
        assert_eq!(path.image_group.as_deref(), Some("I0886"));

        let path = ObjectPath::new(FileId(1), ObjectId(2), "sources/scan-notes.pdf").unwrap();
        assert_eq!(path.root_folder, Some(RootFolder::Sources));
        assert_eq!(path.image_group, None);
    }

    #[test]
    fn test_image_group_requires_work_and_group_rids() {
        assert_eq!(image_group_from_path("W1ER169-I1ER1069/a.pdf").as_deref(), Some("I1ER1069"));
        assert_eq!(image_group_from_path("images/foo-bar/a.tif"), None);
        assert_eq!(image_group_from_path("images/W1-I/a.tif"), None);
    }
}
