//! In-memory identity and dedup model.
//!
//! The catalog holds the Files/Objects/Paths/Roots graph together with the
//! technical records of each file and enforces the uniqueness and
//! referential rules of the schema:
//!
//! - `(digest, size)` and `persistent_id` are each unique across files
//! - `(bdrc_id, root)` is unique across objects and the root must exist
//! - a path references an existing file and object
//! - a file has at most one technical record, image or PDF
//! - a file with paths and a root with objects cannot be removed

mod batch;

pub use batch::{RecordBatcher, RecordSink};

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::CatalogError;
use crate::model::{
    ContentDigest, FileId, FileRecord, ObjectId, ObjectPath, PathId, Root, RootId, StorageObject,
    TechnicalInfo, Validity,
};

type ContentKey = (ContentDigest, u64);

/// What `upsert_file` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// New content, persistent id equal to the digest.
    Inserted,
    /// The content was already known; the existing row was updated.
    Existing,
    /// New content whose digest was already taken as a persistent id; a random id was assigned.
    Reassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileUpsert {
    pub id: FileId,
    pub outcome: UpsertOutcome,
}

/// One file occurrence ready for registration: the file row, its technical
/// record and where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub file: FileRecord,
    pub info: Option<TechnicalInfo>,
    pub object: ObjectId,
    pub content_path: String,
}

/// Counters for one or more commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub files_inserted: usize,
    pub files_existing: usize,
    pub ids_reassigned: usize,
    pub paths_added: usize,
}

impl CommitSummary {
    pub fn merge(&mut self, other: CommitSummary) {
        self.files_inserted += other.files_inserted;
        self.files_existing += other.files_existing;
        self.ids_reassigned += other.ids_reassigned;
        self.paths_added += other.paths_added;
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    roots: BTreeMap<RootId, Root>,
    objects: BTreeMap<ObjectId, StorageObject>,
    files: BTreeMap<FileId, FileRecord>,
    paths: BTreeMap<PathId, ObjectPath>,
    infos: HashMap<FileId, TechnicalInfo>,

    by_content: HashMap<ContentKey, FileId>,
    by_persistent_id: HashMap<ContentDigest, FileId>,
    by_object_key: HashMap<(String, RootId), ObjectId>,
    by_path_key: HashMap<(FileId, ObjectId, String), PathId>,

    next_id: u32,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    // Roots

    /// Register a root, or return the id of the root with the same name.
    pub fn upsert_root(&mut self, root: Root) -> RootId {
        if let Some(id) = self.root_by_name(&root.name) {
            return id;
        }
        let id = RootId(self.allocate());
        self.roots.insert(id, root);
        id
    }

    pub fn root(&self, id: RootId) -> Option<&Root> {
        self.roots.get(&id)
    }

    pub fn root_by_name(&self, name: &str) -> Option<RootId> {
        self.roots
            .iter()
            .find(|(_, root)| root.name == name)
            .map(|(id, _)| *id)
    }

    pub fn remove_root(&mut self, id: RootId) -> Result<Root, CatalogError> {
        if !self.roots.contains_key(&id) {
            return Err(CatalogError::RootNotFound(id));
        }
        if self.objects.values().any(|o| o.root == id) {
            return Err(CatalogError::RootInUse(id));
        }
        self.roots.remove(&id).ok_or(CatalogError::RootNotFound(id))
    }

    // Objects

    /// Register a new object. Fails if `(bdrc_id, root)` is taken.
    pub fn add_object(&mut self, object: StorageObject) -> Result<ObjectId, CatalogError> {
        if self.find_object(&object.bdrc_id, object.root).is_some() {
            return Err(CatalogError::DuplicateObject {
                bdrc_id: object.bdrc_id,
                root: object.root,
            });
        }
        self.upsert_object(object)
    }

    /// Register an object, or return the existing one with the same `(bdrc_id, root)`.
    pub fn upsert_object(&mut self, object: StorageObject) -> Result<ObjectId, CatalogError> {
        if !self.roots.contains_key(&object.root) {
            return Err(CatalogError::RootNotFound(object.root));
        }
        let key = (object.bdrc_id.clone(), object.root);
        if let Some(&id) = self.by_object_key.get(&key) {
            if let Some(existing) = self.objects.get_mut(&id) {
                existing.last_modified_at = existing.last_modified_at.max(object.last_modified_at);
            }
            return Ok(id);
        }
        let id = ObjectId(self.allocate());
        self.by_object_key.insert(key, id);
        self.objects.insert(id, object);
        Ok(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&StorageObject> {
        self.objects.get(&id)
    }

    pub fn find_object(&self, bdrc_id: &str, root: RootId) -> Option<ObjectId> {
        self.by_object_key.get(&(bdrc_id.to_string(), root)).copied()
    }

    // Files

    /// Insert a file row, collapsing it onto existing content.
    ///
    /// When the content is already known the existing row is kept and only
    /// gains what the new record adds: earlier timestamps, a PRONOM number,
    /// a validity if none was set. When the provisional persistent id is
    /// already held by other content, a random id is assigned instead.
    pub fn upsert_file(&mut self, file: FileRecord) -> FileUpsert {
        if let Some(&id) = self.by_content.get(&file.content_key()) {
            if let Some(existing) = self.files.get_mut(&id) {
                merge_file(existing, file);
            }
            return FileUpsert {
                id,
                outcome: UpsertOutcome::Existing,
            };
        }

        let mut file = file;
        let mut outcome = UpsertOutcome::Inserted;
        if self.by_persistent_id.contains_key(&file.persistent_id) {
            let taken = file.persistent_id;
            file.persistent_id = self.unused_persistent_id();
            outcome = UpsertOutcome::Reassigned;
            tracing::warn!(
                "Persistent id {taken} already assigned; using {} for {} bytes",
                file.persistent_id,
                file.size
            );
        }

        let id = FileId(self.allocate());
        self.by_content.insert(file.content_key(), id);
        self.by_persistent_id.insert(file.persistent_id, id);
        self.files.insert(id, file);
        FileUpsert { id, outcome }
    }

    fn unused_persistent_id(&self) -> ContentDigest {
        loop {
            let candidate = ContentDigest::random();
            if !self.by_persistent_id.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn file(&self, id: FileId) -> Option<&FileRecord> {
        self.files.get(&id)
    }

    pub fn find_file(&self, digest: &ContentDigest, size: u64) -> Option<FileId> {
        self.by_content.get(&(*digest, size)).copied()
    }

    pub fn find_by_persistent_id(&self, persistent_id: &ContentDigest) -> Option<FileId> {
        self.by_persistent_id.get(persistent_id).copied()
    }

    /// Assign a specific persistent id, e.g. one restored from an earlier catalog.
    pub fn set_persistent_id(&mut self, id: FileId, persistent_id: ContentDigest) -> Result<(), CatalogError> {
        match self.by_persistent_id.get(&persistent_id) {
            Some(&holder) if holder == id => return Ok(()),
            Some(_) => return Err(CatalogError::DuplicatePersistentId(persistent_id)),
            None => {}
        }
        let file = self.files.get_mut(&id).ok_or(CatalogError::FileNotFound(id))?;
        self.by_persistent_id.remove(&file.persistent_id);
        file.persistent_id = persistent_id;
        self.by_persistent_id.insert(persistent_id, id);
        Ok(())
    }

    pub fn set_validity(&mut self, id: FileId, validity: Validity) -> Result<(), CatalogError> {
        let file = self.files.get_mut(&id).ok_or(CatalogError::FileNotFound(id))?;
        file.validity = validity;
        Ok(())
    }

    pub fn set_pronom(&mut self, id: FileId, pronom_number: Option<u16>) -> Result<(), CatalogError> {
        let file = self.files.get_mut(&id).ok_or(CatalogError::FileNotFound(id))?;
        file.pronom_number = pronom_number;
        Ok(())
    }

    /// Remove a file and its technical record. Fails while paths reference it.
    pub fn remove_file(&mut self, id: FileId) -> Result<FileRecord, CatalogError> {
        let references = self.paths.values().filter(|p| p.file == id).count();
        if references > 0 {
            return Err(CatalogError::FileInUse(id, references));
        }
        let file = self.files.remove(&id).ok_or(CatalogError::FileNotFound(id))?;
        self.by_content.remove(&file.content_key());
        self.by_persistent_id.remove(&file.persistent_id);
        self.infos.remove(&id);
        Ok(file)
    }

    // Technical records

    /// Attach the technical record of a file, replacing one of the same kind.
    pub fn set_info(&mut self, id: FileId, info: TechnicalInfo) -> Result<(), CatalogError> {
        if !self.files.contains_key(&id) {
            return Err(CatalogError::FileNotFound(id));
        }
        if let Some(existing) = self.infos.get(&id) {
            if existing.kind() != info.kind() {
                return Err(CatalogError::InfoConflict {
                    file: id,
                    existing: existing.kind(),
                });
            }
        }
        self.infos.insert(id, info);
        Ok(())
    }

    pub fn info(&self, id: FileId) -> Option<&TechnicalInfo> {
        self.infos.get(&id)
    }

    // Paths

    /// Record an occurrence of a file in an object. Identical rows are stored once.
    pub fn add_path(&mut self, path: ObjectPath) -> Result<PathId, CatalogError> {
        if !self.files.contains_key(&path.file) {
            return Err(CatalogError::FileNotFound(path.file));
        }
        if !self.objects.contains_key(&path.object) {
            return Err(CatalogError::ObjectNotFound(path.object));
        }
        let key = (path.file, path.object, path.path.clone());
        if let Some(&id) = self.by_path_key.get(&key) {
            return Ok(id);
        }
        let id = PathId(self.allocate());
        self.by_path_key.insert(key, id);
        self.paths.insert(id, path);
        Ok(id)
    }

    pub fn remove_path(&mut self, id: PathId) -> Option<ObjectPath> {
        let path = self.paths.remove(&id)?;
        self.by_path_key
            .remove(&(path.file, path.object, path.path.clone()));
        Some(path)
    }

    pub fn path(&self, id: PathId) -> Option<&ObjectPath> {
        self.paths.get(&id)
    }

    /// Every occurrence of a file, across objects.
    pub fn paths_of(&self, id: FileId) -> impl Iterator<Item = &ObjectPath> + '_ {
        self.paths.values().filter(move |p| p.file == id)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // Batches

    /// Register a batch of records atomically.
    ///
    /// Every record is checked before anything is written, so a failing batch
    /// leaves the catalog unchanged.
    pub fn commit(&mut self, records: Vec<CatalogRecord>) -> Result<CommitSummary, CatalogError> {
        let mut batch_kinds: HashMap<ContentKey, &'static str> = HashMap::new();
        for record in &records {
            if !self.objects.contains_key(&record.object) {
                return Err(CatalogError::ObjectNotFound(record.object));
            }
            // Validates the content path.
            ObjectPath::new(FileId(0), record.object, record.content_path.as_str())?;

            let Some(info) = &record.info else { continue };
            let key = record.file.content_key();
            let existing = self
                .find_file(&key.0, key.1)
                .and_then(|id| self.infos.get(&id).map(|i| (id, i.kind())));
            if let Some((id, kind)) = existing {
                if kind != info.kind() {
                    return Err(CatalogError::InfoConflict { file: id, existing: kind });
                }
            }
            if let Some(kind) = batch_kinds.insert(key, info.kind()) {
                if kind != info.kind() {
                    return Err(CatalogError::InfoConflict {
                        file: existing.map(|(id, _)| id).unwrap_or(FileId(0)),
                        existing: kind,
                    });
                }
            }
        }

        let mut summary = CommitSummary::default();
        for record in records {
            let upsert = self.upsert_file(record.file);
            match upsert.outcome {
                UpsertOutcome::Inserted => summary.files_inserted += 1,
                UpsertOutcome::Existing => summary.files_existing += 1,
                UpsertOutcome::Reassigned => {
                    summary.files_inserted += 1;
                    summary.ids_reassigned += 1;
                }
            }
            if let Some(info) = record.info {
                self.set_info(upsert.id, info)?;
            }
            let before = self.paths.len();
            self.add_path(ObjectPath::new(upsert.id, record.object, record.content_path)?)?;
            summary.paths_added += self.paths.len() - before;
        }
        tracing::debug!(
            "Committed batch: {} new files, {} existing, {} paths",
            summary.files_inserted,
            summary.files_existing,
            summary.paths_added
        );
        Ok(summary)
    }
}

fn merge_file(existing: &mut FileRecord, update: FileRecord) {
    existing.created_at = earliest(existing.created_at, update.created_at);
    existing.earliest_mdate = earliest(existing.earliest_mdate, update.earliest_mdate);
    if existing.pronom_number.is_none() {
        existing.pronom_number = update.pronom_number;
    }
    if existing.validity == Validity::NotSet {
        existing.validity = update.validity;
    }
}

fn earliest<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
