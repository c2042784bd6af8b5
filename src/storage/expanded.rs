//! The storage facade: a scoped view over a shared part map.
//!
//! An [`ExpandedStorage`] is a cheap handle. Sub-storages opened from it
//! share the part map and the commit tracker and only differ in their
//! base path, so a part written through one view is immediately visible
//! through every other view of the same package.

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::opc::constants::rels;
use crate::opc::packuri::PartPath;
use crate::opc::rel::{RelationshipRecord, RelationshipTable};
use crate::opc::rels_xml::{parse_relationships, write_relationships};
use crate::storage::commit::{Commit, CommitTracker};
use crate::storage::mode::ElementModes;
use crate::storage::part::Part;
use crate::storage::part_map::PartMap;
use crate::storage::property::{PropertyBag, PropertyValue};
use crate::stream::input::VecInputStream;
use crate::stream::output::VecOutputStream;
use crate::stream::supplier::StreamSupplier;
use crate::stream::traits::{RelationshipHolder, Writable};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug)]
struct StorageInner {
    files: Arc<PartMap>,
    tracker: Arc<CommitTracker>,
    config: Arc<StorageConfig>,
    /// Base path without surrounding slashes, empty at the package root.
    base: String,
    /// Relationships of every `.rels` part directly in `{base}/_rels`.
    relationships: RelationshipTable,
    properties: PropertyBag,
}

/// In-memory package storage.
///
/// Names passed to the methods are relative to the base path of the view
/// unless the method says otherwise. Names are joined to the base by
/// plain concatenation; `.` and `..` segments are not interpreted.
///
/// # Examples
///
/// ```
/// use opc_memstore::{ElementModes, ExpandedStorage, Readable, Writable};
///
/// let storage = ExpandedStorage::new();
/// storage.add_part("word/document.xml", b"<xml/>".to_vec());
///
/// let word = storage.open_storage_element("word", ElementModes::READWRITE)?;
/// let stream = word.open_stream_element("document.xml", ElementModes::READWRITE)?;
/// let output = stream.output_stream()?;
/// output.write_bytes(b"<xml>v2</xml>");
/// output.close_output();
///
/// let commit = storage.commit();
/// assert_eq!(commit.changed.len(), 1);
/// assert_eq!(commit.changed[0].0, "word/document.xml");
/// # Ok::<(), opc_memstore::StorageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExpandedStorage {
    inner: Arc<StorageInner>,
}

impl Default for ExpandedStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpandedStorage {
    /// An empty package with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StorageConfig::default())
    }

    /// An empty package.
    pub fn with_config(config: StorageConfig) -> Self {
        Self::assemble(
            Arc::new(PartMap::new()),
            Arc::new(CommitTracker::new()),
            Arc::new(config),
            String::new(),
        )
    }

    /// A package holding already loaded parts, keyed by path.
    ///
    /// Every part starts hashed, so the first commit only reports what
    /// changed after construction. The package relationships are preloaded
    /// from `_rels/*.rels`.
    pub fn from_parts<I, K>(parts: I, config: StorageConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: AsRef<str>,
    {
        let files = PartMap::from_parts(
            parts
                .into_iter()
                .map(|(path, content)| (PartPath::new(path).into_string(), content)),
        );
        let storage = Self::assemble(
            Arc::new(files),
            Arc::new(CommitTracker::new()),
            Arc::new(config),
            String::new(),
        );
        storage.reload_relationships()?;
        Ok(storage)
    }

    fn assemble(
        files: Arc<PartMap>,
        tracker: Arc<CommitTracker>,
        config: Arc<StorageConfig>,
        base: String,
    ) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                files,
                tracker,
                config,
                base,
                relationships: RelationshipTable::new(),
                properties: PropertyBag::new(),
            }),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.inner.config
    }

    /// Base path of this view, empty at the package root.
    pub fn base_path(&self) -> &str {
        &self.inner.base
    }

    pub fn is_root(&self) -> bool {
        self.inner.base.is_empty()
    }

    /// The part map shared by every view of the package.
    pub fn part_map(&self) -> &Arc<PartMap> {
        &self.inner.files
    }

    /// The raw entry of the part `name`.
    pub fn part(&self, name: &str) -> Option<Arc<Part>> {
        self.inner.files.get(&self.full_path(name))
    }

    /// Whether both handles are the same view.
    pub fn ptr_eq(&self, other: &ExpandedStorage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether both views belong to the same package.
    pub fn shares_package_with(&self, other: &ExpandedStorage) -> bool {
        Arc::ptr_eq(&self.inner.files, &other.inner.files)
    }

    /// Key of `name` in the part map.
    pub fn full_path(&self, name: &str) -> String {
        PartPath::resolve(&self.inner.base, name).into_string()
    }

    // Package interface

    /// Store `content` under `path`, replacing the content of an existing
    /// part.
    pub fn add_part(&self, path: &str, content: impl Into<Vec<u8>>) {
        let path = self.full_path(path);
        self.inner.files.insert(&path, content.into());
    }

    /// Copy of the content of the part at `path`.
    pub fn get_part(&self, path: &str) -> Result<Vec<u8>> {
        self.inner.files.get_content(&self.full_path(path))
    }

    pub fn remove_part(&self, path: &str) -> Result<()> {
        self.inner.files.remove(&self.full_path(path)).map(|_| ())
    }

    /// `(path, sha256 hex)` of every part of the package, in path order.
    /// Parts created since the last commit have an empty hash.
    pub fn list_parts(&self) -> Vec<(String, String)> {
        self.inner.files.list()
    }

    /// Hash every part of the package and record the ones that changed.
    pub fn commit(&self) -> Arc<Commit> {
        self.inner.tracker.commit(
            &self.inner.files,
            self.inner.config.commit_strategy,
            self.inner.config.parallel_hash_threshold,
        )
    }

    /// Changed parts of the latest commit.
    pub fn recently_changed_files(&self) -> Vec<(String, String)> {
        self.inner.tracker.recently_changed_files()
    }

    pub fn last_commit(&self) -> Option<Arc<Commit>> {
        self.inner.tracker.last_commit()
    }

    /// Number of output streams open on the part `name`.
    pub fn open_write_count(&self, name: &str) -> Result<usize> {
        self.inner.files.open_write_count(&self.full_path(name))
    }

    // Streams

    /// Open the part `name`.
    ///
    /// `READ` hands out an input side, `WRITE` or `TRUNCATE` an output
    /// side. A missing part is created empty unless the mode grants no
    /// output or carries `NOCREATE`. `TRUNCATE` empties the part. The
    /// relationships of the part are attached when the configuration asks
    /// for it.
    pub fn open_stream_element(&self, name: &str, mode: ElementModes) -> Result<StreamSupplier> {
        self.open_at(
            self.full_path(name),
            mode,
            self.inner.config.load_relationships_on_open,
        )
    }

    /// [`ExpandedStorage::open_stream_element`] with explicit control over
    /// relationship loading. Without loading the stream gets an empty table
    /// of its own.
    pub fn open_stream_element_with(
        &self,
        name: &str,
        mode: ElementModes,
        load_relationships: bool,
    ) -> Result<StreamSupplier> {
        self.open_at(self.full_path(name), mode, load_relationships)
    }

    /// Same as [`ExpandedStorage::open_stream_element`]; the password is
    /// ignored and the stream is stored in the clear.
    pub fn open_encrypted_stream_element(
        &self,
        name: &str,
        mode: ElementModes,
        _password: &str,
    ) -> Result<StreamSupplier> {
        warn!(name, "encryption is not supported, opening plain stream");
        self.open_stream_element(name, mode)
    }

    /// Open a part by its path from the package root, whatever the base of
    /// this view. Relationships are always attached.
    pub fn open_stream_element_by_hierarchical_name(
        &self,
        path: &str,
        mode: ElementModes,
    ) -> Result<StreamSupplier> {
        self.open_at(PartPath::new(path).into_string(), mode, true)
    }

    /// Same as [`ExpandedStorage::open_stream_element_by_hierarchical_name`];
    /// the password is ignored.
    pub fn open_encrypted_stream_element_by_hierarchical_name(
        &self,
        path: &str,
        mode: ElementModes,
        _password: &str,
    ) -> Result<StreamSupplier> {
        warn!(path, "encryption is not supported, opening plain stream");
        self.open_stream_element_by_hierarchical_name(path, mode)
    }

    /// Remove a part by its path from the package root.
    pub fn remove_stream_element_by_hierarchical_name(&self, path: &str) -> Result<()> {
        self.inner
            .files
            .remove(PartPath::new(path).as_str())
            .map(|_| ())
    }

    /// Input stream over the part `name`, which must exist.
    pub fn open_input_stream(&self, name: &str) -> Result<Arc<VecInputStream>> {
        self.open_stream_element(name, ElementModes::READ)?
            .input_stream()
    }

    /// Output stream over the part `name`, created if missing.
    pub fn open_output_stream(&self, name: &str) -> Result<Arc<VecOutputStream>> {
        self.open_stream_element(name, ElementModes::READWRITE)?
            .output_stream()
    }

    /// Read-write stream pair over the part `name`.
    pub fn get_by_name(&self, name: &str) -> Result<StreamSupplier> {
        self.open_stream_element(name, ElementModes::READWRITE)
    }

    /// A read-write stream pair over a copy of the part `name`.
    ///
    /// Writes to the clone never reach the part. The clone carries its own
    /// copy of the part's relationships.
    pub fn clone_stream_element(&self, name: &str) -> Result<StreamSupplier> {
        let path = self.full_path(name);
        let part = self.inner.files.require(&path)?;
        let copy = part.duplicate();

        let records = match self.rels_path_of(&path) {
            Ok(rels_path) => match self.inner.files.buffer(&rels_path) {
                Some(buf) => buf.with_data(parse_relationships)?,
                None => Vec::new(),
            },
            Err(_) => Vec::new(),
        };

        trace!(path = %path, "cloned stream");
        Ok(StreamSupplier::new(
            path,
            Some(copy.open_input()),
            Some(copy.open_output()),
            Arc::new(RelationshipTable::from_records(records)),
        ))
    }

    /// Same as [`ExpandedStorage::clone_stream_element`]; the password is
    /// ignored.
    pub fn clone_encrypted_stream_element(
        &self,
        name: &str,
        _password: &str,
    ) -> Result<StreamSupplier> {
        warn!(name, "encryption is not supported, cloning plain stream");
        self.clone_stream_element(name)
    }

    /// Always false: encrypted variants store their content in the clear.
    pub fn supports_encryption(&self) -> bool {
        false
    }

    fn rels_path_of(&self, path: &str) -> Result<String> {
        Ok(PartPath::new(path).rels_path()?.into_string())
    }

    fn open_at(&self, path: String, mode: ElementModes, load_rels: bool) -> Result<StreamSupplier> {
        if !mode.wants_input() && !mode.wants_output() {
            return Err(StorageError::InvalidArgument(format!(
                "open mode {:?} grants neither read nor write access",
                mode
            )));
        }
        let rels_path = if load_rels {
            Some(self.rels_path_of(&path)?)
        } else {
            None
        };

        let part = self.inner.files.get_or_create(&path, mode.may_create())?;
        if mode.contains(ElementModes::TRUNCATE) {
            part.content().truncate_to(0);
        }

        let relationships = match rels_path {
            Some(rels_path) => {
                let rels = self.inner.files.buffer(&rels_path);
                part.relationships(rels.as_ref())?
            },
            None => Arc::new(RelationshipTable::new()),
        };

        let input = mode.wants_input().then(|| part.open_input());
        let output = mode.wants_output().then(|| part.open_output());
        trace!(
            path = %path,
            mode = mode.bits(),
            relationships = relationships.len(),
            "opened stream"
        );
        Ok(StreamSupplier::new(path, input, output, relationships))
    }

    // Elements

    /// Whether `name` is a part.
    pub fn is_stream_element(&self, name: &str) -> bool {
        self.inner.files.contains(&self.full_path(name))
    }

    /// Whether `name` is a directory, meaning some part lies beneath it.
    pub fn is_storage_element(&self, name: &str) -> bool {
        let path = self.full_path(name);
        self.inner.files.is_directory(path.trim_end_matches('/'))
    }

    /// Whether `name` is a part.
    pub fn has_by_name(&self, name: &str) -> bool {
        self.is_stream_element(name)
    }

    /// Paths of every part beneath this view, relative to its base.
    pub fn element_names(&self) -> Vec<String> {
        let prefix = self.dir_prefix();
        self.inner
            .files
            .paths_under(&prefix)
            .into_iter()
            .map(|path| path[prefix.len()..].to_string())
            .collect()
    }

    /// Whether any part lies beneath this view.
    pub fn has_elements(&self) -> bool {
        self.inner.files.is_directory(&self.inner.base)
    }

    pub fn remove_element(&self, name: &str) -> Result<()> {
        self.inner.files.remove(&self.full_path(name)).map(|_| ())
    }

    /// Move the part `name` to `new_name` within this view, keeping its
    /// buffer. Fails if `new_name` is taken.
    pub fn rename_element(&self, name: &str, new_name: &str) -> Result<()> {
        self.inner
            .files
            .rename(&self.full_path(name), &self.full_path(new_name))
    }

    /// Copy the content of the part `name` to `new_name` in `dest`,
    /// replacing any content there. The copy is independent of the source.
    pub fn copy_element_to(&self, name: &str, dest: &ExpandedStorage, new_name: &str) -> Result<()> {
        let content = self.get_part(name)?;
        dest.write_whole(new_name, &content)
    }

    /// Copy then remove. Moving a part onto itself does nothing.
    pub fn move_element_to(&self, name: &str, dest: &ExpandedStorage, new_name: &str) -> Result<()> {
        if self.shares_package_with(dest) && self.full_path(name) == dest.full_path(new_name) {
            if !self.is_stream_element(name) {
                return Err(StorageError::PartNotFound(self.full_path(name)));
            }
            return Ok(());
        }
        self.copy_element_to(name, dest, new_name)?;
        self.remove_element(name)
    }

    /// Copy every part beneath this view into `dest`, under the same
    /// relative paths.
    pub fn copy_to_storage(&self, dest: &ExpandedStorage) -> Result<()> {
        let prefix = self.dir_prefix();
        for (path, part) in self.inner.files.entries_under(&prefix) {
            let content = part.content().to_vec();
            dest.write_whole(&path[prefix.len()..], &content)?;
        }
        Ok(())
    }

    /// Same as [`ExpandedStorage::copy_to_storage`]: the live content is
    /// what the latest commit recorded plus any edits since.
    pub fn copy_last_commit_to(&self, dest: &ExpandedStorage) -> Result<()> {
        self.copy_to_storage(dest)
    }

    pub fn copy_storage_element_last_commit_to(
        &self,
        name: &str,
        _dest: &ExpandedStorage,
    ) -> Result<()> {
        Err(StorageError::Unsupported(format!(
            "copying the last commit of storage element '{}'",
            name
        )))
    }

    fn write_whole(&self, name: &str, content: &[u8]) -> Result<()> {
        let supplier = self.open_at(
            self.full_path(name),
            ElementModes::WRITE | ElementModes::TRUNCATE,
            false,
        )?;
        let output = supplier.output_stream()?;
        output.write_bytes(content);
        output.close_output();
        Ok(())
    }

    fn dir_prefix(&self) -> String {
        if self.inner.base.is_empty() {
            String::new()
        } else {
            format!("{}/", self.inner.base)
        }
    }

    // Sub-storages

    /// A view rooted at `name` sharing this package. `"/"` returns this
    /// same view.
    ///
    /// With `NOCREATE` the directory must already hold parts.
    pub fn open_storage_element(&self, name: &str, mode: ElementModes) -> Result<ExpandedStorage> {
        if name == "/" {
            return Ok(self.clone());
        }
        if mode.contains(ElementModes::NOCREATE) && !self.is_storage_element(name) {
            return Err(StorageError::StorageNotFound(self.full_path(name)));
        }
        self.sub_storage(name)
    }

    /// A view rooted at `name`. Without `create_missing` the directory must
    /// exist and must not be a relationship directory.
    pub fn open_sub_storage(&self, name: &str, create_missing: bool) -> Result<ExpandedStorage> {
        if !create_missing {
            let is_rels_dir = name.trim_matches('/') == rels::DIR_NAME;
            if is_rels_dir || !self.is_storage_element(name) {
                return Err(StorageError::StorageNotFound(self.full_path(name)));
            }
        }
        self.sub_storage(name)
    }

    fn sub_storage(&self, name: &str) -> Result<ExpandedStorage> {
        let base = self.full_path(name).trim_end_matches('/').to_string();
        debug!(base = %base, "opening sub-storage");
        let storage = Self::assemble(
            Arc::clone(&self.inner.files),
            Arc::clone(&self.inner.tracker),
            Arc::clone(&self.inner.config),
            base,
        );
        storage.reload_relationships()?;
        Ok(storage)
    }

    // Relationships

    /// Reparse every `.rels` part directly in `{base}/_rels` into the
    /// storage-level table.
    ///
    /// Records whose `Id` was already seen in an earlier relationship part
    /// are skipped. A relationship part that fails to parse is an error,
    /// or is logged and skipped when the configuration is lenient.
    pub fn reload_relationships(&self) -> Result<()> {
        let prefix = format!("{}{}/", self.dir_prefix(), rels::DIR_NAME);
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<RelationshipRecord> = Vec::new();

        for (path, part) in self.inner.files.entries_under(&prefix) {
            if !PartPath::new(&path).is_rels_part_of(&self.inner.base) {
                continue;
            }
            let records = match part.content().with_data(parse_relationships) {
                Ok(records) => records,
                Err(e) if !self.inner.config.strict_relationship_preload => {
                    warn!(path = %path, error = %e, "skipping unreadable relationship part");
                    continue;
                },
                Err(e) => return Err(e),
            };
            for record in records {
                let Some(id) = record.id() else { continue };
                if seen.insert(id.to_string()) {
                    merged.push(record);
                } else {
                    trace!(path = %path, id, "duplicate relationship id skipped");
                }
            }
        }

        trace!(base = %self.inner.base, count = merged.len(), "preloaded relationships");
        self.inner.relationships.load(merged);
        Ok(())
    }

    /// Write every modified part relationship table back into its `.rels`
    /// part, creating the part when missing. Returns the number of
    /// relationship parts written.
    ///
    /// The next commit reports the rewritten `.rels` parts.
    pub fn commit_relationships(&self) -> Result<usize> {
        let mut written = 0;
        for (path, part) in self.inner.files.snapshot() {
            let Some(table) = part.cached_relationships() else {
                continue;
            };
            if !table.is_modified() {
                continue;
            }
            let rels_path = self.rels_path_of(&path)?;
            let Some(records) = table.take_modified() else {
                continue;
            };
            let xml = write_relationships(&records);

            let rels_part = self.inner.files.get_or_create(&rels_path, true)?;
            rels_part.content().replace(xml.into_bytes());
            part.mark_relationships_saved(rels_part.content());
            written += 1;
        }
        debug!(written, "wrote relationship parts");
        Ok(written)
    }

    // Properties

    /// Set a property of this view. Properties are not shared with
    /// sub-storages.
    pub fn set_property(&self, name: &str, value: impl Into<PropertyValue>) {
        self.inner.properties.set(name, value.into());
    }

    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.inner.properties.get(name)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.inner.properties.names()
    }
}

impl RelationshipHolder for ExpandedStorage {
    fn relationships(&self) -> &RelationshipTable {
        &self.inner.relationships
    }
}
