//! Logical journal entry types.
//!
//! A [`JournalEntry`] is one metadata mutation of the file system namespace.
//! Its content is a closed sum type, [`EntryPayload`], with one variant per
//! mutation kind; an entry without a payload is representable and classifies
//! as unmatched. Entries travel inside a [`JournalEntryBatch`], which is what
//! a single state-machine record of the Raft log carries.
//!
//! All payload structs derive `Serialize`/`Deserialize` so the batch codecs
//! in [`codec`](super::codec) can move them in and out of record payloads.
//! Optional fields use `#[serde(default)]` so older payloads that lack a
//! field still decode. A payload tagged with a variant this crate does not
//! know decodes to `None`, so the entry classifies as unmatched instead of
//! failing the whole batch.

use super::classifier::EntryType;
use serde::de::{self, Deserializer, EnumAccess, IgnoredAny, VariantAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persistence state of an inode, as recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistenceState {
    /// The inode exists only in the cache layer.
    #[default]
    NotPersisted,
    /// A persist job is outstanding for the inode.
    ToBePersisted,
    /// The inode is persisted in the under file system.
    Persisted,
    /// The inode was lost.
    Lost,
}

/// How a [`SetAclEntry`] modifies the access control list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetAclAction {
    /// Replace the whole list.
    #[default]
    Replace,
    /// Add or update the given entries.
    Modify,
    /// Remove the given entries.
    Remove,
    /// Remove every entry.
    RemoveAll,
    /// Remove the default ACL of a directory.
    RemoveDefault,
}

/// Removes an inode from the namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteFileEntry {
    /// Inode id of the deleted file or directory.
    pub id: u64,
    /// Whether the delete was recursive.
    #[serde(default)]
    pub recursive: bool,
    /// Operation time in milliseconds since the epoch.
    #[serde(default)]
    pub op_time_ms: i64,
    /// Path of the inode at delete time, when recorded.
    #[serde(default)]
    pub path: Option<String>,
}

/// Creates a directory inode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InodeDirectoryEntry {
    /// Inode id.
    pub id: u64,
    /// Parent inode id.
    pub parent_id: u64,
    /// Directory name within the parent.
    pub name: String,
    /// Persistence state at creation.
    #[serde(default)]
    pub persistence_state: PersistenceState,
    /// Whether the directory is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// Creation time in milliseconds since the epoch.
    #[serde(default)]
    pub creation_time_ms: i64,
    /// Last modification time in milliseconds since the epoch.
    #[serde(default)]
    pub last_modification_time_ms: i64,
    /// Owner user name.
    #[serde(default)]
    pub owner: String,
    /// Owner group name.
    #[serde(default)]
    pub group: String,
    /// POSIX permission bits.
    #[serde(default)]
    pub mode: u32,
    /// Whether the directory is a mount point.
    #[serde(default)]
    pub mount_point: bool,
    /// Whether the children of the directory have been loaded from the UFS.
    #[serde(default)]
    pub direct_children_loaded: bool,
}

/// Creates a file inode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InodeFileEntry {
    /// Inode id.
    pub id: u64,
    /// Parent inode id.
    pub parent_id: u64,
    /// File name within the parent.
    pub name: String,
    /// Persistence state at creation.
    #[serde(default)]
    pub persistence_state: PersistenceState,
    /// Whether the file is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// Creation time in milliseconds since the epoch.
    #[serde(default)]
    pub creation_time_ms: i64,
    /// Last modification time in milliseconds since the epoch.
    #[serde(default)]
    pub last_modification_time_ms: i64,
    /// Block size in bytes.
    #[serde(default)]
    pub block_size_bytes: u64,
    /// File length in bytes.
    #[serde(default)]
    pub length: u64,
    /// Whether the file is complete.
    #[serde(default)]
    pub completed: bool,
    /// Whether the file may be cached.
    #[serde(default)]
    pub cacheable: bool,
    /// Block ids of the file, in order.
    #[serde(default)]
    pub blocks: Vec<u64>,
    /// Time to live in milliseconds, when set.
    #[serde(default)]
    pub ttl: Option<i64>,
    /// Owner user name.
    #[serde(default)]
    pub owner: String,
    /// Owner group name.
    #[serde(default)]
    pub group: String,
    /// POSIX permission bits.
    #[serde(default)]
    pub mode: u32,
}

/// Allocates a new block for a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewBlockEntry {
    /// Inode id of the file the block belongs to.
    pub id: u64,
    /// The allocated block id.
    pub block_id: u64,
}

/// Moves an inode to a new parent or name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenameEntry {
    /// Inode id.
    pub id: u64,
    /// Operation time in milliseconds since the epoch.
    #[serde(default)]
    pub op_time_ms: i64,
    /// New parent inode id.
    #[serde(default)]
    pub new_parent_id: u64,
    /// New name within the new parent.
    #[serde(default)]
    pub new_name: String,
    /// Source path, when recorded.
    #[serde(default)]
    pub path: Option<String>,
    /// Destination path, when recorded.
    #[serde(default)]
    pub new_path: Option<String>,
}

/// Changes the access control list of an inode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetAclEntry {
    /// Inode id.
    pub id: u64,
    /// Operation time in milliseconds since the epoch.
    #[serde(default)]
    pub op_time_ms: i64,
    /// The modification to apply.
    #[serde(default)]
    pub action: SetAclAction,
    /// ACL entries in their string form (e.g. `user:alice:rwx`).
    #[serde(default)]
    pub entries: Vec<String>,
    /// Whether the change applies recursively.
    #[serde(default)]
    pub recursive: bool,
}

/// Updates attributes common to every inode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateInodeEntry {
    /// Inode id.
    pub id: u64,
    /// New parent inode id.
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New persistence state.
    #[serde(default)]
    pub persistence_state: Option<PersistenceState>,
    /// New pinned flag.
    #[serde(default)]
    pub pinned: Option<bool>,
    /// New time to live in milliseconds.
    #[serde(default)]
    pub ttl: Option<i64>,
    /// New last modification time in milliseconds since the epoch.
    #[serde(default)]
    pub last_modification_time_ms: Option<i64>,
    /// New last access time in milliseconds since the epoch.
    #[serde(default)]
    pub last_access_time_ms: Option<i64>,
    /// New owner user name.
    #[serde(default)]
    pub owner: Option<String>,
    /// New owner group name.
    #[serde(default)]
    pub group: Option<String>,
    /// New POSIX permission bits.
    #[serde(default)]
    pub mode: Option<u32>,
    /// New UFS fingerprint.
    #[serde(default)]
    pub ufs_fingerprint: Option<String>,
}

/// Updates directory-only attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateInodeDirectoryEntry {
    /// Inode id.
    pub id: u64,
    /// New mount point flag.
    #[serde(default)]
    pub mount_point: Option<bool>,
    /// New children-loaded flag.
    #[serde(default)]
    pub direct_children_loaded: Option<bool>,
    /// New default ACL entries.
    #[serde(default)]
    pub default_acl: Vec<String>,
}

/// Updates file-only attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateInodeFileEntry {
    /// Inode id.
    pub id: u64,
    /// New block size in bytes.
    #[serde(default)]
    pub block_size_bytes: Option<u64>,
    /// New length in bytes.
    #[serde(default)]
    pub length: Option<u64>,
    /// New completed flag.
    #[serde(default)]
    pub completed: Option<bool>,
    /// New cacheable flag.
    #[serde(default)]
    pub cacheable: Option<bool>,
    /// Replacement block list.
    #[serde(default)]
    pub set_blocks: Vec<u64>,
}

/// Deprecated: requests an asynchronous persist of a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AsyncPersistRequestEntry {
    /// Inode id of the file.
    pub file_id: u64,
}

/// Deprecated: marks a file complete.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompleteFileEntry {
    /// Inode id.
    pub id: u64,
    /// Block ids of the completed file.
    #[serde(default)]
    pub block_ids: Vec<u64>,
    /// Final length in bytes.
    #[serde(default)]
    pub length: u64,
    /// Operation time in milliseconds since the epoch.
    #[serde(default)]
    pub op_time_ms: i64,
    /// UFS fingerprint, when recorded.
    #[serde(default)]
    pub ufs_fingerprint: Option<String>,
}

/// Deprecated: sets the last modification time of an inode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InodeLastModificationTimeEntry {
    /// Inode id.
    pub id: u64,
    /// Last modification time in milliseconds since the epoch.
    pub last_modification_time_ms: i64,
}

/// Deprecated: marks a directory persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistDirectoryEntry {
    /// Inode id.
    pub id: u64,
}

/// Deprecated: sets assorted inode attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetAttributeEntry {
    /// Inode id.
    pub id: u64,
    /// Operation time in milliseconds since the epoch.
    #[serde(default)]
    pub op_time_ms: i64,
    /// New pinned flag.
    #[serde(default)]
    pub pinned: Option<bool>,
    /// New time to live in milliseconds.
    #[serde(default)]
    pub ttl: Option<i64>,
    /// New persisted flag.
    #[serde(default)]
    pub persisted: Option<bool>,
    /// New owner user name.
    #[serde(default)]
    pub owner: Option<String>,
    /// New owner group name.
    #[serde(default)]
    pub group: Option<String>,
    /// New POSIX permission bits.
    #[serde(default)]
    pub permission: Option<u32>,
}

/// Deprecated: advances the directory id generator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InodeDirectoryIdGeneratorEntry {
    /// Container id the generator allocates from.
    pub container_id: u64,
    /// Next sequence number within the container.
    pub sequence_number: u64,
}

/// The mutation carried by a [`JournalEntry`].
///
/// Exactly one variant is present per entry. The deprecated variants are
/// still decoded because older journals contain them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPayload {
    /// An inode was deleted.
    DeleteFile(DeleteFileEntry),
    /// A directory inode was created.
    InodeDirectory(InodeDirectoryEntry),
    /// A file inode was created.
    InodeFile(InodeFileEntry),
    /// A block was allocated.
    NewBlock(NewBlockEntry),
    /// An inode was renamed.
    Rename(RenameEntry),
    /// An ACL was changed.
    SetAcl(SetAclEntry),
    /// Common inode attributes were updated.
    UpdateInode(UpdateInodeEntry),
    /// Directory attributes were updated.
    UpdateInodeDirectory(UpdateInodeDirectoryEntry),
    /// File attributes were updated.
    UpdateInodeFile(UpdateInodeFileEntry),
    /// Deprecated async persist request.
    AsyncPersistRequest(AsyncPersistRequestEntry),
    /// Deprecated file completion.
    CompleteFile(CompleteFileEntry),
    /// Deprecated modification time update.
    InodeLastModificationTime(InodeLastModificationTimeEntry),
    /// Deprecated directory persist.
    PersistDirectory(PersistDirectoryEntry),
    /// Deprecated attribute update.
    SetAttribute(SetAttributeEntry),
    /// Deprecated directory id generator update.
    InodeDirectoryIdGenerator(InodeDirectoryIdGeneratorEntry),
}

impl EntryPayload {
    /// Inode id the mutation applies to, where the variant has one.
    #[must_use]
    pub fn inode_id(&self) -> Option<u64> {
        match self {
            EntryPayload::DeleteFile(e) => Some(e.id),
            EntryPayload::InodeDirectory(e) => Some(e.id),
            EntryPayload::InodeFile(e) => Some(e.id),
            EntryPayload::NewBlock(e) => Some(e.id),
            EntryPayload::Rename(e) => Some(e.id),
            EntryPayload::SetAcl(e) => Some(e.id),
            EntryPayload::UpdateInode(e) => Some(e.id),
            EntryPayload::UpdateInodeDirectory(e) => Some(e.id),
            EntryPayload::UpdateInodeFile(e) => Some(e.id),
            EntryPayload::AsyncPersistRequest(e) => Some(e.file_id),
            EntryPayload::CompleteFile(e) => Some(e.id),
            EntryPayload::InodeLastModificationTime(e) => Some(e.id),
            EntryPayload::PersistDirectory(e) => Some(e.id),
            EntryPayload::SetAttribute(e) => Some(e.id),
            EntryPayload::InodeDirectoryIdGenerator(_) => None,
        }
    }
}

/// A single logical journal entry.
///
/// `sequence_number` is assigned by the writer at write time. Readers that
/// replay or re-emit entries clear it, and the next writer assigns a fresh
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Write-time sequence number, if assigned.
    #[serde(default)]
    pub sequence_number: Option<u64>,

    /// The mutation, or `None` for an entry whose variant is not recognised.
    #[serde(default, deserialize_with = "deserialize_payload")]
    pub payload: Option<EntryPayload>,
}

/// Wire names of the [`EntryPayload`] variants, in declaration order.
///
/// The position of a name is also its variant index in non-self-describing
/// formats, and matches [`EntryType::ALL`].
const PAYLOAD_VARIANTS: &[&str] = &[
    "delete_file",
    "inode_directory",
    "inode_file",
    "new_block",
    "rename",
    "set_acl",
    "update_inode",
    "update_inode_directory",
    "update_inode_file",
    "async_persist_request",
    "complete_file",
    "inode_last_modification_time",
    "persist_directory",
    "set_attribute",
    "inode_directory_id_generator",
];

/// Decode an optional payload, mapping an unknown variant tag to `None`.
///
/// The content of an unknown variant is skipped with [`IgnoredAny`], which
/// needs a self-describing format such as JSON. Non-self-describing formats
/// carry only variant indices written by this crate, so every index they
/// hold is known.
fn deserialize_payload<'de, D>(deserializer: D) -> Result<Option<EntryPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(OptionalPayloadVisitor)
}

struct OptionalPayloadVisitor;

impl<'de> Visitor<'de> for OptionalPayloadVisitor {
    type Value = Option<EntryPayload>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an optional journal entry payload")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_enum("EntryPayload", PAYLOAD_VARIANTS, PayloadVisitor)
    }
}

/// Variant tag of an encoded payload.
enum PayloadTag {
    Known(EntryType),
    Unknown,
}

impl PayloadTag {
    fn at(index: usize) -> Self {
        match (PAYLOAD_VARIANTS.get(index), EntryType::ALL.get(index)) {
            (Some(_), Some(&entry_type)) => PayloadTag::Known(entry_type),
            _ => PayloadTag::Unknown,
        }
    }

    fn named(name: &str) -> Self {
        PAYLOAD_VARIANTS
            .iter()
            .position(|&known| known == name)
            .map_or(PayloadTag::Unknown, PayloadTag::at)
    }
}

impl<'de> Deserialize<'de> for PayloadTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_identifier(PayloadTagVisitor)
    }
}

struct PayloadTagVisitor;

impl Visitor<'_> for PayloadTagVisitor {
    type Value = PayloadTag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a payload variant name or index")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<PayloadTag, E> {
        Ok(usize::try_from(value).map_or(PayloadTag::Unknown, PayloadTag::at))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<PayloadTag, E> {
        Ok(PayloadTag::named(value))
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<PayloadTag, E> {
        Ok(std::str::from_utf8(value).map_or(PayloadTag::Unknown, PayloadTag::named))
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Option<EntryPayload>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a journal entry payload")
    }

    fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, variant) = data.variant::<PayloadTag>()?;
        let payload = match tag {
            PayloadTag::Known(EntryType::DeleteFile) => {
                EntryPayload::DeleteFile(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::InodeDirectory) => {
                EntryPayload::InodeDirectory(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::InodeFile) => {
                EntryPayload::InodeFile(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::NewBlock) => {
                EntryPayload::NewBlock(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::Rename) => EntryPayload::Rename(variant.newtype_variant()?),
            PayloadTag::Known(EntryType::SetAcl) => EntryPayload::SetAcl(variant.newtype_variant()?),
            PayloadTag::Known(EntryType::UpdateInode) => {
                EntryPayload::UpdateInode(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::UpdateInodeDirectory) => {
                EntryPayload::UpdateInodeDirectory(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::UpdateInodeFile) => {
                EntryPayload::UpdateInodeFile(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::AsyncPersistRequest) => {
                EntryPayload::AsyncPersistRequest(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::CompleteFile) => {
                EntryPayload::CompleteFile(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::InodeLastModificationTime) => {
                EntryPayload::InodeLastModificationTime(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::PersistDirectory) => {
                EntryPayload::PersistDirectory(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::SetAttribute) => {
                EntryPayload::SetAttribute(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::InodeDirectoryIdGenerator) => {
                EntryPayload::InodeDirectoryIdGenerator(variant.newtype_variant()?)
            }
            PayloadTag::Known(EntryType::Unmatched) | PayloadTag::Unknown => {
                variant.newtype_variant::<IgnoredAny>()?;
                return Ok(None);
            }
        };
        Ok(Some(payload))
    }
}

impl JournalEntry {
    /// Create an entry with the given payload and no sequence number.
    #[must_use]
    pub fn new(payload: EntryPayload) -> Self {
        Self {
            sequence_number: None,
            payload: Some(payload),
        }
    }

    /// Create an entry that carries no recognised variant.
    #[must_use]
    pub fn unmatched() -> Self {
        Self::default()
    }

    /// Returns the entry with `sequence_number` set.
    #[must_use]
    pub fn with_sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }

    /// Returns the entry with `sequence_number` cleared and every other
    /// field unchanged.
    #[must_use]
    #[inline]
    pub fn without_sequence_number(mut self) -> Self {
        self.sequence_number = None;
        self
    }
}

impl From<EntryPayload> for JournalEntry {
    fn from(payload: EntryPayload) -> Self {
        Self::new(payload)
    }
}

/// The ordered list of entries carried by one state-machine record.
///
/// A batch may be empty. Insertion order is the order entries are applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JournalEntryBatch {
    /// Entries in application order.
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

impl JournalEntryBatch {
    /// Create a batch from entries.
    #[must_use]
    pub fn new(entries: Vec<JournalEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries in the batch.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the batch carries no entries.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<JournalEntry>> for JournalEntryBatch {
    fn from(entries: Vec<JournalEntry>) -> Self {
        Self::new(entries)
    }
}

impl IntoIterator for JournalEntryBatch {
    type Item = JournalEntry;
    type IntoIter = std::vec::IntoIter<JournalEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
