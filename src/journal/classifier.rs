//! Classification of journal entries into stable type codes.
//!
//! Codes follow the fixed priority order of the entry variants and are part
//! of the tool's command line surface, so they never change:
//!
//! | code | type                          |
//! |------|-------------------------------|
//! | 0    | `delete-file`                 |
//! | 1    | `inode-directory`             |
//! | 2    | `inode-file`                  |
//! | 3    | `new-block`                   |
//! | 4    | `rename`                      |
//! | 5    | `set-acl`                     |
//! | 6    | `update-inode`                |
//! | 7    | `update-inode-directory`      |
//! | 8    | `update-inode-file`           |
//! | 9    | `async-persist-request`       |
//! | 10   | `complete-file`               |
//! | 11   | `inode-last-modification-time`|
//! | 12   | `persist-directory`           |
//! | 13   | `set-attribute`               |
//! | 14   | `inode-directory-id-generator`|
//! | -1   | `unmatched`                   |
//!
//! Code 15 was historically a second, unreachable code for delete-file
//! entries. It is not accepted.

use super::entry::{EntryPayload, JournalEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    DeleteFile,
    InodeDirectory,
    InodeFile,
    NewBlock,
    Rename,
    SetAcl,
    UpdateInode,
    UpdateInodeDirectory,
    UpdateInodeFile,
    AsyncPersistRequest,
    CompleteFile,
    InodeLastModificationTime,
    PersistDirectory,
    SetAttribute,
    InodeDirectoryIdGenerator,
    /// The entry carries no recognised variant.
    Unmatched,
}

impl EntryType {
    /// Every type, in code order, with [`EntryType::Unmatched`] last.
    pub const ALL: [EntryType; 16] = [
        EntryType::DeleteFile,
        EntryType::InodeDirectory,
        EntryType::InodeFile,
        EntryType::NewBlock,
        EntryType::Rename,
        EntryType::SetAcl,
        EntryType::UpdateInode,
        EntryType::UpdateInodeDirectory,
        EntryType::UpdateInodeFile,
        EntryType::AsyncPersistRequest,
        EntryType::CompleteFile,
        EntryType::InodeLastModificationTime,
        EntryType::PersistDirectory,
        EntryType::SetAttribute,
        EntryType::InodeDirectoryIdGenerator,
        EntryType::Unmatched,
    ];

    /// The stable numeric code of this type.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            EntryType::DeleteFile => 0,
            EntryType::InodeDirectory => 1,
            EntryType::InodeFile => 2,
            EntryType::NewBlock => 3,
            EntryType::Rename => 4,
            EntryType::SetAcl => 5,
            EntryType::UpdateInode => 6,
            EntryType::UpdateInodeDirectory => 7,
            EntryType::UpdateInodeFile => 8,
            EntryType::AsyncPersistRequest => 9,
            EntryType::CompleteFile => 10,
            EntryType::InodeLastModificationTime => 11,
            EntryType::PersistDirectory => 12,
            EntryType::SetAttribute => 13,
            EntryType::InodeDirectoryIdGenerator => 14,
            EntryType::Unmatched => -1,
        }
    }

    /// Look a type up by its numeric code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// The kebab-case name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EntryType::DeleteFile => "delete-file",
            EntryType::InodeDirectory => "inode-directory",
            EntryType::InodeFile => "inode-file",
            EntryType::NewBlock => "new-block",
            EntryType::Rename => "rename",
            EntryType::SetAcl => "set-acl",
            EntryType::UpdateInode => "update-inode",
            EntryType::UpdateInodeDirectory => "update-inode-directory",
            EntryType::UpdateInodeFile => "update-inode-file",
            EntryType::AsyncPersistRequest => "async-persist-request",
            EntryType::CompleteFile => "complete-file",
            EntryType::InodeLastModificationTime => "inode-last-modification-time",
            EntryType::PersistDirectory => "persist-directory",
            EntryType::SetAttribute => "set-attribute",
            EntryType::InodeDirectoryIdGenerator => "inode-directory-id-generator",
            EntryType::Unmatched => "unmatched",
        }
    }

    /// Returns `true` for variants only found in older journals.
    #[must_use]
    pub const fn is_deprecated(self) -> bool {
        matches!(self.code(), 9..=14)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no entry type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntryTypeError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseEntryTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entry type: {}", self.input)
    }
}

impl std::error::Error for ParseEntryTypeError {}

impl FromStr for EntryType {
    type Err = ParseEntryTypeError;

    /// Accepts a numeric code (`"6"`, `"-1"`) or a name. Names are matched
    /// case-insensitively and `_` is treated as `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let found = match trimmed.parse::<i32>() {
            Ok(code) => Self::from_code(code),
            Err(_) => {
                let normalized = trimmed.to_ascii_lowercase().replace('_', "-");
                Self::ALL.into_iter().find(|t| t.name() == normalized)
            }
        };
        found.ok_or_else(|| ParseEntryTypeError {
            input: s.to_string(),
        })
    }
}

/// Classify an entry by the variant it carries.
///
/// Pure and deterministic. Entries without a payload are
/// [`EntryType::Unmatched`].
#[must_use]
pub fn classify(entry: &JournalEntry) -> EntryType {
    match &entry.payload {
        Some(EntryPayload::DeleteFile(_)) => EntryType::DeleteFile,
        Some(EntryPayload::InodeDirectory(_)) => EntryType::InodeDirectory,
        Some(EntryPayload::InodeFile(_)) => EntryType::InodeFile,
        Some(EntryPayload::NewBlock(_)) => EntryType::NewBlock,
        Some(EntryPayload::Rename(_)) => EntryType::Rename,
        Some(EntryPayload::SetAcl(_)) => EntryType::SetAcl,
        Some(EntryPayload::UpdateInode(_)) => EntryType::UpdateInode,
        Some(EntryPayload::UpdateInodeDirectory(_)) => EntryType::UpdateInodeDirectory,
        Some(EntryPayload::UpdateInodeFile(_)) => EntryType::UpdateInodeFile,
        Some(EntryPayload::AsyncPersistRequest(_)) => EntryType::AsyncPersistRequest,
        Some(EntryPayload::CompleteFile(_)) => EntryType::CompleteFile,
        Some(EntryPayload::InodeLastModificationTime(_)) => EntryType::InodeLastModificationTime,
        Some(EntryPayload::PersistDirectory(_)) => EntryType::PersistDirectory,
        Some(EntryPayload::SetAttribute(_)) => EntryType::SetAttribute,
        Some(EntryPayload::InodeDirectoryIdGenerator(_)) => EntryType::InodeDirectoryIdGenerator,
        None => EntryType::Unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::codec::{BatchCodec, JsonBatchCodec};
    use crate::journal::entry::*;

    fn sample(entry_type: EntryType) -> JournalEntry {
        let payload = match entry_type {
            EntryType::DeleteFile => EntryPayload::DeleteFile(DeleteFileEntry::default()),
            EntryType::InodeDirectory => {
                EntryPayload::InodeDirectory(InodeDirectoryEntry::default())
            }
            EntryType::InodeFile => EntryPayload::InodeFile(InodeFileEntry::default()),
            EntryType::NewBlock => EntryPayload::NewBlock(NewBlockEntry::default()),
            EntryType::Rename => EntryPayload::Rename(RenameEntry::default()),
            EntryType::SetAcl => EntryPayload::SetAcl(SetAclEntry::default()),
            EntryType::UpdateInode => EntryPayload::UpdateInode(UpdateInodeEntry::default()),
            EntryType::UpdateInodeDirectory => {
                EntryPayload::UpdateInodeDirectory(UpdateInodeDirectoryEntry::default())
            }
            EntryType::UpdateInodeFile => {
                EntryPayload::UpdateInodeFile(UpdateInodeFileEntry::default())
            }
            EntryType::AsyncPersistRequest => {
                EntryPayload::AsyncPersistRequest(AsyncPersistRequestEntry::default())
            }
            EntryType::CompleteFile => EntryPayload::CompleteFile(CompleteFileEntry::default()),
            EntryType::InodeLastModificationTime => {
                EntryPayload::InodeLastModificationTime(InodeLastModificationTimeEntry::default())
            }
            EntryType::PersistDirectory => {
                EntryPayload::PersistDirectory(PersistDirectoryEntry::default())
            }
            EntryType::SetAttribute => EntryPayload::SetAttribute(SetAttributeEntry::default()),
            EntryType::InodeDirectoryIdGenerator => EntryPayload::InodeDirectoryIdGenerator(
                InodeDirectoryIdGeneratorEntry::default(),
            ),
            EntryType::Unmatched => return JournalEntry::unmatched(),
        };
        JournalEntry::new(payload)
    }

    fn assert_codec_keeps_types(codec: &dyn BatchCodec) {
        let batch = JournalEntryBatch::new(EntryType::ALL.into_iter().map(sample).collect());
        let bytes = codec
            .encode_batch(&batch)
            .unwrap_or_else(|e| panic!("encode: {e}"));
        let decoded = codec
            .decode_batch(&bytes)
            .unwrap_or_else(|e| panic!("decode: {e}"));
        let types: Vec<EntryType> = decoded.entries.iter().map(classify).collect();
        assert_eq!(types, EntryType::ALL.to_vec());
    }

    #[test]
    fn test_every_variant_survives_json() {
        assert_codec_keeps_types(&JsonBatchCodec::new());
    }

    #[cfg(feature = "bincode")]
    #[test]
    fn test_every_variant_survives_bincode() {
        assert_codec_keeps_types(&crate::journal::codec::BincodeBatchCodec::new());
    }

    #[test]
    fn test_every_variant_classifies_to_itself() {
        for entry_type in EntryType::ALL {
            let entry = sample(entry_type);
            assert_eq!(classify(&entry), entry_type);
            // repeated calls agree
            assert_eq!(classify(&entry), classify(&entry.clone()));
        }
    }

    #[test]
    fn test_codes_are_stable_and_unique() {
        let codes: Vec<i32> = EntryType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(
            codes,
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, -1]
        );
        for t in EntryType::ALL {
            assert_eq!(EntryType::from_code(t.code()), Some(t));
        }
    }

    #[test]
    fn test_duplicate_delete_file_code_is_rejected() {
        assert_eq!(EntryType::from_code(15), None);
        assert!("15".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_parse_by_name_and_code() {
        assert_eq!("update-inode".parse::<EntryType>(), Ok(EntryType::UpdateInode));
        assert_eq!("UPDATE_INODE".parse::<EntryType>(), Ok(EntryType::UpdateInode));
        assert_eq!("6".parse::<EntryType>(), Ok(EntryType::UpdateInode));
        assert_eq!("-1".parse::<EntryType>(), Ok(EntryType::Unmatched));
        let err = "truncate".parse::<EntryType>();
        assert!(err.is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for t in EntryType::ALL {
            assert_eq!(t.to_string().parse::<EntryType>(), Ok(t));
        }
    }

    #[test]
    fn test_deprecated_range() {
        assert!(!EntryType::UpdateInodeFile.is_deprecated());
        assert!(EntryType::AsyncPersistRequest.is_deprecated());
        assert!(EntryType::InodeDirectoryIdGenerator.is_deprecated());
        assert!(!EntryType::Unmatched.is_deprecated());
    }
}
