//! Packfile reading: index lookup, entry decoding, and delta resolution.
//!
//! A pack aggregates many objects in one file, some stored whole and some
//! as deltas against earlier entries. The companion `.idx` file maps
//! fingerprints to pack offsets through a fan-out table over a sorted
//! fingerprint list. This crate reads both, including the legacy v1 index
//! layout; it never writes packs.

pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;

use std::path::PathBuf;

use gitro_hash::ObjectId;
use gitro_object::ObjectType;

/// Errors that can occur while reading packs.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("unsupported pack version: {0}")]
    UnsupportedPackVersion(u32),

    #[error("invalid pack index: {0}")]
    InvalidIndex(String),

    #[error("unsupported pack index version: {0}")]
    UnsupportedIndexVersion(u32),

    #[error("pack offset {offset:#x} requires the 64-bit offset table (packs over 2 GiB are unsupported)")]
    UnsupportedLargeOffset { offset: u32 },

    #[error("unknown pack entry type {type_num} at offset {offset}")]
    UnknownEntryType { type_num: u8, offset: u64 },

    #[error("invalid delta at offset {offset}: {reason}")]
    InvalidDelta { offset: u64, reason: String },

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error("delta chain too deep (>{max_depth} levels) at offset {offset}")]
    DeltaChainTooDeep { offset: u64, max_depth: usize },

    #[error("corrupt pack entry at offset {0}")]
    CorruptEntry(u64),

    #[error("pack index has no matching pack file: {0}")]
    MissingPackFile(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] gitro_hash::HashError),
}

/// Type of a packed object entry, as encoded in entry headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta whose base starts earlier in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta whose base is named by fingerprint (may live anywhere).
    RefDelta { base_oid: ObjectId },
}

impl PackEntryType {
    /// Convert a non-delta pack entry type to an ObjectType.
    pub fn to_object_type(self) -> Option<ObjectType> {
        match self {
            Self::Commit => Some(ObjectType::Commit),
            Self::Tree => Some(ObjectType::Tree),
            Self::Blob => Some(ObjectType::Blob),
            Self::Tag => Some(ObjectType::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }

    /// Wire code as used in pack entry headers.
    pub fn type_number(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
            Self::OfsDelta { .. } => 6,
            Self::RefDelta { .. } => 7,
        }
    }
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index constants. A v1 index has no header; v2 starts with the
/// signature below.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const IDX_VERSION: u32 = 2;

/// Maximum delta chain depth before we bail out. Repository layout
/// convention keeps real chains well under 50.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 64;
