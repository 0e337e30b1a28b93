//! Reading `.pack` files: decompression and delta-chain resolution.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::bufread::ZlibDecoder;
use gitro_hash::ObjectId;
use gitro_object::RawObject;
use memmap2::Mmap;

use crate::entry::parse_entry_header;
use crate::index::PackIndex;
use crate::{
    PackEntryType, PackError, MAX_DELTA_CHAIN_DEPTH, PACK_HEADER_SIZE, PACK_SIGNATURE,
    PACK_VERSION,
};

/// A memory-mapped packfile with its index.
#[derive(Debug)]
pub struct PackFile {
    data: Mmap,
    index: PackIndex,
    pack_path: PathBuf,
    num_objects: u32,
}

impl PackFile {
    /// Open a pack from its `.idx` path.
    ///
    /// The `.pack` half is derived by swapping the extension; an index
    /// whose pack file is gone is unusable and reported as
    /// `MissingPackFile`.
    pub fn open(idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = idx_path.as_ref();
        let index = PackIndex::open(idx_path)?;
        let pack_path = idx_path.with_extension("pack");

        let file = match std::fs::File::open(&pack_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PackError::MissingPackFile(pack_path));
            }
            Err(e) => return Err(PackError::Io(e)),
        };
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE {
            return Err(PackError::InvalidHeader("file too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedPackVersion(version));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        if index.num_objects() != num_objects {
            return Err(PackError::InvalidHeader(format!(
                "pack has {} objects but index has {}",
                num_objects,
                index.num_objects()
            )));
        }

        Ok(Self {
            data,
            index,
            pack_path,
            num_objects,
        })
    }

    /// Read an object by fingerprint.
    ///
    /// Returns `None` if the fingerprint is not in this pack.
    pub fn read_object(&self, oid: &ObjectId) -> Result<Option<RawObject>, PackError> {
        self.read_object_with_resolver(oid, |_| None)
    }

    /// Read an object by fingerprint, with an external resolver for
    /// REF_DELTA bases that live outside this pack.
    pub fn read_object_with_resolver(
        &self,
        oid: &ObjectId,
        resolver: impl Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<Option<RawObject>, PackError> {
        match self.index.lookup(oid)? {
            Some(offset) => self.read_at_offset_with_resolver(offset, resolver).map(Some),
            None => Ok(None),
        }
    }

    /// Read the entry at a known offset, resolving delta chains.
    pub fn read_at_offset(&self, offset: u64) -> Result<RawObject, PackError> {
        self.read_at_offset_with_resolver(offset, |_| None)
    }

    /// Read an entry at a known offset with an external REF_DELTA resolver.
    ///
    /// Delta chains are collected iteratively (innermost delta first) and
    /// applied in reverse once the base is reached; chain depth in real
    /// repositories stays far below the cap.
    pub fn read_at_offset_with_resolver(
        &self,
        offset: u64,
        resolver: impl Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<RawObject, PackError> {
        let mut chain: Vec<Vec<u8>> = Vec::new();
        let mut current_offset = offset;

        for _depth in 0..MAX_DELTA_CHAIN_DEPTH {
            if current_offset as usize >= self.data.len() {
                return Err(PackError::CorruptEntry(current_offset));
            }
            let entry =
                parse_entry_header(&self.data[current_offset as usize..], current_offset)?;
            if entry.data_offset as usize > self.data.len() {
                return Err(PackError::CorruptEntry(current_offset));
            }

            let compressed = &self.data[entry.data_offset as usize..];
            let decompressed =
                decompress(compressed, entry.uncompressed_size, current_offset)?;

            match entry.entry_type {
                PackEntryType::Commit
                | PackEntryType::Tree
                | PackEntryType::Blob
                | PackEntryType::Tag => {
                    let obj_type = entry.entry_type.to_object_type().expect("non-delta type");

                    let mut data = decompressed;
                    for delta in chain.iter().rev() {
                        data = crate::delta::apply_delta(&data, delta)?;
                    }
                    return Ok(RawObject::new(obj_type, data));
                }
                PackEntryType::OfsDelta { base_offset } => {
                    chain.push(decompressed);
                    current_offset = base_offset;
                }
                PackEntryType::RefDelta { base_oid } => {
                    chain.push(decompressed);
                    // The base may sit in this pack, another pack, or loose.
                    if let Some(base_offset) = self.index.lookup(&base_oid)? {
                        current_offset = base_offset;
                    } else if let Some(base) = resolver(&base_oid) {
                        let mut data = base.data;
                        let obj_type = base.obj_type;
                        for delta in chain.iter().rev() {
                            data = crate::delta::apply_delta(&data, delta)?;
                        }
                        return Ok(RawObject::new(obj_type, data));
                    } else {
                        return Err(PackError::MissingBase(base_oid));
                    }
                }
            }
        }

        Err(PackError::DeltaChainTooDeep {
            offset,
            max_depth: MAX_DELTA_CHAIN_DEPTH,
        })
    }

    /// Check if this pack contains the given fingerprint.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        matches!(self.index.lookup(oid), Ok(Some(_)))
    }

    /// Number of objects in this pack.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// The pack index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Path to the .pack file.
    pub fn path(&self) -> &Path {
        &self.pack_path
    }
}

/// Decompress exactly `expected_size` bytes of zlib data.
///
/// The compressed length is not recorded in the pack, so decompression is
/// bounded by the entry header's declared size rather than by input length.
fn decompress(
    compressed: &[u8],
    expected_size: usize,
    offset: u64,
) -> Result<Vec<u8>, PackError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut buf = vec![0u8; expected_size];
    decoder
        .read_exact(&mut buf)
        .map_err(|_| PackError::CorruptEntry(offset))?;
    Ok(buf)
}
