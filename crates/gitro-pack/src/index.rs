//! Pack index reading and lookup, formats v1 and v2.
//!
//! The index maps fingerprints to pack offsets via a 256-entry fan-out
//! table over a sorted fingerprint list.
//!
//! ```text
//! v1:  fanout (256 × u32 be) | N × (u32 be offset, 20-byte oid) | trailer
//! v2:  \xff tOc | version (u32 = 2) | fanout | N × oid | N × crc32
//!      | N × u32 offset | optional 64-bit table | trailer
//! ```
//!
//! Both trailers are 20 + 20 bytes of checksums, which this reader does
//! not verify. A v2 offset with its high bit set indexes the 64-bit
//! table; such packs are rejected.

use std::path::{Path, PathBuf};

use gitro_hash::{FanoutTable, ObjectId};
use memmap2::Mmap;

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

const FANOUT_SIZE: usize = 1024;
const TRAILER_SIZE: usize = 40;
const OID_LEN: usize = 20;
/// v1 records are (offset, oid) pairs.
const V1_RECORD_SIZE: usize = 4 + OID_LEN;

/// Pack index providing fingerprint → offset lookup.
#[derive(Debug)]
pub struct PackIndex {
    data: Mmap,
    version: u32,
    num_objects: u32,
    fanout: FanoutTable,
    idx_path: PathBuf,
}

impl PackIndex {
    /// Open a pack index file, sniffing the format version.
    pub fn open(idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = idx_path.as_ref().to_path_buf();
        let file = std::fs::File::open(&idx_path)?;
        let data = unsafe { Mmap::map(&file)? };

        // v2+ indices start with a magic that can never begin a valid v1
        // fan-out table in practice; everything else is v1.
        let (version, fanout_base) = if data.len() >= 8 && data[0..4] == IDX_SIGNATURE {
            let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
            if version != IDX_VERSION {
                return Err(PackError::UnsupportedIndexVersion(version));
            }
            (version, 8)
        } else {
            (1, 0)
        };

        if data.len() < fanout_base + FANOUT_SIZE + TRAILER_SIZE {
            return Err(PackError::InvalidIndex("file too small".into()));
        }

        let fanout = FanoutTable::from_bytes(&data[fanout_base..fanout_base + FANOUT_SIZE])
            .map_err(|e| PackError::InvalidIndex(e.to_string()))?;
        let num_objects = fanout.total();

        let n = num_objects as usize;
        let min_size = match version {
            1 => FANOUT_SIZE + n * V1_RECORD_SIZE + TRAILER_SIZE,
            _ => 8 + FANOUT_SIZE + n * (OID_LEN + 4 + 4) + TRAILER_SIZE,
        };
        if data.len() < min_size {
            return Err(PackError::InvalidIndex(format!(
                "file too small: {} < {min_size}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            version,
            num_objects,
            fanout,
            idx_path,
        })
    }

    /// Look up a fingerprint, returning the offset in the pack file.
    ///
    /// Binary-searches the fan-out window; `Ok(None)` means the object is
    /// not in this pack.
    pub fn lookup(&self, oid: &ObjectId) -> Result<Option<u64>, PackError> {
        let range = self.fanout.range(oid.first_byte());
        let target = oid.as_bytes();

        let mut low = range.start;
        let mut high = range.end;
        while low < high {
            let mid = low + (high - low) / 2;
            match self.oid_bytes_at(mid).cmp(target) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return self.offset_at(mid).map(Some),
            }
        }
        Ok(None)
    }

    /// Get the OID at the given sorted index position.
    pub fn oid_at(&self, index: u32) -> ObjectId {
        ObjectId::from_bytes(self.oid_bytes_at(index as usize)).expect("valid OID in index")
    }

    /// Get the pack file offset at the given sorted index position.
    pub fn offset_at(&self, index: usize) -> Result<u64, PackError> {
        match self.version {
            1 => {
                let pos = FANOUT_SIZE + index * V1_RECORD_SIZE;
                Ok(u64::from(self.read_u32(pos)))
            }
            _ => {
                let pos = self.v2_offsets_base() + index * 4;
                let raw = self.read_u32(pos);
                if raw & 0x8000_0000 != 0 {
                    // High bit marks a 64-bit table entry.
                    return Err(PackError::UnsupportedLargeOffset { offset: raw });
                }
                Ok(u64::from(raw))
            }
        }
    }

    /// Total number of objects in this index.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Index format version (1 or 2).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Path to the .idx file.
    pub fn path(&self) -> &Path {
        &self.idx_path
    }

    fn oid_bytes_at(&self, index: usize) -> &[u8] {
        let start = match self.version {
            1 => FANOUT_SIZE + index * V1_RECORD_SIZE + 4,
            _ => 8 + FANOUT_SIZE + index * OID_LEN,
        };
        &self.data[start..start + OID_LEN]
    }

    fn v2_offsets_base(&self) -> usize {
        // Fan-out, then the oid column, then the crc32 column.
        8 + FANOUT_SIZE + self.num_objects as usize * (OID_LEN + 4)
    }

    fn read_u32(&self, pos: usize) -> u32 {
        u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ])
    }
}
