//! Unified object database: a single read path across loose storage and
//! packfiles.
//!
//! Lookup order is cache → loose → packs. Pack-level misses are ordinary
//! results; the only errors that surface are real format or I/O problems.
//! Resolved objects are memoized for the life of the database.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use gitro_hash::ObjectId;
use gitro_loose::LooseStore;
use gitro_object::{Object, RawObject, RawObjectCache};
use gitro_pack::index::PackIndex;
use gitro_pack::pack::PackFile;
use gitro_pack::PackError;

/// Errors from object database operations.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("corrupt object {oid}: {reason}")]
    Corrupt { oid: ObjectId, reason: String },

    #[error(transparent)]
    Loose(#[from] gitro_loose::LooseError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One discovered pack.
///
/// An index whose `.pack` half has vanished stays usable for probing; it
/// only becomes an error when a lookup actually hits it.
enum PackSlot {
    Ready(PackFile),
    IndexOnly { index: PackIndex, pack_path: PathBuf },
}

/// Unified object database over one objects directory.
pub struct ObjectDatabase {
    loose: LooseStore,
    packs: RwLock<Vec<PackSlot>>,
    cache: Mutex<RawObjectCache>,
    objects_dir: PathBuf,
}

impl ObjectDatabase {
    /// Open the object database at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let loose = LooseStore::open(&objects_dir);
        let packs = Self::discover_packs(&objects_dir)?;

        Ok(Self {
            loose,
            packs: RwLock::new(packs),
            cache: Mutex::new(RawObjectCache::new()),
            objects_dir,
        })
    }

    /// Read a raw object by fingerprint, consulting the cache, then loose
    /// storage, then each pack.
    ///
    /// Returns `Ok(None)` when the object exists nowhere.
    pub fn read_raw(&self, oid: &ObjectId) -> Result<Option<RawObject>, OdbError> {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(raw) = cache.get(oid) {
                return Ok(Some(raw.clone()));
            }
        }

        let raw = self.read_uncached(oid)?;

        if let Some(ref raw) = raw {
            let mut cache = self.cache.lock().unwrap();
            cache.insert(*oid, raw.clone());
        }

        Ok(raw)
    }

    /// Read and decode an object by fingerprint.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        match self.read_raw(oid)? {
            Some(raw) => {
                let obj = raw.decode().map_err(|e| OdbError::Corrupt {
                    oid: *oid,
                    reason: e.to_string(),
                })?;
                Ok(Some(obj))
            }
            None => Ok(None),
        }
    }

    /// Check if an object exists (index probes only, no decompression).
    pub fn contains(&self, oid: &ObjectId) -> bool {
        if self.cache.lock().unwrap().contains(oid) || self.loose.contains(oid) {
            return true;
        }
        let packs = self.packs.read().unwrap();
        packs.iter().any(|slot| match slot {
            PackSlot::Ready(pack) => pack.contains(oid),
            PackSlot::IndexOnly { index, .. } => matches!(index.lookup(oid), Ok(Some(_))),
        })
    }

    /// Re-discover pack files (after an external repack).
    pub fn refresh(&self) -> Result<(), OdbError> {
        let new_packs = Self::discover_packs(&self.objects_dir)?;
        let mut packs = self.packs.write().unwrap();
        *packs = new_packs;
        Ok(())
    }

    /// Path to the objects directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    fn read_uncached(&self, oid: &ObjectId) -> Result<Option<RawObject>, OdbError> {
        // 1. Loose objects win over packed copies.
        if let Some(raw) = self.loose.read(oid)? {
            return Ok(Some(raw));
        }

        // 2. Packs, in discovery order. REF_DELTA bases may live in another
        //    pack or loose storage, so each pack gets a cross-pack resolver.
        let packs = self.packs.read().unwrap();
        for slot in packs.iter() {
            match slot {
                PackSlot::Ready(pack) => {
                    let resolver = |base_oid: &ObjectId| -> Option<RawObject> {
                        if let Ok(Some(raw)) = self.loose.read(base_oid) {
                            return Some(raw);
                        }
                        for other in packs.iter() {
                            let PackSlot::Ready(other_pack) = other else {
                                continue;
                            };
                            if std::ptr::eq(other_pack, pack) {
                                continue;
                            }
                            if let Ok(Some(raw)) = other_pack.read_object(base_oid) {
                                return Some(raw);
                            }
                        }
                        None
                    };
                    if let Some(raw) = pack.read_object_with_resolver(oid, resolver)? {
                        return Ok(Some(raw));
                    }
                }
                PackSlot::IndexOnly { index, pack_path } => {
                    // The object is promised by this index but its pack is
                    // gone; that breaks the idx/pack pairing invariant.
                    if index.lookup(oid)?.is_some() {
                        return Err(PackError::MissingPackFile(pack_path.clone()).into());
                    }
                }
            }
        }

        Ok(None)
    }

    /// Discover packs via `objects/pack/*.idx`.
    fn discover_packs(objects_dir: &Path) -> Result<Vec<PackSlot>, OdbError> {
        let pack_dir = objects_dir.join("pack");
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<_> = std::fs::read_dir(&pack_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "idx"))
            .collect();

        // Newest first, matching C git's preference for fresh packs.
        entries.sort_by(|a, b| {
            let a_time = a.metadata().and_then(|m| m.modified()).ok();
            let b_time = b.metadata().and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        let mut packs = Vec::new();
        for entry in entries {
            let idx_path = entry.path();
            match PackFile::open(&idx_path) {
                Ok(pack) => packs.push(PackSlot::Ready(pack)),
                Err(PackError::MissingPackFile(pack_path)) => {
                    match PackIndex::open(&idx_path) {
                        Ok(index) => packs.push(PackSlot::IndexOnly { index, pack_path }),
                        // Index vanished as well; a repack finished.
                        Err(PackError::Io(e))
                            if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                // The whole pack vanished between listing and opening: a
                // concurrent repack replaced it; it contributes no match.
                Err(PackError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(packs)
    }
}
