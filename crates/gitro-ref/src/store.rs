use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use gitro_hash::ObjectId;

use crate::error::RefError;
use crate::name::RefName;
use crate::packed::PackedRefs;
use crate::Reference;

/// Maximum depth for following symbolic ref chains.
const MAX_SYMREF_DEPTH: usize = 10;

/// Read-only files-backend ref store (loose refs + packed-refs).
///
/// Loose refs are individual files under the repository root; packed refs
/// live in `packed-refs`. Loose refs take precedence.
pub struct FilesRefStore {
    git_dir: PathBuf,
}

impl FilesRefStore {
    /// Create a ref store over the given repository directory.
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    /// The repository directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Resolve a ref name to a Reference (may be Direct or Symbolic).
    pub fn resolve(&self, name: &RefName) -> Result<Option<Reference>, RefError> {
        match self.read_loose_ref(name)? {
            Some(r) => Ok(Some(r)),
            None => {
                let packed = PackedRefs::load(&self.git_dir)?;
                Ok(packed.find(name).map(|pr| Reference::Direct {
                    name: pr.name.clone(),
                    target: pr.oid,
                }))
            }
        }
    }

    /// Resolve a ref name to its final OID, following symbolic chains.
    pub fn resolve_to_oid(&self, name: &RefName) -> Result<Option<ObjectId>, RefError> {
        self.resolve_inner(name, 0)
    }

    /// Resolve a branch or tag tip by (possibly short) name.
    ///
    /// A name containing `/` is looked up as-is; otherwise
    /// `refs/heads/<name>` is tried before `refs/tags/<name>`. Loose
    /// candidates are consulted first; the packed-refs scan then takes the
    /// first line naming any candidate.
    pub fn tip(&self, name: &str) -> Result<ObjectId, RefError> {
        let candidates: Vec<RefName> = if name.contains('/') {
            vec![RefName::new(name)?]
        } else {
            vec![
                RefName::new(format!("refs/heads/{name}"))?,
                RefName::new(format!("refs/tags/{name}"))?,
            ]
        };

        for candidate in &candidates {
            match self.read_loose_ref(candidate)? {
                Some(Reference::Direct { target, .. }) => return Ok(target),
                Some(Reference::Symbolic { target, .. }) => {
                    if let Some(oid) = self.resolve_inner(&target, 1)? {
                        return Ok(oid);
                    }
                }
                None => {}
            }
        }

        let packed = PackedRefs::load(&self.git_dir)?;
        if let Some(pr) = packed.find_any(&candidates) {
            return Ok(pr.oid);
        }

        Err(RefError::NotFound(name.to_string()))
    }

    /// Read `HEAD`: symbolic (`ref: <name>`) or detached (bare hex).
    ///
    /// Returns `None` when `HEAD` does not exist.
    pub fn head(&self) -> Result<Option<Reference>, RefError> {
        let head = RefName::new("HEAD")?;
        self.read_loose_ref(&head)
    }

    /// Resolve `HEAD` to an OID, following an indirect head to its branch.
    ///
    /// `None` when `HEAD` is missing or points at an unborn branch.
    pub fn head_oid(&self) -> Result<Option<ObjectId>, RefError> {
        match self.head()? {
            Some(Reference::Direct { target, .. }) => Ok(Some(target)),
            Some(Reference::Symbolic { target, .. }) => self.resolve_to_oid(&target),
            None => Ok(None),
        }
    }

    /// List all refs: every regular file under `refs/heads` and
    /// `refs/tags`, merged with every packed-refs entry. Loose entries
    /// shadow packed ones of the same name.
    pub fn list_refs(&self) -> Result<BTreeMap<String, ObjectId>, RefError> {
        let mut out = BTreeMap::new();

        for prefix in ["refs/heads", "refs/tags"] {
            let base = self.git_dir.join(prefix);
            self.collect_loose(&base, prefix, &mut out)?;
        }

        let packed = PackedRefs::load(&self.git_dir)?;
        for pr in packed.refs() {
            out.entry(pr.name.as_str().to_string()).or_insert(pr.oid);
        }

        Ok(out)
    }

    /// List tags keyed by short name.
    pub fn list_tags(&self) -> Result<BTreeMap<String, ObjectId>, RefError> {
        let refs = self.list_refs()?;
        Ok(refs
            .into_iter()
            .filter_map(|(name, oid)| {
                name.strip_prefix("refs/tags/")
                    .map(|short| (short.to_string(), oid))
            })
            .collect())
    }

    /// Read a loose ref file. The path must be a regular file.
    fn read_loose_ref(&self, name: &RefName) -> Result<Option<Reference>, RefError> {
        let path = self.git_dir.join(name.as_str());
        if !path.is_file() {
            return Ok(None);
        }

        let contents = fs::read(&path).map_err(|e| RefError::IoPath {
            path: path.clone(),
            source: e,
        })?;
        let trimmed = contents.trim();

        if let Some(target_bytes) = trimmed.strip_prefix(b"ref: ") {
            let target_str = std::str::from_utf8(target_bytes.trim())
                .map_err(|_| RefError::Parse("invalid UTF-8 in symbolic ref target".into()))?;
            let target = RefName::new(target_str)?;
            Ok(Some(Reference::Symbolic {
                name: name.clone(),
                target,
            }))
        } else {
            let hex = std::str::from_utf8(trimmed)
                .map_err(|_| RefError::Parse("invalid UTF-8 in ref OID".into()))?;
            let oid = ObjectId::from_hex(hex)?;
            Ok(Some(Reference::Direct {
                name: name.clone(),
                target: oid,
            }))
        }
    }

    fn resolve_inner(&self, name: &RefName, depth: usize) -> Result<Option<ObjectId>, RefError> {
        if depth > MAX_SYMREF_DEPTH {
            return Err(RefError::SymrefLoop(name.to_string()));
        }

        match self.read_loose_ref(name)? {
            Some(Reference::Direct { target, .. }) => Ok(Some(target)),
            Some(Reference::Symbolic { target, .. }) => self.resolve_inner(&target, depth + 1),
            None => {
                let packed = PackedRefs::load(&self.git_dir)?;
                Ok(packed.find(name).map(|pr| pr.oid))
            }
        }
    }

    /// Recursively collect loose ref files under `dir` into `out`,
    /// skipping lock files and names that fail validation.
    fn collect_loose(
        &self,
        dir: &Path,
        prefix: &str,
        out: &mut BTreeMap<String, ObjectId>,
    ) -> Result<(), RefError> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(RefError::IoPath {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| RefError::IoPath {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let child = format!("{prefix}/{file_name}");

            if path.is_dir() {
                self.collect_loose(&path, &child, out)?;
            } else if path.is_file() {
                if file_name.ends_with(".lock") {
                    continue;
                }
                let Ok(name) = RefName::new(child.as_str()) else {
                    continue;
                };
                match self.read_loose_ref(&name)? {
                    Some(Reference::Direct { target, .. }) => {
                        out.insert(child, target);
                    }
                    Some(Reference::Symbolic { target, .. }) => {
                        if let Some(oid) = self.resolve_inner(&target, 1)? {
                            out.insert(child, oid);
                        }
                    }
                    None => {}
                }
            }
        }

        Ok(())
    }
}
