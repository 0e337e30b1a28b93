use std::fs;
use std::path::Path;

use bstr::ByteSlice;
use gitro_hash::ObjectId;

use crate::error::RefError;
use crate::name::RefName;

/// A single entry in the packed-refs file.
#[derive(Debug, Clone)]
pub struct PackedRef {
    pub name: RefName,
    pub oid: ObjectId,
    /// Peeled target of an annotated tag, from a `^` continuation line.
    pub peeled: Option<ObjectId>,
}

/// Parsed packed-refs file.
///
/// Refs that have been packed out of loose files live here, one per line:
/// ```text
/// # pack-refs with: peeled fully-peeled sorted
/// <hex-oid> <refname>
/// ^<hex-oid>   (peeled value of the annotated tag above)
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackedRefs {
    refs: Vec<PackedRef>,
}

impl PackedRefs {
    /// Parse a packed-refs file.
    ///
    /// `#` comment lines are skipped; `^` peeled lines attach to the entry
    /// they follow.
    pub fn parse(data: &[u8]) -> Result<Self, RefError> {
        let mut refs: Vec<PackedRef> = Vec::new();

        for line in data.lines() {
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }

            if line.starts_with(b"^") {
                let hex = std::str::from_utf8(&line[1..])
                    .map_err(|_| RefError::Parse("invalid UTF-8 in peeled OID".into()))?;
                let peeled_oid = ObjectId::from_hex(hex.trim())?;
                if let Some(last) = refs.last_mut() {
                    last.peeled = Some(peeled_oid);
                }
                continue;
            }

            let space_pos = line
                .find_byte(b' ')
                .ok_or_else(|| RefError::Parse("invalid packed-refs line".into()))?;

            let hex = std::str::from_utf8(&line[..space_pos])
                .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs OID".into()))?;
            let oid = ObjectId::from_hex(hex)?;

            let name_str = std::str::from_utf8(&line[space_pos + 1..])
                .map_err(|_| RefError::Parse("invalid UTF-8 in packed-refs name".into()))?;
            let name = RefName::new(name_str.trim())?;

            refs.push(PackedRef {
                name,
                oid,
                peeled: None,
            });
        }

        Ok(Self { refs })
    }

    /// Load packed-refs from disk. A missing file is an empty set.
    pub fn load(git_dir: &Path) -> Result<Self, RefError> {
        let path = git_dir.join("packed-refs");
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(RefError::IoPath { path, source: e }),
        };
        Self::parse(&data)
    }

    /// Look up a ref by name.
    pub fn find(&self, name: &RefName) -> Option<&PackedRef> {
        self.refs.iter().find(|pr| pr.name == *name)
    }

    /// First entry, in file order, whose name is any of `candidates`.
    pub fn find_any<'a>(&'a self, candidates: &[RefName]) -> Option<&'a PackedRef> {
        self.refs
            .iter()
            .find(|pr| candidates.iter().any(|c| *c == pr.name))
    }

    /// All entries in file order.
    pub fn refs(&self) -> &[PackedRef] {
        &self.refs
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
