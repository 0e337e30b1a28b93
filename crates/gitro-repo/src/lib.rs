//! Repository facade: discovery plus read access to objects and refs.
//!
//! A `Repository` ties the object database and the ref store together over
//! one on-disk repository and carries the convenience operations callers
//! actually use: fetch an object by fingerprint, resolve a branch or tag
//! tip, read `HEAD`, list refs, and `describe` a commit.

mod describe;
mod discover;
mod error;

pub use error::RepoError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gitro_hash::ObjectId;
use gitro_object::{Commit, Object, ObjectType, RawObject, Tag};
use gitro_odb::ObjectDatabase;
use gitro_ref::{FilesRefStore, RefName, Reference};

/// Default number of hex digits for abbreviated fingerprints.
pub const DEFAULT_ABBREV: usize = 7;

/// The state of `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// `HEAD` names a branch (`ref: refs/heads/...`).
    Branch(RefName),
    /// `HEAD` holds a bare fingerprint.
    Detached(ObjectId),
}

/// A read-only handle to an on-disk git repository.
pub struct Repository {
    git_dir: PathBuf,
    odb: ObjectDatabase,
    refs: FilesRefStore,
}

impl Repository {
    /// Open the repository at `path`.
    ///
    /// `path` may be the repository directory itself or a `gitdir:`
    /// pointer file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let git_dir = discover::resolve_repo_path(path.as_ref())?;
        let odb = ObjectDatabase::open(git_dir.join("objects"))?;
        let refs = FilesRefStore::new(&git_dir);

        Ok(Self {
            git_dir,
            odb,
            refs,
        })
    }

    /// Path to the repository directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Access the object database.
    pub fn odb(&self) -> &ObjectDatabase {
        &self.odb
    }

    /// Access the ref store.
    pub fn refs(&self) -> &FilesRefStore {
        &self.refs
    }

    /// Fetch an object's raw (type, bytes) pair by fingerprint.
    pub fn get_raw(&self, oid: &ObjectId) -> Result<RawObject, RepoError> {
        self.odb
            .read_raw(oid)?
            .ok_or(RepoError::ObjectNotFound(*oid))
    }

    /// Fetch and decode an object by fingerprint.
    pub fn get_object(&self, oid: &ObjectId) -> Result<Object, RepoError> {
        self.odb.read(oid)?.ok_or(RepoError::ObjectNotFound(*oid))
    }

    /// Fetch a commit, failing on any other object type.
    pub fn commit(&self, oid: &ObjectId) -> Result<Commit, RepoError> {
        match self.get_object(oid)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(RepoError::UnexpectedType {
                oid: *oid,
                expected: ObjectType::Commit,
                actual: other.object_type(),
            }),
        }
    }

    /// Fetch an annotated tag, failing on any other object type.
    pub fn tag(&self, oid: &ObjectId) -> Result<Tag, RepoError> {
        match self.get_object(oid)? {
            Object::Tag(tag) => Ok(tag),
            other => Err(RepoError::UnexpectedType {
                oid: *oid,
                expected: ObjectType::Tag,
                actual: other.object_type(),
            }),
        }
    }

    /// Resolve a branch or tag name to its tip fingerprint.
    ///
    /// A short name tries `refs/heads/<name>` then `refs/tags/<name>`; a
    /// name containing `/` is used verbatim.
    pub fn tip(&self, name: &str) -> Result<ObjectId, RepoError> {
        Ok(self.refs.tip(name)?)
    }

    /// Read `HEAD` without resolving the branch it names.
    ///
    /// `None` when the repository has no `HEAD` file.
    pub fn head(&self) -> Result<Option<Head>, RepoError> {
        Ok(self.refs.head()?.map(|r| match r {
            Reference::Symbolic { target, .. } => Head::Branch(target),
            Reference::Direct { target, .. } => Head::Detached(target),
        }))
    }

    /// Resolve `HEAD` to a fingerprint.
    ///
    /// `None` when `HEAD` is missing or the branch it names is unborn.
    pub fn head_oid(&self) -> Result<Option<ObjectId>, RepoError> {
        Ok(self.refs.head_oid()?)
    }

    /// List all refs (loose shadowing packed), sorted by name.
    pub fn list_refs(&self) -> Result<BTreeMap<String, ObjectId>, RepoError> {
        Ok(self.refs.list_refs()?)
    }

    /// List tags keyed by short name.
    pub fn list_tags(&self) -> Result<BTreeMap<String, ObjectId>, RepoError> {
        Ok(self.refs.list_tags()?)
    }

    /// Describe a commit by the nearest reachable annotated tag, with the
    /// default abbreviation width.
    pub fn describe(&self, commit: &ObjectId) -> Result<String, RepoError> {
        self.describe_abbrev(commit, DEFAULT_ABBREV)
    }

    /// Describe a commit with a custom abbreviation width.
    pub fn describe_abbrev(&self, commit: &ObjectId, abbrev: usize) -> Result<String, RepoError> {
        describe::describe(self, *commit, abbrev)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("git_dir", &self.git_dir)
            .finish_non_exhaustive()
    }
}
