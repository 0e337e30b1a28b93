use std::path::PathBuf;

use gitro_hash::ObjectId;
use gitro_object::ObjectType;

/// Errors from repository-level operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a repository: {0}")]
    NotARepository(PathBuf),

    #[error("invalid gitdir pointer {path}: {reason}")]
    InvalidPointer { path: PathBuf, reason: String },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("object {oid} is a {actual}, expected a {expected}")]
    UnexpectedType {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error(transparent)]
    Odb(#[from] gitro_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] gitro_ref::RefError),

    #[error(transparent)]
    Object(#[from] gitro_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
