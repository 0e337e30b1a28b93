use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use gitro_hash::hasher::Hasher;
use gitro_hash::ObjectId;
use gitro_object::{header, RawObject};

use crate::{LooseError, LooseStore};

impl LooseStore {
    /// Check if a loose object exists.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).is_file()
    }

    /// Read a loose object by OID.
    ///
    /// Returns `Ok(None)` if the object does not exist. The header's size
    /// field must equal the payload length exactly; anything else is a
    /// corrupt object.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<RawObject>, LooseError> {
        let path = self.object_path(oid);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let decompressed = decompress_all(&compressed, oid)?;
        Ok(Some(split_framed(&decompressed, oid)?))
    }

    /// Read a loose object and verify that the framing fingerprint matches
    /// the requested OID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    pub fn read_verified(&self, oid: &ObjectId) -> Result<Option<RawObject>, LooseError> {
        let path = self.object_path(oid);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let decompressed = decompress_all(&compressed, oid)?;

        // Hash of the raw decompressed data (header + content).
        let actual_oid = Hasher::digest(&decompressed)?;
        if actual_oid != *oid {
            return Err(LooseError::HashMismatch {
                path,
                expected: oid.to_hex(),
                actual: actual_oid.to_hex(),
            });
        }

        Ok(Some(split_framed(&decompressed, oid)?))
    }
}

/// Split framed bytes into a `RawObject`, enforcing the size field.
fn split_framed(decompressed: &[u8], oid: &ObjectId) -> Result<RawObject, LooseError> {
    let (obj_type, content_size, header_len) = header::parse_header(decompressed)?;
    let payload = &decompressed[header_len..];
    if payload.len() != content_size {
        return Err(LooseError::Corrupt {
            oid: oid.to_hex(),
            reason: format!(
                "header says {content_size} bytes, payload is {}",
                payload.len()
            ),
        });
    }
    Ok(RawObject::new(obj_type, payload.to_vec()))
}

/// Zlib-decompress the full contents of a loose object file.
fn decompress_all(compressed: &[u8], oid: &ObjectId) -> Result<Vec<u8>, LooseError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| LooseError::Decompress {
            oid: oid.to_hex(),
            source: e,
        })?;
    Ok(decompressed)
}
