//! Integration tests: unified reads across loose and packed storage.
//!
//! Fixtures are built directly on disk: loose objects are zlib-compressed
//! framed bytes, packs and indices are assembled byte by byte with the
//! pack crate's encoding helpers.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gitro_hash::hasher::Hasher;
use gitro_hash::{FanoutTable, ObjectId};
use gitro_object::{Object, ObjectType, RawObject};
use gitro_odb::{ObjectDatabase, OdbError};
use gitro_pack::entry::encode_entry_header;
use gitro_pack::delta::{encode_copy, encode_insert, write_varint};
use gitro_pack::{PackError, IDX_SIGNATURE, IDX_VERSION, PACK_SIGNATURE, PACK_VERSION};

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = ZlibEncoder::new(&mut out, Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap();
    out
}

/// Write a loose object with the given framed bytes; returns its OID.
fn put_loose(objects_dir: &Path, framed: &[u8]) -> ObjectId {
    let oid = Hasher::digest(framed).unwrap();
    let hex = oid.to_hex();
    let dir = objects_dir.join(&hex[..2]);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(&hex[2..]), zlib(framed)).unwrap();
    oid
}

/// Raw pack entry bytes: either a whole object or a pre-encoded delta.
enum FixtureEntry<'a> {
    Whole { type_num: u8, content: &'a [u8], oid: ObjectId },
    RefDelta { base: ObjectId, delta: &'a [u8], oid: ObjectId },
}

/// Assemble a pack + v2 index under `objects/pack/pack-<name>`.
fn put_pack(objects_dir: &Path, name: &str, entries: &[FixtureEntry<'_>]) -> PathBuf {
    let pack_dir = objects_dir.join("pack");
    std::fs::create_dir_all(&pack_dir).unwrap();

    let mut pack_data = Vec::new();
    pack_data.extend_from_slice(PACK_SIGNATURE);
    pack_data.extend_from_slice(&PACK_VERSION.to_be_bytes());
    pack_data.extend_from_slice(&(entries.len() as u32).to_be_bytes());

    let mut index_entries: Vec<(ObjectId, u32)> = Vec::new();
    for entry in entries {
        let offset = pack_data.len() as u32;
        match entry {
            FixtureEntry::Whole {
                type_num,
                content,
                oid,
            } => {
                pack_data.extend_from_slice(&encode_entry_header(*type_num, content.len() as u64));
                pack_data.extend_from_slice(&zlib(content));
                index_entries.push((*oid, offset));
            }
            FixtureEntry::RefDelta { base, delta, oid } => {
                pack_data.extend_from_slice(&encode_entry_header(7, delta.len() as u64));
                pack_data.extend_from_slice(base.as_bytes());
                pack_data.extend_from_slice(&zlib(delta));
                index_entries.push((*oid, offset));
            }
        }
    }

    let pack_checksum = Hasher::digest(&pack_data).unwrap();
    pack_data.extend_from_slice(pack_checksum.as_bytes());

    let pack_path = pack_dir.join(format!("pack-{name}.pack"));
    std::fs::write(&pack_path, &pack_data).unwrap();

    // v2 index.
    index_entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut idx = Vec::new();
    idx.extend_from_slice(&IDX_SIGNATURE);
    idx.extend_from_slice(&IDX_VERSION.to_be_bytes());
    let oids: Vec<ObjectId> = index_entries.iter().map(|(oid, _)| *oid).collect();
    let fanout = FanoutTable::build(&oids);
    for b in 0..=255u8 {
        idx.extend_from_slice(&fanout.get(b).to_be_bytes());
    }
    for (oid, _) in &index_entries {
        idx.extend_from_slice(oid.as_bytes());
    }
    for _ in &index_entries {
        idx.extend_from_slice(&0u32.to_be_bytes());
    }
    for (_, offset) in &index_entries {
        idx.extend_from_slice(&offset.to_be_bytes());
    }
    idx.extend_from_slice(pack_checksum.as_bytes());
    let idx_checksum = Hasher::digest(&idx).unwrap();
    idx.extend_from_slice(idx_checksum.as_bytes());

    let idx_path = pack_dir.join(format!("pack-{name}.idx"));
    std::fs::write(&idx_path, &idx).unwrap();
    idx_path
}

#[test]
fn read_loose_object() {
    let dir = tempfile::tempdir().unwrap();
    let oid = put_loose(dir.path(), b"blob 6\0hello\n");

    let odb = ObjectDatabase::open(dir.path()).unwrap();
    let obj = odb.read(&oid).unwrap().expect("object should exist");
    match obj {
        Object::Blob(ref blob) => assert_eq!(blob.data, b"hello\n"),
        ref other => panic!("expected blob, got {:?}", other.object_type()),
    }
    assert!(odb.contains(&oid));
}

#[test]
fn read_packed_object() {
    let dir = tempfile::tempdir().unwrap();
    let content = b"packed object content\n";
    let oid = Hasher::hash_object("blob", content).unwrap();
    put_pack(
        dir.path(),
        "aaaa",
        &[FixtureEntry::Whole {
            type_num: 3,
            content,
            oid,
        }],
    );

    let odb = ObjectDatabase::open(dir.path()).unwrap();
    let raw = odb.read_raw(&oid).unwrap().expect("object should exist");
    assert_eq!(raw.obj_type, ObjectType::Blob);
    assert_eq!(raw.data, content);
}

#[test]
fn loose_preferred_over_packed() {
    let dir = tempfile::tempdir().unwrap();
    let oid = put_loose(dir.path(), b"blob 13\0loose version");
    // The same fingerprint also appears in a pack with different bytes;
    // the loose copy must win.
    put_pack(
        dir.path(),
        "bbbb",
        &[FixtureEntry::Whole {
            type_num: 3,
            content: b"packed version",
            oid,
        }],
    );

    let odb = ObjectDatabase::open(dir.path()).unwrap();
    let raw = odb.read_raw(&oid).unwrap().unwrap();
    assert_eq!(raw.data, b"loose version");
}

#[test]
fn missing_object_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let odb = ObjectDatabase::open(dir.path()).unwrap();
    let oid = ObjectId::from_hex("0000000000000000000000000000000000000000").unwrap();
    assert!(odb.read_raw(&oid).unwrap().is_none());
    assert!(!odb.contains(&oid));
}

#[test]
fn cache_survives_file_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let oid = put_loose(dir.path(), b"blob 8\0cache me");

    let odb = ObjectDatabase::open(dir.path()).unwrap();
    assert!(odb.read_raw(&oid).unwrap().is_some());

    // Remove the backing file; the memoized entry still answers.
    std::fs::remove_file(dir.path().join(oid.loose_path())).unwrap();
    let raw = odb.read_raw(&oid).unwrap().unwrap();
    assert_eq!(raw.data, b"cache me");
}

#[test]
fn ref_delta_base_in_other_pack() {
    let dir = tempfile::tempdir().unwrap();

    let base_content = b"shared base content";
    let base_oid = Hasher::hash_object("blob", base_content).unwrap();
    put_pack(
        dir.path(),
        "cccc",
        &[FixtureEntry::Whole {
            type_num: 3,
            content: base_content,
            oid: base_oid,
        }],
    );

    let target_content = b"shared base content v2";
    let target_oid = Hasher::hash_object("blob", target_content).unwrap();
    let mut delta = Vec::new();
    delta.extend_from_slice(&write_varint(base_content.len()));
    delta.extend_from_slice(&write_varint(target_content.len()));
    delta.extend_from_slice(&encode_copy(0, base_content.len()));
    delta.extend_from_slice(&encode_insert(b" v2"));
    put_pack(
        dir.path(),
        "dddd",
        &[FixtureEntry::RefDelta {
            base: base_oid,
            delta: &delta,
            oid: target_oid,
        }],
    );

    let odb = ObjectDatabase::open(dir.path()).unwrap();
    let raw = odb.read_raw(&target_oid).unwrap().unwrap();
    assert_eq!(raw.data, target_content);
}

#[test]
fn ref_delta_base_in_loose_storage() {
    let dir = tempfile::tempdir().unwrap();

    let base_oid = put_loose(dir.path(), b"blob 4\0base");
    let target_content = b"base!";
    let target_oid = Hasher::hash_object("blob", target_content).unwrap();

    let mut delta = Vec::new();
    delta.extend_from_slice(&write_varint(4));
    delta.extend_from_slice(&write_varint(target_content.len()));
    delta.extend_from_slice(&encode_copy(0, 4));
    delta.extend_from_slice(&encode_insert(b"!"));
    put_pack(
        dir.path(),
        "eeee",
        &[FixtureEntry::RefDelta {
            base: base_oid,
            delta: &delta,
            oid: target_oid,
        }],
    );

    let odb = ObjectDatabase::open(dir.path()).unwrap();
    let raw = odb.read_raw(&target_oid).unwrap().unwrap();
    assert_eq!(raw.data, target_content);
}

#[test]
fn orphaned_index_is_fatal_only_on_hit() {
    let dir = tempfile::tempdir().unwrap();

    let promised = b"promised object";
    let promised_oid = Hasher::hash_object("blob", promised).unwrap();
    let idx_path = put_pack(
        dir.path(),
        "ffff",
        &[FixtureEntry::Whole {
            type_num: 3,
            content: promised,
            oid: promised_oid,
        }],
    );
    // Drop the .pack half but keep the index.
    std::fs::remove_file(idx_path.with_extension("pack")).unwrap();

    let loose_oid = put_loose(dir.path(), b"blob 5\0other");

    let odb = ObjectDatabase::open(dir.path()).unwrap();

    // Objects not promised by the orphaned index still resolve.
    assert!(odb.read_raw(&loose_oid).unwrap().is_some());
    let absent = ObjectId::from_hex("1111111111111111111111111111111111111111").unwrap();
    assert!(odb.read_raw(&absent).unwrap().is_none());

    // An object the orphaned index promises is a hard error.
    let err = odb.read_raw(&promised_oid).unwrap_err();
    assert!(matches!(
        err,
        OdbError::Pack(PackError::MissingPackFile(_))
    ));
}

#[test]
fn corrupt_packed_object_payload_reported() {
    let dir = tempfile::tempdir().unwrap();
    // A commit whose payload is not a valid commit.
    let bogus = b"this is not a commit";
    let oid = Hasher::hash_object("commit", bogus).unwrap();
    put_pack(
        dir.path(),
        "abab",
        &[FixtureEntry::Whole {
            type_num: 1,
            content: bogus,
            oid,
        }],
    );

    let odb = ObjectDatabase::open(dir.path()).unwrap();
    // Raw read succeeds; typed decode flags corruption.
    assert!(odb.read_raw(&oid).unwrap().is_some());
    let err = odb.read(&oid).unwrap_err();
    assert!(matches!(err, OdbError::Corrupt { .. }));
}

#[test]
fn refresh_picks_up_new_packs() {
    let dir = tempfile::tempdir().unwrap();
    let odb = ObjectDatabase::open(dir.path()).unwrap();

    let content = b"late arrival";
    let oid = Hasher::hash_object("blob", content).unwrap();
    assert!(odb.read_raw(&oid).unwrap().is_none());

    put_pack(
        dir.path(),
        "1234",
        &[FixtureEntry::Whole {
            type_num: 3,
            content,
            oid,
        }],
    );
    odb.refresh().unwrap();

    let raw = odb.read_raw(&oid).unwrap().unwrap();
    assert_eq!(raw, RawObject::new(ObjectType::Blob, content.to_vec()));
}
