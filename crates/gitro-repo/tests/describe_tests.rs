//! Integration tests: describing commits against annotated tags.

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gitro_hash::hasher::Hasher;
use gitro_hash::ObjectId;
use gitro_repo::Repository;

const TREE_HEX: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Write a loose object from framed bytes; returns its fingerprint.
fn put_loose(git_dir: &Path, framed: &[u8]) -> ObjectId {
    let oid = Hasher::digest(framed).unwrap();
    let hex = oid.to_hex();
    let dir = git_dir.join("objects").join(&hex[..2]);
    fs::create_dir_all(&dir).unwrap();

    let mut compressed = Vec::new();
    {
        let mut enc = ZlibEncoder::new(&mut compressed, Compression::default());
        enc.write_all(framed).unwrap();
        enc.finish().unwrap();
    }
    fs::write(dir.join(&hex[2..]), compressed).unwrap();
    oid
}

fn frame(obj_type: &str, content: &[u8]) -> Vec<u8> {
    let mut framed = format!("{} {}\0", obj_type, content.len()).into_bytes();
    framed.extend_from_slice(content);
    framed
}

/// Store a commit with the given parents; `ts` keeps fingerprints unique.
fn put_commit(git_dir: &Path, parents: &[ObjectId], ts: u64) -> ObjectId {
    let mut text = Vec::new();
    text.extend_from_slice(format!("tree {TREE_HEX}\n").as_bytes());
    for parent in parents {
        text.extend_from_slice(format!("parent {}\n", parent.to_hex()).as_bytes());
    }
    text.extend_from_slice(
        format!("author A U Thor <author@example.com> {ts} +0000\n").as_bytes(),
    );
    text.extend_from_slice(
        format!("committer A U Thor <author@example.com> {ts} +0000\n").as_bytes(),
    );
    text.extend_from_slice(format!("\ncommit at {ts}\n").as_bytes());

    put_loose(git_dir, &frame("commit", &text))
}

/// Store an annotated tag over the given targets and point a tag ref at it.
fn put_tag(git_dir: &Path, name: &str, targets: &[ObjectId]) -> ObjectId {
    let mut text = Vec::new();
    for target in targets {
        text.extend_from_slice(format!("object {}\n", target.to_hex()).as_bytes());
    }
    text.extend_from_slice(b"type commit\n");
    text.extend_from_slice(format!("tag {name}\n").as_bytes());
    text.extend_from_slice(b"tagger T Agger <tagger@example.com> 1500000000 +0000\n");
    text.extend_from_slice(format!("\ntag {name}\n").as_bytes());

    let oid = put_loose(git_dir, &frame("tag", &text));

    let ref_path = git_dir.join("refs/tags").join(name);
    fs::create_dir_all(ref_path.parent().unwrap()).unwrap();
    fs::write(ref_path, format!("{}\n", oid.to_hex())).unwrap();
    oid
}

fn init_repo_dir(git_dir: &Path) {
    fs::create_dir_all(git_dir.join("objects")).unwrap();
    fs::create_dir_all(git_dir.join("refs/heads")).unwrap();
    fs::create_dir_all(git_dir.join("refs/tags")).unwrap();
}

#[test]
fn exactly_tagged_commit_gets_bare_tag_name() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let c = put_commit(dir.path(), &[], 1);
    put_tag(dir.path(), "v1", &[c]);

    let repo = Repository::open(dir.path()).unwrap();
    assert_eq!(repo.describe(&c).unwrap(), "v1");
}

#[test]
fn child_of_tagged_commit_gets_depth_suffix() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let c = put_commit(dir.path(), &[], 1);
    let child = put_commit(dir.path(), &[c], 2);
    put_tag(dir.path(), "v1", &[c]);

    let repo = Repository::open(dir.path()).unwrap();
    let expected = format!("v1-1-g{}", &child.to_hex()[..7]);
    assert_eq!(repo.describe(&child).unwrap(), expected);
}

#[test]
fn depth_counts_generations() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let c = put_commit(dir.path(), &[], 1);
    let mid = put_commit(dir.path(), &[c], 2);
    let top = put_commit(dir.path(), &[mid], 3);
    put_tag(dir.path(), "v2", &[c]);

    let repo = Repository::open(dir.path()).unwrap();
    let expected = format!("v2-2-g{}", &top.to_hex()[..7]);
    assert_eq!(repo.describe(&top).unwrap(), expected);
}

#[test]
fn untagged_history_falls_back_to_abbreviated_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let c = put_commit(dir.path(), &[], 1);
    let child = put_commit(dir.path(), &[c], 2);

    let repo = Repository::open(dir.path()).unwrap();
    assert_eq!(repo.describe(&child).unwrap(), &child.to_hex()[..7]);
}

#[test]
fn custom_abbrev_width() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let c = put_commit(dir.path(), &[], 1);

    let repo = Repository::open(dir.path()).unwrap();
    assert_eq!(repo.describe_abbrev(&c, 12).unwrap(), &c.to_hex()[..12]);
}

#[test]
fn nearest_tag_wins_over_farther_tag() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let root = put_commit(dir.path(), &[], 1);
    let mid = put_commit(dir.path(), &[root], 2);
    let top = put_commit(dir.path(), &[mid], 3);
    put_tag(dir.path(), "v0", &[root]);
    put_tag(dir.path(), "v1", &[mid]);

    let repo = Repository::open(dir.path()).unwrap();
    let expected = format!("v1-1-g{}", &top.to_hex()[..7]);
    assert_eq!(repo.describe(&top).unwrap(), expected);
}

#[test]
fn merge_commit_searches_all_parents() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let tagged = put_commit(dir.path(), &[], 1);
    let other = put_commit(dir.path(), &[], 2);
    let merge = put_commit(dir.path(), &[other, tagged], 3);
    put_tag(dir.path(), "release", &[tagged]);

    let repo = Repository::open(dir.path()).unwrap();
    let expected = format!("release-1-g{}", &merge.to_hex()[..7]);
    assert_eq!(repo.describe(&merge).unwrap(), expected);
}

#[test]
fn every_target_of_a_multi_target_tag_matches() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let first = put_commit(dir.path(), &[], 1);
    let second = put_commit(dir.path(), &[], 2);
    put_tag(dir.path(), "twin", &[first, second]);

    let repo = Repository::open(dir.path()).unwrap();
    assert_eq!(repo.describe(&first).unwrap(), "twin");
    assert_eq!(repo.describe(&second).unwrap(), "twin");
}

#[test]
fn lightweight_tags_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let c = put_commit(dir.path(), &[], 1);
    // A lightweight tag: the ref names the commit itself, no tag object.
    fs::write(
        dir.path().join("refs/tags/lw"),
        format!("{}\n", c.to_hex()),
    )
    .unwrap();

    let repo = Repository::open(dir.path()).unwrap();
    assert_eq!(repo.describe(&c).unwrap(), &c.to_hex()[..7]);
}

#[test]
fn tag_found_through_packed_refs() {
    let dir = tempfile::tempdir().unwrap();
    init_repo_dir(dir.path());

    let c = put_commit(dir.path(), &[], 1);
    let tag_oid = put_tag(dir.path(), "packed", &[c]);
    // Move the tag ref from a loose file into packed-refs.
    fs::remove_file(dir.path().join("refs/tags/packed")).unwrap();
    fs::write(
        dir.path().join("packed-refs"),
        format!(
            "# pack-refs with: peeled fully-peeled sorted \n{} refs/tags/packed\n^{}\n",
            tag_oid.to_hex(),
            c.to_hex()
        ),
    )
    .unwrap();

    let repo = Repository::open(dir.path()).unwrap();
    assert_eq!(repo.describe(&c).unwrap(), "packed");
}
