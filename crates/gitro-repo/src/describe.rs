//! Describe: label a commit by the nearest reachable annotated tag.

use std::collections::{HashMap, HashSet, VecDeque};

use gitro_hash::ObjectId;
use gitro_object::Object;

use crate::{RepoError, Repository};

/// Breadth-first search from `start` through parent edges until a tagged
/// commit is found.
///
/// Only annotated tags participate; every target of a multi-target tag is
/// mapped. An exact hit yields the bare tag name, an ancestor hit yields
/// `"<tag>-<depth>-g<abbrev>"`, and exhaustion falls back to the
/// abbreviated fingerprint of `start`.
pub(crate) fn describe(
    repo: &Repository,
    start: ObjectId,
    abbrev: usize,
) -> Result<String, RepoError> {
    let tag_map = collect_tag_targets(repo)?;
    let abbrev = abbrev.clamp(1, 40);
    let start_hex = start.to_hex();

    let mut queue: VecDeque<(ObjectId, usize)> = VecDeque::new();
    let mut seen: HashSet<ObjectId> = HashSet::new();
    queue.push_back((start, 0));
    seen.insert(start);

    while let Some((oid, depth)) = queue.pop_front() {
        if let Some(tag_name) = tag_map.get(&oid) {
            return Ok(if depth == 0 {
                tag_name.clone()
            } else {
                format!("{}-{}-g{}", tag_name, depth, &start_hex[..abbrev])
            });
        }

        let commit = repo.commit(&oid)?;
        for parent in commit.parents {
            // The history is a DAG, so the visited set only trims
            // re-exploration after merges; results are unchanged.
            if seen.insert(parent) {
                queue.push_back((parent, depth + 1));
            }
        }
    }

    Ok(start_hex[..abbrev].to_string())
}

/// Map every annotated tag target to the tag's short name.
///
/// Lightweight tags point straight at commits and are skipped here; a tag
/// ref whose object has vanished is skipped as well.
fn collect_tag_targets(repo: &Repository) -> Result<HashMap<ObjectId, String>, RepoError> {
    let mut map = HashMap::new();
    for (short_name, oid) in repo.list_tags()? {
        match repo.odb().read(&oid)? {
            Some(Object::Tag(tag)) => {
                for target in &tag.targets {
                    map.entry(*target).or_insert_with(|| short_name.clone());
                }
            }
            _ => continue,
        }
    }
    Ok(map)
}
