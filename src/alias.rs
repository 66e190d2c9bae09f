//! Resolution of `alias` branches to the object they eventually point at.

use std::collections::{BTreeMap, BTreeSet};
use crate::archive::{Archive, BranchQuery};
use crate::error::{ContextError, Result};
use crate::id::ObjectId;
use crate::model::{BranchTarget, TargetType};

/// Target types an alias may be resolved to by a follow-up branch lookup.
pub const RESOLVABLE_TARGET_TYPES: [TargetType; 4] = [
    TargetType::Content,
    TargetType::Directory,
    TargetType::Revision,
    TargetType::Release,
];

/// Look up the target of branch `name`, one level only.
///
/// Branches already fetched are used as is. Otherwise the branch may lie
/// outside a truncated listing, so a single-entry listing starting at
/// `name` is requested; it only counts if the returned name matches.
pub fn resolve_alias<A: Archive + ?Sized>(
    archive: &A,
    snapshot_id: &ObjectId,
    name: &str,
    fetched: &BTreeMap<String, Option<BranchTarget>>,
) -> Result<Option<BranchTarget>> {
    if let Some(target) = fetched.get(name) {
        return Ok(target.clone());
    }

    log::debug!("branch {} of snapshot {} not fetched, looking it up", name, snapshot_id);
    let query = BranchQuery::new(1)
        .from(name)
        .target_types(&RESOLVABLE_TARGET_TYPES);
    let branch = archive
        .snapshot_get_branches(snapshot_id, &query)?
        .and_then(|page| page.items.into_iter().next());

    match branch {
        Some(branch) if branch.name == name => Ok(branch.target),
        _ => Ok(None),
    }
}

/// Follow an alias chain starting at branch `name` until a non-alias target.
///
/// Returns `Ok(None)` when a link of the chain cannot be resolved and
/// [`ContextError::CycleDetected`] when a branch name comes up twice.
pub fn resolve_alias_chain<A: Archive + ?Sized>(
    archive: &A,
    snapshot_id: &ObjectId,
    name: &str,
    fetched: &BTreeMap<String, Option<BranchTarget>>,
) -> Result<Option<BranchTarget>> {
    let mut visited = BTreeSet::new();
    let mut current = name.to_string();
    loop {
        if !visited.insert(current.clone()) {
            return Err(ContextError::CycleDetected(name.to_string()));
        }
        match resolve_alias(archive, snapshot_id, &current, fetched)? {
            Some(BranchTarget::Alias(next)) => current = next,
            other => return Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryArchive;
    use crate::model::Snapshot;

    fn id(b: u8) -> ObjectId {
        ObjectId::new([b; 20])
    }

    fn alias(name: &str) -> Option<BranchTarget> {
        Some(BranchTarget::Alias(name.to_string()))
    }

    fn archive_with(branches: &[(&str, Option<BranchTarget>)]) -> MemoryArchive {
        let mut archive = MemoryArchive::new();
        archive.add_snapshot(Snapshot {
            id: id(9),
            branches: branches
                .iter()
                .map(|(name, target)| (name.to_string(), target.clone()))
                .collect(),
        });
        archive
    }

    #[test]
    fn test_resolve_from_fetched_branches() {
        let archive = MemoryArchive::new();
        let mut fetched = BTreeMap::new();
        fetched.insert("refs/heads/main".to_string(), Some(BranchTarget::Revision(id(1))));
        let target = resolve_alias(&archive, &id(9), "refs/heads/main", &fetched).unwrap();
        assert_eq!(target, Some(BranchTarget::Revision(id(1))));
        assert_eq!(archive.branch_listing_calls(), 0);
    }

    #[test]
    fn test_resolve_outside_fetched_window() {
        let archive = archive_with(&[
            ("HEAD", alias("refs/heads/main")),
            ("refs/heads/main", Some(BranchTarget::Revision(id(1)))),
        ]);
        let target = resolve_alias(&archive, &id(9), "refs/heads/main", &BTreeMap::new()).unwrap();
        assert_eq!(target, Some(BranchTarget::Revision(id(1))));
        assert_eq!(archive.branch_listing_calls(), 1);
    }

    #[test]
    fn test_resolve_requires_exact_name() {
        let archive = archive_with(&[("refs/heads/main2", Some(BranchTarget::Revision(id(1))))]);
        let target = resolve_alias(&archive, &id(9), "refs/heads/main", &BTreeMap::new()).unwrap();
        assert_eq!(target, None);
    }

    #[test]
    fn test_chain_is_followed() {
        let archive = archive_with(&[
            ("HEAD", alias("refs/heads/default")),
            ("refs/heads/default", alias("refs/heads/main")),
            ("refs/heads/main", Some(BranchTarget::Release(id(3)))),
        ]);
        let fetched = archive.snapshot(&id(9)).unwrap().branches.clone();
        let target = resolve_alias_chain(&archive, &id(9), "HEAD", &fetched).unwrap();
        assert_eq!(target, Some(BranchTarget::Release(id(3))));
    }

    #[test]
    fn test_cycle_is_detected() {
        let archive = archive_with(&[("a", alias("b")), ("b", alias("a"))]);
        let fetched = archive.snapshot(&id(9)).unwrap().branches.clone();
        let err = resolve_alias_chain(&archive, &id(9), "a", &fetched).unwrap_err();
        assert!(matches!(err, ContextError::CycleDetected(ref name) if name == "a"));

        let self_loop = archive_with(&[("HEAD", alias("HEAD"))]);
        let fetched = self_loop.snapshot(&id(9)).unwrap().branches.clone();
        assert!(resolve_alias_chain(&self_loop, &id(9), "HEAD", &fetched).is_err());
    }

    #[test]
    fn test_dangling_link() {
        let archive = archive_with(&[("HEAD", alias("refs/heads/gone")), ("refs/heads/gone", None)]);
        let fetched = archive.snapshot(&id(9)).unwrap().branches.clone();
        assert_eq!(resolve_alias_chain(&archive, &id(9), "HEAD", &fetched).unwrap(), None);
    }
}
