//! Partition of a snapshot branch listing into browsable branches and releases.

use std::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use crate::alias::resolve_alias_chain;
use crate::archive::{Archive, BranchQuery};
use crate::error::{ContextError, Result};
use crate::id::ObjectId;
use crate::model::{BranchTarget, Release, Revision, SnapshotBranch, TargetType};
use crate::page::Page;
use crate::swhid::ObjectType;

/// A branch targeting a content, directory or revision, possibly through an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBranchInfo {
    pub name: String,
    pub alias: bool,
    pub target_type: TargetType,
    pub target: ObjectId,
    pub directory: Option<ObjectId>,
    pub date: Option<DateTime<FixedOffset>>,
    pub message: Option<String>,
    pub url: Option<String>,
}

impl SnapshotBranchInfo {
    fn from_object(name: &str, alias: bool, target_type: TargetType, target: ObjectId) -> Self {
        Self {
            name: name.to_string(),
            alias,
            target_type,
            target,
            directory: None,
            date: None,
            message: None,
            url: None,
        }
    }

    fn from_revision(name: &str, alias: bool, revision: &Revision) -> Self {
        Self {
            name: name.to_string(),
            alias,
            target_type: TargetType::Revision,
            target: revision.id,
            directory: Some(revision.directory),
            date: revision.date,
            message: revision.message.clone(),
            url: None,
        }
    }
}

/// A branch targeting a release, possibly through an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotReleaseInfo {
    pub branch_name: String,
    pub name: String,
    pub alias: bool,
    pub id: ObjectId,
    pub target_type: ObjectType,
    pub target: ObjectId,
    /// Root directory of the released revision.
    pub directory: Option<ObjectId>,
    pub date: Option<DateTime<FixedOffset>>,
    pub message: Option<String>,
    pub url: Option<String>,
}

impl SnapshotReleaseInfo {
    fn new(branch_name: &str, alias: bool, release: &Release) -> Self {
        Self {
            branch_name: branch_name.to_string(),
            name: release.name.clone(),
            alias,
            id: release.id,
            target_type: release.target_type,
            target: release.target,
            directory: None,
            date: release.date,
            message: release.message.clone(),
            url: None,
        }
    }
}

/// Classified content of one window of a snapshot's branches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotContent {
    /// Sorted by name.
    pub branches: Vec<SnapshotBranchInfo>,
    /// Sorted by branch name.
    pub releases: Vec<SnapshotReleaseInfo>,
    /// Alias name to its final target, `None` when it could not be resolved.
    pub aliases: BTreeMap<String, Option<BranchTarget>>,
    /// First branch name past the classified window.
    pub next_branch: Option<String>,
}

impl SnapshotContent {
    pub fn is_truncated(&self) -> bool {
        self.next_branch.is_some()
    }
}

type NameMultimap = BTreeMap<ObjectId, BTreeSet<String>>;

#[derive(Default)]
struct Grouping {
    branches: BTreeMap<String, SnapshotBranchInfo>,
    revision_to_branch: NameMultimap,
    release_to_branch: NameMultimap,
}

impl Grouping {
    fn add(&mut self, name: &str, target: &BranchTarget, alias: bool) {
        match target {
            BranchTarget::Content(id) => {
                self.branches.insert(
                    name.to_string(),
                    SnapshotBranchInfo::from_object(name, alias, TargetType::Content, *id),
                );
            }
            BranchTarget::Directory(id) => {
                self.branches.insert(
                    name.to_string(),
                    SnapshotBranchInfo::from_object(name, alias, TargetType::Directory, *id),
                );
            }
            BranchTarget::Revision(id) => {
                self.revision_to_branch.entry(*id).or_default().insert(name.to_string());
            }
            BranchTarget::Release(id) => {
                self.release_to_branch.entry(*id).or_default().insert(name.to_string());
            }
            BranchTarget::Alias(_) => {}
        }
    }
}

/// Classify a page of snapshot branches.
///
/// Releases and revisions are fetched with one batched lookup each. Dangling
/// branches, objects missing from the archive and unresolvable aliases are
/// left out of the result.
pub fn classify<A: Archive + ?Sized>(
    archive: &A,
    snapshot_id: &ObjectId,
    page: &Page<SnapshotBranch>,
) -> Result<SnapshotContent> {
    let fetched: BTreeMap<String, Option<BranchTarget>> = page
        .items
        .iter()
        .map(|branch| (branch.name.clone(), branch.target.clone()))
        .collect();

    let mut grouping = Grouping::default();
    let mut alias_names = BTreeSet::new();

    for branch in &page.items {
        match &branch.target {
            None => continue,
            Some(BranchTarget::Alias(_)) => {
                alias_names.insert(branch.name.clone());
            }
            Some(target) => grouping.add(&branch.name, target, false),
        }
    }

    let mut aliases = BTreeMap::new();
    for name in &alias_names {
        let resolved = match resolve_alias_chain(archive, snapshot_id, name, &fetched) {
            Ok(resolved) => resolved,
            Err(ContextError::CycleDetected(_)) => {
                log::warn!("alias cycle through branch {} in snapshot {}", name, snapshot_id);
                None
            }
            Err(err) => return Err(err),
        };
        match &resolved {
            Some(target) => grouping.add(name, target, true),
            None => log::warn!("unresolvable alias {} in snapshot {}", name, snapshot_id),
        }
        aliases.insert(name.clone(), resolved);
    }

    let Grouping {
        mut branches,
        revision_to_branch,
        release_to_branch,
    } = grouping;

    let mut releases = BTreeMap::new();
    let mut revision_to_release = NameMultimap::new();

    let release_ids: Vec<ObjectId> = release_to_branch.keys().copied().collect();
    if !release_ids.is_empty() {
        log::debug!("fetching {} releases of snapshot {}", release_ids.len(), snapshot_id);
        let fetched_releases = archive.release_get(&release_ids)?;
        for (release_id, release) in release_ids.iter().zip(fetched_releases) {
            let Some(release) = release else {
                log::warn!("release {} of snapshot {} missing from archive", release_id, snapshot_id);
                continue;
            };
            for branch_name in &release_to_branch[release_id] {
                let alias = alias_names.contains(branch_name);
                releases.insert(
                    branch_name.clone(),
                    SnapshotReleaseInfo::new(branch_name, alias, &release),
                );
                if release.target_type == ObjectType::Revision {
                    revision_to_release
                        .entry(release.target)
                        .or_default()
                        .insert(branch_name.clone());
                }
            }
        }
    }

    let revision_ids: Vec<ObjectId> = revision_to_branch
        .keys()
        .chain(revision_to_release.keys())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !revision_ids.is_empty() {
        log::debug!("fetching {} revisions of snapshot {}", revision_ids.len(), snapshot_id);
        let fetched_revisions = archive.revision_get(&revision_ids)?;
        for (revision_id, revision) in revision_ids.iter().zip(fetched_revisions) {
            let Some(revision) = revision else {
                log::warn!("revision {} of snapshot {} missing from archive", revision_id, snapshot_id);
                continue;
            };
            for name in revision_to_branch.get(revision_id).into_iter().flatten() {
                let alias = alias_names.contains(name);
                branches.insert(name.clone(), SnapshotBranchInfo::from_revision(name, alias, &revision));
            }
            for branch_name in revision_to_release.get(revision_id).into_iter().flatten() {
                if let Some(release) = releases.get_mut(branch_name) {
                    release.directory = Some(revision.directory);
                }
            }
        }
    }

    Ok(SnapshotContent {
        branches: branches.into_values().collect(),
        releases: releases.into_values().collect(),
        aliases,
        next_branch: page.next_cursor.clone(),
    })
}

/// Fetch and classify the first `max_branches` branches of a snapshot.
pub fn fetch_snapshot_content<A: Archive + ?Sized>(
    archive: &A,
    snapshot_id: &ObjectId,
    max_branches: usize,
    exclude_prefix: Option<&str>,
) -> Result<SnapshotContent> {
    let query = BranchQuery::new(max_branches).exclude_prefix(exclude_prefix.map(str::to_string));
    let page = archive
        .snapshot_get_branches(snapshot_id, &query)?
        .ok_or_else(|| {
            ContextError::not_found(format!("Snapshot with id {} not found!", snapshot_id))
        })?;
    if page.is_truncated() {
        log::debug!(
            "snapshot {} has more than {} branches, listing truncated",
            snapshot_id,
            max_branches
        );
    }
    classify(archive, snapshot_id, &page)
}
