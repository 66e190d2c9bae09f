//! In-process [`Archive`] implementation, loadable from a JSON fixture.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use serde::{Deserialize, Serialize};
use crate::archive::{Archive, BranchQuery, VisitSelector};
use crate::error::Result;
use crate::id::ObjectId;
use crate::model::{
    BranchTarget, OriginInfo, OriginVisit, Release, Revision, Snapshot, SnapshotBranch, TargetType,
};
use crate::page::Page;

/// Serialized content of a [`MemoryArchive`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveFixture {
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(default)]
    pub releases: Vec<Release>,
    #[serde(default)]
    pub origins: Vec<OriginFixture>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OriginFixture {
    pub url: String,
    #[serde(default)]
    pub visits: Vec<OriginVisit>,
}

#[derive(Debug, Default)]
pub struct MemoryArchive {
    snapshots: HashMap<ObjectId, Snapshot>,
    revisions: HashMap<ObjectId, Revision>,
    releases: HashMap<ObjectId, Release>,
    origins: BTreeMap<String, Vec<OriginVisit>>,
    branch_calls: AtomicUsize,
    revision_calls: AtomicUsize,
    release_calls: AtomicUsize,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: ArchiveFixture) -> Self {
        let mut archive = Self::new();
        for snapshot in fixture.snapshots {
            archive.add_snapshot(snapshot);
        }
        for revision in fixture.revisions {
            archive.add_revision(revision);
        }
        for release in fixture.releases {
            archive.add_release(release);
        }
        for origin in fixture.origins {
            archive.add_origin(&origin.url);
            for mut visit in origin.visits {
                visit.origin = origin.url.clone();
                archive.add_visit(visit);
            }
        }
        archive
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let fixture: ArchiveFixture = serde_json::from_reader(reader)?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let archive = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "loaded archive fixture {}: {} snapshots, {} revisions, {} releases, {} origins",
            path.as_ref().display(),
            archive.snapshots.len(),
            archive.revisions.len(),
            archive.releases.len(),
            archive.origins.len()
        );
        Ok(archive)
    }

    pub fn add_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.id, snapshot);
    }

    pub fn add_revision(&mut self, revision: Revision) {
        self.revisions.insert(revision.id, revision);
    }

    pub fn add_release(&mut self, release: Release) {
        self.releases.insert(release.id, release);
    }

    pub fn add_origin(&mut self, url: &str) {
        self.origins.entry(url.to_string()).or_default();
    }

    /// Record a visit, registering its origin if needed.
    pub fn add_visit(&mut self, visit: OriginVisit) {
        self.origins.entry(visit.origin.clone()).or_default().push(visit);
    }

    pub fn snapshot(&self, id: &ObjectId) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }

    /// Number of branch listing requests served so far.
    pub fn branch_listing_calls(&self) -> usize {
        self.branch_calls.load(Ordering::Relaxed)
    }

    /// Number of batched revision lookups served so far.
    pub fn revision_get_calls(&self) -> usize {
        self.revision_calls.load(Ordering::Relaxed)
    }

    /// Number of batched release lookups served so far.
    pub fn release_get_calls(&self) -> usize {
        self.release_calls.load(Ordering::Relaxed)
    }

    pub fn reset_call_counts(&self) {
        self.branch_calls.store(0, Ordering::Relaxed);
        self.revision_calls.store(0, Ordering::Relaxed);
        self.release_calls.store(0, Ordering::Relaxed);
    }
}

impl Archive for MemoryArchive {
    fn snapshot_get_branches(
        &self,
        snapshot_id: &ObjectId,
        query: &BranchQuery,
    ) -> Result<Option<Page<SnapshotBranch>>> {
        self.branch_calls.fetch_add(1, Ordering::Relaxed);
        let Some(snapshot) = self.snapshots.get(snapshot_id) else {
            return Ok(None);
        };

        let start = query.from.clone().unwrap_or_default();
        let mut matching = snapshot
            .branches
            .range(start..)
            .filter(|(name, target)| query.matches(name, target.as_ref()));

        let items: Vec<SnapshotBranch> = matching
            .by_ref()
            .take(query.count)
            .map(|(name, target)| SnapshotBranch::new(name.clone(), target.clone()))
            .collect();
        let next_cursor = matching.next().map(|(name, _)| name.clone());

        Ok(Some(Page::new(items, next_cursor)))
    }

    fn snapshot_branch_get_by_name(
        &self,
        snapshot_id: &ObjectId,
        name: &str,
        follow_alias: bool,
    ) -> Result<Option<BranchTarget>> {
        let Some(snapshot) = self.snapshots.get(snapshot_id) else {
            return Ok(None);
        };

        let mut current = name.to_string();
        let mut visited = BTreeSet::new();
        loop {
            let target = match snapshot.branches.get(&current) {
                Some(Some(target)) => target.clone(),
                _ => return Ok(None),
            };
            match target {
                BranchTarget::Alias(next) if follow_alias => {
                    if !visited.insert(current) {
                        return Ok(None);
                    }
                    current = next;
                }
                target => return Ok(Some(target)),
            }
        }
    }

    fn snapshot_count_branches(
        &self,
        snapshot_id: &ObjectId,
        name_exclude_prefix: Option<&str>,
    ) -> Result<Option<BTreeMap<TargetType, u64>>> {
        let Some(snapshot) = self.snapshots.get(snapshot_id) else {
            return Ok(None);
        };

        let mut counts = BTreeMap::new();
        for (name, target) in &snapshot.branches {
            if name_exclude_prefix.is_some_and(|prefix| name.starts_with(prefix)) {
                continue;
            }
            if let Some(target) = target {
                *counts.entry(target.target_type()).or_insert(0) += 1;
            }
        }
        Ok(Some(counts))
    }

    fn revision_get(&self, ids: &[ObjectId]) -> Result<Vec<Option<Revision>>> {
        self.revision_calls.fetch_add(1, Ordering::Relaxed);
        Ok(ids.iter().map(|id| self.revisions.get(id).cloned()).collect())
    }

    fn release_get(&self, ids: &[ObjectId]) -> Result<Vec<Option<Release>>> {
        self.release_calls.fetch_add(1, Ordering::Relaxed);
        Ok(ids.iter().map(|id| self.releases.get(id).cloned()).collect())
    }

    fn origin_get(&self, url: &str) -> Result<Option<OriginInfo>> {
        Ok(self.origins.get(url).map(|_| OriginInfo { url: url.to_string() }))
    }

    fn origin_visit_get(&self, url: &str, selector: &VisitSelector) -> Result<Option<OriginVisit>> {
        let Some(visits) = self.origins.get(url) else {
            return Ok(None);
        };

        let visit = match selector {
            VisitSelector::Latest => visits
                .iter()
                .filter(|v| v.snapshot.is_some())
                .max_by_key(|v| (v.date, v.visit)),
            VisitSelector::Id(id) => visits.iter().find(|v| v.visit == *id),
            VisitSelector::Snapshot(snapshot) => visits
                .iter()
                .filter(|v| v.snapshot.as_ref() == Some(snapshot))
                .max_by_key(|v| (v.date, v.visit)),
            VisitSelector::Timestamp(date) => visits
                .iter()
                .find(|v| v.date == *date)
                .or_else(|| {
                    visits
                        .iter()
                        .min_by_key(|v| (v.date - *date).num_milliseconds().unsigned_abs())
                }),
        };
        Ok(visit.cloned())
    }
}
