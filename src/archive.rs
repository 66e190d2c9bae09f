//! Capability interface over the archive storage backend.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use crate::error::Result;
use crate::id::ObjectId;
use crate::model::{
    BranchTarget, OriginInfo, OriginVisit, Release, Revision, SnapshotBranch, TargetType,
};
use crate::page::Page;

/// Filters of a paginated snapshot branch listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchQuery {
    /// First branch name to return (inclusive).
    pub from: Option<String>,
    pub count: usize,
    /// Only return branches of these target types. Dangling branches are
    /// only listed when this is `None`.
    pub target_types: Option<Vec<TargetType>>,
    /// Only return branches whose name contains this string.
    pub name_include: Option<String>,
    /// Skip branches whose name starts with this prefix.
    pub name_exclude_prefix: Option<String>,
}

impl BranchQuery {
    pub fn new(count: usize) -> Self {
        Self {
            from: None,
            count,
            target_types: None,
            name_include: None,
            name_exclude_prefix: None,
        }
    }

    pub fn from(mut self, name: impl Into<String>) -> Self {
        self.from = Some(name.into());
        self
    }

    pub fn target_types(mut self, types: &[TargetType]) -> Self {
        self.target_types = Some(types.to_vec());
        self
    }

    pub fn name_include(mut self, pattern: impl Into<String>) -> Self {
        self.name_include = Some(pattern.into());
        self
    }

    pub fn exclude_prefix(mut self, prefix: Option<String>) -> Self {
        self.name_exclude_prefix = prefix;
        self
    }

    /// Whether a branch passes the name and target type filters.
    pub fn matches(&self, name: &str, target: Option<&BranchTarget>) -> bool {
        if let Some(prefix) = &self.name_exclude_prefix {
            if name.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(pattern) = &self.name_include {
            if !name.contains(pattern.as_str()) {
                return false;
            }
        }
        match (&self.target_types, target) {
            (None, _) => true,
            (Some(types), Some(target)) => types.contains(&target.target_type()),
            (Some(_), None) => false,
        }
    }
}

/// How to pick a visit of an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitSelector {
    /// Most recent visit that produced a snapshot.
    Latest,
    Id(u64),
    /// Most recent visit that produced this snapshot.
    Snapshot(ObjectId),
    /// Visit at this exact date, or else the closest one.
    Timestamp(DateTime<Utc>),
}

/// Storage operations needed to build snapshot contexts.
///
/// Lookups of unknown objects return `None` (or `None` entries for batched
/// lookups, positionally aligned with the requested ids). `Err` is reserved
/// for transport failures.
pub trait Archive {
    fn snapshot_get_branches(
        &self,
        snapshot_id: &ObjectId,
        query: &BranchQuery,
    ) -> Result<Option<Page<SnapshotBranch>>>;

    fn snapshot_branch_get_by_name(
        &self,
        snapshot_id: &ObjectId,
        name: &str,
        follow_alias: bool,
    ) -> Result<Option<BranchTarget>>;

    fn snapshot_count_branches(
        &self,
        snapshot_id: &ObjectId,
        name_exclude_prefix: Option<&str>,
    ) -> Result<Option<BTreeMap<TargetType, u64>>>;

    fn revision_get(&self, ids: &[ObjectId]) -> Result<Vec<Option<Revision>>>;

    fn release_get(&self, ids: &[ObjectId]) -> Result<Vec<Option<Release>>>;

    fn origin_get(&self, url: &str) -> Result<Option<OriginInfo>>;

    fn origin_visit_get(&self, url: &str, selector: &VisitSelector) -> Result<Option<OriginVisit>>;
}

impl<A: Archive + ?Sized> Archive for &A {
    fn snapshot_get_branches(
        &self,
        snapshot_id: &ObjectId,
        query: &BranchQuery,
    ) -> Result<Option<Page<SnapshotBranch>>> {
        (**self).snapshot_get_branches(snapshot_id, query)
    }

    fn snapshot_branch_get_by_name(
        &self,
        snapshot_id: &ObjectId,
        name: &str,
        follow_alias: bool,
    ) -> Result<Option<BranchTarget>> {
        (**self).snapshot_branch_get_by_name(snapshot_id, name, follow_alias)
    }

    fn snapshot_count_branches(
        &self,
        snapshot_id: &ObjectId,
        name_exclude_prefix: Option<&str>,
    ) -> Result<Option<BTreeMap<TargetType, u64>>> {
        (**self).snapshot_count_branches(snapshot_id, name_exclude_prefix)
    }

    fn revision_get(&self, ids: &[ObjectId]) -> Result<Vec<Option<Revision>>> {
        (**self).revision_get(ids)
    }

    fn release_get(&self, ids: &[ObjectId]) -> Result<Vec<Option<Release>>> {
        (**self).release_get(ids)
    }

    fn origin_get(&self, url: &str) -> Result<Option<OriginInfo>> {
        (**self).origin_get(url)
    }

    fn origin_visit_get(&self, url: &str, selector: &VisitSelector) -> Result<Option<OriginVisit>> {
        (**self).origin_visit_get(url, selector)
    }
}

/// Fetch a single revision.
pub fn revision_get_one<A: Archive + ?Sized>(archive: &A, id: &ObjectId) -> Result<Option<Revision>> {
    Ok(archive.revision_get(std::slice::from_ref(id))?.into_iter().next().flatten())
}

/// Fetch a single release.
pub fn release_get_one<A: Archive + ?Sized>(archive: &A, id: &ObjectId) -> Result<Option<Release>> {
    Ok(archive.release_get(std::slice::from_ref(id))?.into_iter().next().flatten())
}
