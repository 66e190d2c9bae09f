//! Snapshot context: what is currently browsed inside a snapshot or origin visit.

use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use crate::archive::{revision_get_one, Archive, VisitSelector};
use crate::cache::{CachePort, NoCache};
use crate::classify::{classify, fetch_snapshot_content, SnapshotBranchInfo, SnapshotContent, SnapshotReleaseInfo};
use crate::config::ContextConfig;
use crate::error::{ContextError, Result};
use crate::id::ObjectId;
use crate::model::{OriginInfo, OriginVisit, Revision, SnapshotBranch, SnapshotSizes, TargetType};
use crate::page::Page;
use crate::swhid::{ObjectType, Swhid};
use crate::time::{format_display_date, format_query_timestamp, parse_timestamp};
use crate::urls::{gen_revision_url, origin_view_path, reverse, snapshot_view_path, BrowseContext};

/// What a snapshot context is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSelector {
    Snapshot(ObjectId),
    Origin {
        url: String,
        timestamp: Option<DateTime<Utc>>,
        visit_id: Option<u64>,
        snapshot_id: Option<ObjectId>,
    },
}

impl ContextSelector {
    /// Build a selector from raw request parameters.
    pub fn from_parts(
        snapshot: Option<&str>,
        origin_url: Option<&str>,
        timestamp: Option<&str>,
        visit_id: Option<u64>,
    ) -> Result<Self> {
        let snapshot_id = snapshot
            .map(|s| {
                ObjectId::from_hex(s)
                    .map_err(|_| ContextError::bad_input(format!("Invalid snapshot id: {}", s)))
            })
            .transpose()?;

        match (origin_url, snapshot_id) {
            (Some(url), snapshot_id) => Ok(ContextSelector::Origin {
                url: url.to_string(),
                timestamp: timestamp.map(parse_timestamp).transpose()?,
                visit_id,
                snapshot_id,
            }),
            (None, Some(snapshot_id)) => Ok(ContextSelector::Snapshot(snapshot_id)),
            (None, None) => Err(ContextError::bad_input(
                "A snapshot or origin must be provided to get a snapshot context",
            )),
        }
    }
}

/// Parameters of a snapshot context computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextRequest {
    pub selector: ContextSelector,
    pub browse_context: BrowseContext,
    pub branch_name: Option<String>,
    pub release_name: Option<String>,
    pub revision_id: Option<ObjectId>,
    pub path: Option<String>,
}

impl ContextRequest {
    pub fn new(selector: ContextSelector) -> Self {
        Self {
            selector,
            browse_context: BrowseContext::default(),
            branch_name: None,
            release_name: None,
            revision_id: None,
            path: None,
        }
    }

    pub fn snapshot(snapshot_id: ObjectId) -> Self {
        Self::new(ContextSelector::Snapshot(snapshot_id))
    }

    pub fn origin(url: impl Into<String>) -> Self {
        Self::new(ContextSelector::Origin {
            url: url.into(),
            timestamp: None,
            visit_id: None,
            snapshot_id: None,
        })
    }

    pub fn with_browse_context(mut self, browse_context: BrowseContext) -> Self {
        self.browse_context = browse_context;
        self
    }

    pub fn with_branch(mut self, name: impl Into<String>) -> Self {
        self.branch_name = Some(name.into());
        self
    }

    pub fn with_release(mut self, name: impl Into<String>) -> Self {
        self.release_name = Some(name.into());
        self
    }

    pub fn with_revision(mut self, revision_id: ObjectId) -> Self {
        self.revision_id = Some(revision_id);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitInfo {
    pub visit: u64,
    pub date: DateTime<Utc>,
    pub formatted_date: String,
    pub status: String,
    #[serde(rename = "type")]
    pub visit_type: Option<String>,
    pub snapshot: Option<ObjectId>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionInfo {
    pub id: ObjectId,
    pub directory: ObjectId,
    pub author: Option<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub committer_date: Option<DateTime<FixedOffset>>,
    pub message: Option<String>,
    /// First line of the message.
    pub message_header: String,
    pub url: String,
}

impl RevisionInfo {
    fn new(revision: Revision) -> Self {
        let message_header = revision
            .message
            .as_deref()
            .and_then(|m| m.lines().next())
            .unwrap_or_default()
            .to_string();
        Self {
            id: revision.id,
            directory: revision.directory,
            author: revision.author,
            date: revision.date,
            committer_date: revision.committer_date,
            message: revision.message,
            message_header,
            url: String::new(),
        }
    }
}

/// State of the browsing of a snapshot, computed for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotContext {
    pub snapshot_id: ObjectId,
    pub snapshot_swhid: String,
    pub branch: Option<String>,
    pub branch_alias: bool,
    pub release: Option<String>,
    pub release_alias: bool,
    pub release_id: Option<ObjectId>,
    pub revision_id: Option<ObjectId>,
    pub revision_found: bool,
    pub revision_info: Option<RevisionInfo>,
    pub root_directory: Option<ObjectId>,
    pub branches: Vec<SnapshotBranchInfo>,
    pub releases: Vec<SnapshotReleaseInfo>,
    pub snapshot_sizes: SnapshotSizes,
    pub is_empty: bool,
    pub origin_info: Option<OriginInfo>,
    pub visit_info: Option<VisitInfo>,
    /// Parameters to add to URLs to stay in this context.
    pub query_params: BTreeMap<String, String>,
    pub directory_url: String,
    pub branches_url: String,
    pub releases_url: String,
    pub origin_visits_url: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum BranchKind {
    Branch,
    Release,
}

/// Where a branch or release was searched, for error messages.
enum SearchScope {
    Snapshot(ObjectId),
    Visit { url: String, visit: u64 },
    Timestamp { url: String, timestamp: String },
}

impl SearchScope {
    fn not_found(&self, kind: BranchKind, name: &str, available: u64) -> ContextError {
        let (title, plural) = match kind {
            BranchKind::Branch => ("Branch", "branches"),
            BranchKind::Release => ("Release", "releases"),
        };
        let msg = match (self, available) {
            (SearchScope::Snapshot(id), 0) => format!(
                "{} {} not found: snapshot with id {} has an empty list of {}!",
                title, name, id, plural
            ),
            (SearchScope::Snapshot(id), _) => {
                format!("{} {} for snapshot with id {} not found!", title, name, id)
            }
            (SearchScope::Visit { url, visit }, 0) => format!(
                "{} {} not found: origin with url {} for visit with id {} has an empty list of {}!",
                title, name, url, visit, plural
            ),
            (SearchScope::Visit { url, visit }, _) => format!(
                "{} {} associated to visit with id {} for origin with url {} not found!",
                title, name, visit, url
            ),
            (SearchScope::Timestamp { url, timestamp }, 0) => format!(
                "{} {} not found: origin with url {} for visit with timestamp {} has an empty list of {}!",
                title, name, url, timestamp, plural
            ),
            (SearchScope::Timestamp { url, timestamp }, _) => format!(
                "{} {} associated to visit with timestamp {} for origin with url {} not found!",
                title, name, timestamp, url
            ),
        };
        ContextError::NotFound(msg)
    }
}

#[derive(Default)]
struct Selection {
    branch: Option<String>,
    branch_alias: bool,
    release: Option<String>,
    release_alias: bool,
    release_id: Option<ObjectId>,
    revision_id: Option<ObjectId>,
    root_directory: Option<ObjectId>,
}

impl Selection {
    fn select_branch(&mut self, branch: &SnapshotBranchInfo) {
        self.branch = Some(branch.name.clone());
        self.branch_alias = branch.alias;
        match branch.target_type {
            TargetType::Revision => {
                self.revision_id = Some(branch.target);
                self.root_directory = branch.directory;
            }
            TargetType::Directory => self.root_directory = Some(branch.target),
            _ => {}
        }
    }

    fn select_release(&mut self, release: &SnapshotReleaseInfo) {
        self.release = Some(release.name.clone());
        self.release_alias = release.alias;
        self.release_id = Some(release.id);
        match release.target_type {
            ObjectType::Revision => {
                self.revision_id = Some(release.target);
                self.root_directory = release.directory;
            }
            ObjectType::Directory => self.root_directory = Some(release.target),
            _ => {}
        }
    }
}

/// Computes [`SnapshotContext`]s against an archive backend.
pub struct SnapshotContextBuilder<'a, A: ?Sized> {
    archive: &'a A,
    cache: Arc<dyn CachePort<ObjectId, SnapshotContent> + 'a>,
    config: ContextConfig,
}

impl<'a, A: Archive + ?Sized> SnapshotContextBuilder<'a, A> {
    pub fn new(archive: &'a A) -> Self {
        Self {
            archive,
            cache: Arc::new(NoCache),
            config: ContextConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CachePort<ObjectId, SnapshotContent> + 'a>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_config(mut self, config: ContextConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Classified branches and releases of a snapshot, read through the cache.
    pub fn snapshot_content(&self, snapshot_id: &ObjectId) -> Result<SnapshotContent> {
        if let Some(content) = self.cache.get(snapshot_id) {
            log::debug!("snapshot {} content served from cache", snapshot_id);
            return Ok(content);
        }
        let content = fetch_snapshot_content(
            self.archive,
            snapshot_id,
            self.config.max_branches,
            self.config.exclude_prefix(),
        )?;
        self.cache.set(*snapshot_id, content.clone(), self.config.cache_ttl());
        Ok(content)
    }

    pub fn snapshot_sizes(&self, snapshot_id: &ObjectId) -> Result<SnapshotSizes> {
        let counts = self
            .archive
            .snapshot_count_branches(snapshot_id, self.config.exclude_prefix())?
            .ok_or_else(|| {
                ContextError::not_found(format!("Snapshot with id {} not found!", snapshot_id))
            })?;
        Ok(SnapshotSizes::from_counts(&counts))
    }

    /// Resolve the visit of an origin designated by a visit id, a snapshot,
    /// a timestamp or, when none is given, the latest visit with a snapshot.
    pub fn origin_visit(
        &self,
        origin: &OriginInfo,
        timestamp: Option<DateTime<Utc>>,
        visit_id: Option<u64>,
        snapshot_id: Option<ObjectId>,
    ) -> Result<OriginVisit> {
        let url = &origin.url;
        let (selector, msg) = if let Some(visit_id) = visit_id {
            (
                VisitSelector::Id(visit_id),
                format!("Visit with id {} for origin with url {} not found!", visit_id, url),
            )
        } else if let Some(snapshot_id) = snapshot_id {
            (
                VisitSelector::Snapshot(snapshot_id),
                format!(
                    "Visit for snapshot with id {} for origin with url {} not found!",
                    snapshot_id, url
                ),
            )
        } else if let Some(timestamp) = timestamp {
            (
                VisitSelector::Timestamp(timestamp),
                format!(
                    "Visit with timestamp {} for origin with url {} not found!",
                    format_query_timestamp(&timestamp),
                    url
                ),
            )
        } else {
            (
                VisitSelector::Latest,
                format!("No valid visit for origin with url {} found!", url),
            )
        };
        self.archive
            .origin_visit_get(url, &selector)?
            .ok_or(ContextError::NotFound(msg))
    }

    pub fn build(&self, request: &ContextRequest) -> Result<SnapshotContext> {
        let mut query_params = BTreeMap::new();
        let mut origin_info = None;
        let mut visit = None;

        let (snapshot_id, scope) = match &request.selector {
            ContextSelector::Snapshot(snapshot_id) => {
                (*snapshot_id, SearchScope::Snapshot(*snapshot_id))
            }
            ContextSelector::Origin {
                url,
                timestamp,
                visit_id,
                snapshot_id,
            } => {
                if let Some(visit_id) = visit_id {
                    query_params.insert("visit_id".to_string(), visit_id.to_string());
                } else if let Some(snapshot_id) = snapshot_id {
                    query_params.insert("snapshot".to_string(), snapshot_id.to_string());
                }

                let origin = self.archive.origin_get(url)?.ok_or_else(|| {
                    ContextError::not_found(format!("Origin with url {} not found!", url))
                })?;
                let origin_visit = self.origin_visit(&origin, *timestamp, *visit_id, *snapshot_id)?;
                let resolved_snapshot = snapshot_id.or(origin_visit.snapshot).ok_or_else(|| {
                    ContextError::not_found(format!(
                        "No snapshot associated to the visit of origin {} on {}",
                        url,
                        format_display_date(&origin_visit.date)
                    ))
                })?;

                query_params.insert("origin_url".to_string(), origin.url.clone());
                // the visit found may not be at the exact requested timestamp
                if timestamp.is_some() {
                    query_params.insert(
                        "timestamp".to_string(),
                        format_query_timestamp(&origin_visit.date),
                    );
                }

                let scope = match visit_id {
                    Some(visit) => SearchScope::Visit {
                        url: origin.url.clone(),
                        visit: *visit,
                    },
                    None => SearchScope::Timestamp {
                        url: origin.url.clone(),
                        timestamp: format_query_timestamp(&origin_visit.date),
                    },
                };
                origin_info = Some(origin);
                visit = Some(origin_visit);
                (resolved_snapshot, scope)
            }
        };

        let (directory_url, branches_url, releases_url, origin_visits_url) = match &origin_info {
            Some(origin) => {
                let mut visits_params = BTreeMap::new();
                visits_params.insert("origin_url".to_string(), origin.url.clone());
                (
                    reverse(&origin_view_path(BrowseContext::Directory), &query_params),
                    reverse(&origin_view_path(BrowseContext::Branches), &query_params),
                    reverse(&origin_view_path(BrowseContext::Releases), &query_params),
                    Some(reverse(&origin_view_path(BrowseContext::Visits), &visits_params)),
                )
            }
            None => (
                snapshot_view_path(&snapshot_id, BrowseContext::Directory),
                snapshot_view_path(&snapshot_id, BrowseContext::Branches),
                snapshot_view_path(&snapshot_id, BrowseContext::Releases),
                None,
            ),
        };

        let visit_info = visit.map(|visit| VisitInfo {
            visit: visit.visit,
            formatted_date: format_display_date(&visit.date),
            date: visit.date,
            status: visit.status,
            visit_type: visit.visit_type,
            snapshot: visit.snapshot,
            url: directory_url.clone(),
        });

        let content = self.snapshot_content(&snapshot_id)?;
        let truncated = content.is_truncated();
        let SnapshotContent {
            mut branches,
            mut releases,
            aliases,
            ..
        } = content;
        let snapshot_sizes = self.snapshot_sizes(&snapshot_id)?;
        let is_empty = snapshot_sizes.release + snapshot_sizes.branch() == 0;

        if let Some(path) = &request.path {
            query_params.insert("path".to_string(), path.clone());
        }

        let mut selection = Selection::default();

        if let Some(revision_id) = request.revision_id {
            let revision = revision_get_one(self.archive, &revision_id)?;
            let mut branch = SnapshotBranchInfo {
                name: revision_id.to_string(),
                alias: false,
                target_type: TargetType::Revision,
                target: revision_id,
                directory: None,
                date: None,
                message: None,
                url: None,
            };
            if let Some(revision) = &revision {
                branch.directory = Some(revision.directory);
                branch.date = revision.date;
                branch.message = revision.message.clone();
            }
            selection.revision_id = Some(revision_id);
            selection.root_directory = branch.directory;
            branches.push(branch);
            query_params.insert("revision".to_string(), revision_id.to_string());
        } else if let Some(release_name) = &request.release_name {
            let release = self
                .find_release(&snapshot_id, &mut releases, release_name, truncated)?
                .ok_or_else(|| {
                    scope.not_found(BranchKind::Release, release_name, snapshot_sizes.release)
                })?;
            selection.select_release(&release);
            query_params.insert("release".to_string(), release_name.clone());
        } else if let Some(branch_name) = &request.branch_name {
            if let Some(branch) = self.find_branch(&snapshot_id, &mut branches, branch_name, truncated)? {
                selection.select_branch(&branch);
            } else if let Some(release) = releases.iter().find(|r| &r.branch_name == branch_name) {
                selection.select_release(release);
                selection.branch = Some(branch_name.clone());
                selection.branch_alias = release.alias;
            } else {
                return Err(scope.not_found(BranchKind::Branch, branch_name, snapshot_sizes.branch()));
            }
            query_params.insert("branch".to_string(), branch_name.clone());
        } else {
            let head_resolved = matches!(aliases.get("HEAD"), Some(Some(_)));
            let head_branch = branches.iter().find(|b| head_resolved && b.name == "HEAD");
            let head_release = releases.iter().find(|r| head_resolved && r.branch_name == "HEAD");

            if let Some(branch) = head_branch {
                selection.select_branch(branch);
            } else if let Some(release) = head_release {
                selection.select_release(release);
                selection.branch = Some(release.branch_name.clone());
                selection.branch_alias = true;
            } else if let Some(branch) = branches.first() {
                selection.select_branch(branch);
            } else if let Some(release) = releases.last() {
                selection.select_release(release);
            }
        }

        let mut revision_info = None;
        if let Some(revision_id) = &selection.revision_id {
            match revision_get_one(self.archive, revision_id)? {
                Some(revision) => {
                    if selection.root_directory.is_none() {
                        selection.root_directory = Some(revision.directory);
                    }
                    revision_info = Some(RevisionInfo::new(revision));
                }
                None => log::warn!("revision {} not found in archive", revision_id),
            }
        }

        let view_path = match &origin_info {
            Some(_) => origin_view_path(request.browse_context),
            None => snapshot_view_path(&snapshot_id, request.browse_context),
        };

        for branch in &mut branches {
            let mut params = query_params.clone();
            params.remove("release");
            if branch.name != branch.target.to_string() {
                params.insert("branch".to_string(), branch.name.clone());
                params.remove("revision");
            } else {
                params.remove("branch");
                params.insert("revision".to_string(), branch.target.to_string());
            }
            branch.url = Some(reverse(&view_path, &params));
        }

        for release in &mut releases {
            let mut params = query_params.clone();
            params.remove("branch");
            params.remove("revision");
            params.insert("release".to_string(), release.name.clone());
            release.url = Some(reverse(&view_path, &params));
        }

        let mut context = SnapshotContext {
            snapshot_id,
            snapshot_swhid: Swhid::new(ObjectType::Snapshot, snapshot_id).to_string(),
            branch: selection.branch,
            branch_alias: selection.branch_alias,
            release: selection.release,
            release_alias: selection.release_alias,
            release_id: selection.release_id,
            revision_id: selection.revision_id,
            revision_found: revision_info.is_some(),
            revision_info,
            root_directory: selection.root_directory,
            branches,
            releases,
            snapshot_sizes,
            is_empty,
            origin_info,
            visit_info,
            query_params,
            directory_url,
            branches_url,
            releases_url,
            origin_visits_url,
        };

        if let Some(revision_id) = context.revision_id {
            let url = gen_revision_url(&revision_id, Some(&context));
            if let Some(info) = context.revision_info.as_mut() {
                info.url = url;
            }
        }

        Ok(context)
    }

    /// Classify the single branch `name` of a snapshot, fetched by name.
    fn branch_by_name(&self, snapshot_id: &ObjectId, name: &str) -> Result<Option<SnapshotContent>> {
        let Some(target) = self.archive.snapshot_branch_get_by_name(snapshot_id, name, false)? else {
            return Ok(None);
        };
        let page = Page::single(vec![SnapshotBranch::new(name, Some(target))]);
        classify(self.archive, snapshot_id, &page).map(Some)
    }

    /// Find a branch by name, looking past a truncated listing if needed.
    fn find_branch(
        &self,
        snapshot_id: &ObjectId,
        branches: &mut Vec<SnapshotBranchInfo>,
        name: &str,
        truncated: bool,
    ) -> Result<Option<SnapshotBranchInfo>> {
        if let Some(branch) = branches.iter().find(|b| b.name == name) {
            return Ok(Some(branch.clone()));
        }
        if !truncated {
            return Ok(None);
        }

        let Some(content) = self.branch_by_name(snapshot_id, name)? else {
            return Ok(None);
        };
        match content.branches.into_iter().next() {
            Some(branch) if branch.name == name => {
                branches.push(branch.clone());
                Ok(Some(branch))
            }
            _ => Ok(None),
        }
    }

    /// Find a release by name, looking past a truncated listing under
    /// `refs/tags/<name>` then `<name>` if needed.
    fn find_release(
        &self,
        snapshot_id: &ObjectId,
        releases: &mut Vec<SnapshotReleaseInfo>,
        name: &str,
        truncated: bool,
    ) -> Result<Option<SnapshotReleaseInfo>> {
        if let Some(release) = releases.iter().find(|r| r.name == name) {
            return Ok(Some(release.clone()));
        }
        if !truncated {
            return Ok(None);
        }

        for branch_name in [format!("refs/tags/{}", name), name.to_string()] {
            let Some(content) = self.branch_by_name(snapshot_id, &branch_name)? else {
                continue;
            };
            if let Some(release) = content.releases.into_iter().next() {
                if release.name == name {
                    releases.push(release.clone());
                    return Ok(Some(release));
                }
            }
        }
        Ok(None)
    }
}
