//! Qualified SWHIDs for browsed objects, and their resolution back to browse URLs.

use std::collections::BTreeMap;
use serde::Serialize;
use crate::archive::{release_get_one, revision_get_one, Archive};
use crate::context::SnapshotContext;
use crate::error::{ContextError, Result};
use crate::id::ObjectId;
use crate::swhid::{escape_qualifier, ObjectType, QualifiedSwhid, Swhid};
use crate::urls::{object_path, reverse, swhid_path};

/// An archived object to compute SWHIDs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwhidObject {
    pub object_type: ObjectType,
    /// `None` when the object is not known, which yields empty identifiers.
    pub object_id: Option<ObjectId>,
}

impl SwhidObject {
    pub fn new(object_type: ObjectType, object_id: ObjectId) -> Self {
        Self {
            object_type,
            object_id: Some(object_id),
        }
    }
}

/// Hints about where an object sits, for browse views without a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraContext {
    pub revision: Option<ObjectId>,
    pub root_directory: Option<ObjectId>,
    /// Directory path of the object, relative to the root directory.
    pub path: Option<String>,
    /// Name of a content object inside `path`.
    pub filename: Option<String>,
    pub lines: Option<(u32, Option<u32>)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwhidInfo {
    pub object_type: ObjectType,
    pub object_id: String,
    pub swhid: String,
    pub swhid_url: String,
    /// Escaped qualifier values, by qualifier name.
    pub context: BTreeMap<String, String>,
    pub swhid_with_context: Option<String>,
    pub swhid_with_context_url: Option<String>,
}

impl SwhidInfo {
    fn empty(object_type: ObjectType) -> Self {
        Self {
            object_type,
            object_id: String::new(),
            swhid: String::new(),
            swhid_url: String::new(),
            context: BTreeMap::new(),
            swhid_with_context: None,
            swhid_with_context_url: None,
        }
    }
}

fn qualifier_path(extra: &ExtraContext, object_type: ObjectType) -> Option<String> {
    let path = extra.path.as_deref().unwrap_or("/");
    let mut path = if path.is_empty() { "/".to_string() } else { path.to_string() };
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if object_type == ObjectType::Content {
        if let Some(filename) = &extra.filename {
            if !path.ends_with('/') {
                path.push('/');
            }
            path.push_str(filename);
        }
    }
    if object_type == ObjectType::Directory && path == "/" {
        return None;
    }
    Some(path)
}

fn qualify(
    object_type: ObjectType,
    object_id: ObjectId,
    snapshot_context: Option<&SnapshotContext>,
    extra_context: Option<&ExtraContext>,
) -> QualifiedSwhid {
    let mut qualified = QualifiedSwhid::new(object_type, object_id);
    let browsed_in_directory = matches!(object_type, ObjectType::Content | ObjectType::Directory);
    let mut anchor = None;

    if let Some(ctx) = snapshot_context {
        if let Some(origin) = &ctx.origin_info {
            qualified = qualified.with_origin(origin.url.clone());
        }
        if object_type != ObjectType::Snapshot {
            qualified = qualified.with_visit(Swhid::new(ObjectType::Snapshot, ctx.snapshot_id));
        }
        if browsed_in_directory {
            anchor = ctx
                .release_id
                .map(|id| Swhid::new(ObjectType::Release, id))
                .or_else(|| ctx.revision_id.map(|id| Swhid::new(ObjectType::Revision, id)));
        }
    }

    if browsed_in_directory {
        if let Some(extra) = extra_context {
            anchor = anchor
                .or_else(|| extra.revision.map(|id| Swhid::new(ObjectType::Revision, id)))
                .or_else(|| {
                    extra
                        .root_directory
                        .filter(|root| !(object_type == ObjectType::Directory && *root == object_id))
                        .map(|id| Swhid::new(ObjectType::Directory, id))
                });
            if let Some(path) = qualifier_path(extra, object_type) {
                qualified = qualified.with_path(path.into_bytes());
            }
            if let (ObjectType::Content, Some((start, end))) = (object_type, extra.lines) {
                qualified = qualified.with_lines(start, end);
            }
        }
    }

    if let Some(anchor) = anchor {
        qualified = qualified.with_anchor(anchor);
    }
    qualified
}

fn escaped_qualifiers(qualified: &QualifiedSwhid) -> BTreeMap<String, String> {
    let mut context = BTreeMap::new();
    if let Some(origin) = qualified.origin() {
        context.insert("origin".to_string(), escape_qualifier(origin.as_bytes()));
    }
    if let Some(visit) = qualified.visit() {
        context.insert("visit".to_string(), visit.to_string());
    }
    if let Some(anchor) = qualified.anchor() {
        context.insert("anchor".to_string(), anchor.to_string());
    }
    if let Some(path) = qualified.path() {
        context.insert("path".to_string(), escape_qualifier(path));
    }
    if let Some((start, end)) = qualified.lines() {
        let lines = match end {
            Some(end) => format!("{}-{}", start, end),
            None => start.to_string(),
        };
        context.insert("lines".to_string(), lines);
    }
    context
}

/// Compute the core and, when any context applies, the qualified SWHID of
/// each object along with the URLs browsing them.
pub fn get_swhids_info(
    objects: &[SwhidObject],
    snapshot_context: Option<&SnapshotContext>,
    extra_context: Option<&ExtraContext>,
) -> Vec<SwhidInfo> {
    objects
        .iter()
        .map(|object| {
            let Some(object_id) = object.object_id else {
                return SwhidInfo::empty(object.object_type);
            };
            let qualified = qualify(object.object_type, object_id, snapshot_context, extra_context);
            let swhid = qualified.core().to_string();
            let swhid_url = swhid_path(&swhid);
            let (context, swhid_with_context, swhid_with_context_url) = if qualified.has_qualifiers() {
                let with_context = qualified.to_string();
                let url = swhid_path(&with_context);
                (escaped_qualifiers(&qualified), Some(with_context), Some(url))
            } else {
                (BTreeMap::new(), None, None)
            };
            SwhidInfo {
                object_type: object.object_type,
                object_id: object_id.to_string(),
                swhid,
                swhid_url,
                context,
                swhid_with_context,
                swhid_with_context_url,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSwhid {
    pub swhid_parsed: QualifiedSwhid,
    pub browse_url: String,
}

/// Root directory an anchor designates, when it has one.
fn anchor_directory<A: Archive + ?Sized>(archive: &A, anchor: &Swhid) -> Result<Option<ObjectId>> {
    let revision_directory = |id: &ObjectId| -> Result<ObjectId> {
        revision_get_one(archive, id)?
            .map(|revision| revision.directory)
            .ok_or_else(|| ContextError::not_found(format!("Revision with id {} not found!", id)))
    };
    match anchor.object_type() {
        ObjectType::Directory => Ok(Some(*anchor.object_id())),
        ObjectType::Revision => revision_directory(anchor.object_id()).map(Some),
        ObjectType::Release => {
            let release = release_get_one(archive, anchor.object_id())?.ok_or_else(|| {
                ContextError::not_found(format!("Release with id {} not found!", anchor.object_id()))
            })?;
            if release.target_type == ObjectType::Revision {
                revision_directory(&release.target).map(Some)
            } else {
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}

/// Compute the browse URL of a SWHID, qualified or not.
///
/// `query_params` are extra parameters added to the URL.
pub fn resolve_swhid<A: Archive + ?Sized>(
    archive: &A,
    swhid: &str,
    query_params: Option<&BTreeMap<String, String>>,
) -> Result<ResolvedSwhid> {
    let swhid_parsed = QualifiedSwhid::from_string(swhid)?;
    let mut object_type = swhid_parsed.object_type();
    let mut object_id = *swhid_parsed.object_id();
    let mut params = query_params.cloned().unwrap_or_default();

    if let Some(origin) = swhid_parsed.origin() {
        let origin = archive.origin_get(origin)?.ok_or_else(|| {
            ContextError::not_found(format!("Origin with url {} not found!", origin))
        })?;
        params.insert("origin_url".to_string(), origin.url);
    }

    if let Some(path) = swhid_parsed.path().filter(|path| *path != b"/") {
        let path = String::from_utf8_lossy(path).into_owned();
        let mut browse_path = path.clone();
        if let Some(anchor) = swhid_parsed.anchor() {
            let directory = anchor_directory(archive, anchor)?;
            match object_type {
                ObjectType::Content => {
                    let prefix_root = swhid_parsed.origin().is_none()
                        && anchor.object_type() != ObjectType::Revision;
                    browse_path = match directory {
                        // breadcrumbs start from the root directory
                        Some(directory) if prefix_root => format!("{}{}", directory, path),
                        _ => path.trim_start_matches('/').to_string(),
                    };
                }
                ObjectType::Directory => {
                    if let Some(directory) = directory {
                        object_id = directory;
                    }
                    let relative = path.strip_prefix('/').unwrap_or(&path);
                    browse_path = relative.strip_suffix('/').unwrap_or(relative).to_string();
                }
                _ => {}
            }
        }
        params.insert("path".to_string(), browse_path);
    }

    if let Some(visit) = swhid_parsed.visit() {
        if visit.object_type() != ObjectType::Snapshot {
            return Err(ContextError::bad_input("Visit must be a snapshot SWHID."));
        }
        params.insert("snapshot".to_string(), visit.object_id().to_string());
        if let Some(anchor) = swhid_parsed.anchor() {
            match anchor.object_type() {
                ObjectType::Revision if object_type != ObjectType::Revision => {
                    params.insert("revision".to_string(), anchor.object_id().to_string());
                }
                ObjectType::Release => {
                    if let Some(release) = release_get_one(archive, anchor.object_id())? {
                        params.insert("release".to_string(), release.name);
                    }
                }
                _ => {}
            }
        }
    } else if let Some(anchor) = swhid_parsed.anchor() {
        match (object_type, anchor.object_type()) {
            (ObjectType::Content | ObjectType::Directory, ObjectType::Revision) => {
                object_type = ObjectType::Revision;
                object_id = *anchor.object_id();
            }
            (ObjectType::Directory, ObjectType::Directory) => {
                object_id = *anchor.object_id();
            }
            _ => {}
        }
    }

    let mut browse_url = reverse(&object_path(object_type, &object_id), &params);
    if let (ObjectType::Content, Some((start, end))) = (swhid_parsed.object_type(), swhid_parsed.lines()) {
        browse_url.push_str(&format!("#L{}", start));
        if let Some(end) = end {
            browse_url.push_str(&format!("-L{}", end));
        }
    }

    Ok(ResolvedSwhid { swhid_parsed, browse_url })
}
