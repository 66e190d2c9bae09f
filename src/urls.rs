//! Browse URL generation.

use std::collections::BTreeMap;
use std::fmt;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use crate::context::SnapshotContext;
use crate::id::ObjectId;
use crate::swhid::ObjectType;

/// Query values keep `/;:` and the unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/')
    .remove(b';')
    .remove(b':');

/// Path segments keep sub-delimiters, `/`, `:` and `@`; `%` is escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'/')
    .remove(b':')
    .remove(b'@');

/// Browse view a snapshot context generates its navigation URLs for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrowseContext {
    Content,
    #[default]
    Directory,
    Log,
    Branches,
    Releases,
    Visits,
}

impl BrowseContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowseContext::Content => "content",
            BrowseContext::Directory => "directory",
            BrowseContext::Log => "log",
            BrowseContext::Branches => "branches",
            BrowseContext::Releases => "releases",
            BrowseContext::Visits => "visits",
        }
    }
}

impl fmt::Display for BrowseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn encode_query_value(value: &str) -> String {
    // A literal '%' is escaped as %25, so every %20 left comes from a space.
    utf8_percent_encode(value, QUERY_VALUE)
        .to_string()
        .replace("%20", "+")
}

pub fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Append query parameters, sorted by name, to a URL path.
pub fn reverse(path: &str, query_params: &BTreeMap<String, String>) -> String {
    if query_params.is_empty() {
        return path.to_string();
    }
    let query = query_params
        .iter()
        .map(|(key, value)| format!("{}={}", encode_query_value(key), encode_query_value(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", path, query)
}

pub fn origin_view_path(view: BrowseContext) -> String {
    format!("/browse/origin/{}/", view)
}

pub fn snapshot_view_path(snapshot_id: &ObjectId, view: BrowseContext) -> String {
    format!("/browse/snapshot/{}/{}/", snapshot_id, view)
}

/// Path of the browse view of a single archived object.
pub fn object_path(object_type: ObjectType, object_id: &ObjectId) -> String {
    match object_type {
        ObjectType::Content => format!("/browse/content/sha1_git:{}/", object_id),
        other => format!("/browse/{}/{}/", other.name(), object_id),
    }
}

/// Path resolving a SWHID, qualified or not; the SWHID is escaped once more.
pub fn swhid_path(swhid: &str) -> String {
    format!("/{}/", encode_path_segment(swhid))
}

/// Query parameters pinning the origin visit or snapshot of a context.
pub fn context_query_params(snapshot_context: Option<&SnapshotContext>) -> BTreeMap<String, String> {
    let mut query_params = BTreeMap::new();
    let Some(ctx) = snapshot_context else {
        return query_params;
    };
    match &ctx.origin_info {
        Some(origin) => {
            query_params.insert("origin_url".to_string(), origin.url.clone());
            for key in ["timestamp", "visit_id", "snapshot"] {
                if let Some(value) = ctx.query_params.get(key) {
                    query_params.insert(key.to_string(), value.clone());
                }
            }
        }
        None => {
            query_params.insert("snapshot".to_string(), ctx.snapshot_id.to_string());
        }
    }
    query_params
}

pub fn gen_revision_url(revision_id: &ObjectId, snapshot_context: Option<&SnapshotContext>) -> String {
    reverse(
        &object_path(ObjectType::Revision, revision_id),
        &context_query_params(snapshot_context),
    )
}

pub fn gen_release_url(release_id: &ObjectId, snapshot_context: Option<&SnapshotContext>) -> String {
    reverse(
        &object_path(ObjectType::Release, release_id),
        &context_query_params(snapshot_context),
    )
}
