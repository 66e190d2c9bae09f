//! Archive records consumed by the snapshot context machinery.

use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use crate::hash::hash_git_object;
use crate::id::ObjectId;
use crate::swhid::{ObjectType, Swhid};

/// Kind of object a snapshot branch points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Content,
    Directory,
    Revision,
    Release,
    Alias,
}

impl TargetType {
    pub const ALL: [TargetType; 5] = [
        TargetType::Content,
        TargetType::Directory,
        TargetType::Revision,
        TargetType::Release,
        TargetType::Alias,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Content => "content",
            TargetType::Directory => "directory",
            TargetType::Revision => "revision",
            TargetType::Release => "release",
            TargetType::Alias => "alias",
        }
    }

    /// The SWHID object type of the target, `None` for aliases.
    pub fn object_type(&self) -> Option<ObjectType> {
        match self {
            TargetType::Content => Some(ObjectType::Content),
            TargetType::Directory => Some(ObjectType::Directory),
            TargetType::Revision => Some(ObjectType::Revision),
            TargetType::Release => Some(ObjectType::Release),
            TargetType::Alias => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a snapshot branch: an object hash, or another branch name for aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target_type", content = "target", rename_all = "lowercase")]
pub enum BranchTarget {
    Content(ObjectId),
    Directory(ObjectId),
    Revision(ObjectId),
    Release(ObjectId),
    Alias(String),
}

impl BranchTarget {
    pub fn target_type(&self) -> TargetType {
        match self {
            BranchTarget::Content(_) => TargetType::Content,
            BranchTarget::Directory(_) => TargetType::Directory,
            BranchTarget::Revision(_) => TargetType::Revision,
            BranchTarget::Release(_) => TargetType::Release,
            BranchTarget::Alias(_) => TargetType::Alias,
        }
    }

    /// The targeted object id, `None` for aliases.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            BranchTarget::Content(id)
            | BranchTarget::Directory(id)
            | BranchTarget::Revision(id)
            | BranchTarget::Release(id) => Some(*id),
            BranchTarget::Alias(_) => None,
        }
    }

    fn manifest_target(&self) -> Vec<u8> {
        match self {
            BranchTarget::Alias(name) => name.as_bytes().to_vec(),
            other => other
                .object_id()
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        }
    }
}

/// One entry of a snapshot branch listing; a `None` target is a dangling branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBranch {
    pub name: String,
    pub target: Option<BranchTarget>,
}

impl SnapshotBranch {
    pub fn new(name: impl Into<String>, target: Option<BranchTarget>) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: ObjectId,
    pub branches: BTreeMap<String, Option<BranchTarget>>,
}

impl Snapshot {
    /// Build a snapshot whose id is computed from its branches.
    pub fn new(branches: BTreeMap<String, Option<BranchTarget>>) -> Self {
        let id = Self::compute_id(&branches);
        Self { id, branches }
    }

    /// Intrinsic identifier of a branch map.
    pub fn compute_id(branches: &BTreeMap<String, Option<BranchTarget>>) -> ObjectId {
        let mut manifest = Vec::new();
        for (name, target) in branches {
            let (target_type, target_id) = match target {
                Some(target) => (target.target_type().as_str(), target.manifest_target()),
                None => ("dangling", Vec::new()),
            };
            manifest.extend_from_slice(target_type.as_bytes());
            manifest.push(b' ');
            manifest.extend_from_slice(name.as_bytes());
            manifest.push(0);
            manifest.extend_from_slice(format!("{}:", target_id.len()).as_bytes());
            manifest.extend_from_slice(&target_id);
        }
        ObjectId::new(hash_git_object("snapshot", &manifest))
    }

    pub fn swhid(&self) -> Swhid {
        Swhid::new(ObjectType::Snapshot, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: ObjectId,
    pub directory: ObjectId,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub committer_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub parents: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub message: Option<String>,
    pub target_type: ObjectType,
    pub target: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginInfo {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginVisit {
    #[serde(default)]
    pub origin: String,
    pub visit: u64,
    pub date: DateTime<Utc>,
    #[serde(default = "default_visit_status")]
    pub status: String,
    #[serde(rename = "type", default)]
    pub visit_type: Option<String>,
    #[serde(default)]
    pub snapshot: Option<ObjectId>,
}

fn default_visit_status() -> String {
    "full".to_string()
}

/// Per target type branch counts of a snapshot, as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSizes {
    pub alias: u64,
    pub release: u64,
    pub revision: u64,
    pub content: u64,
    pub directory: u64,
}

impl SnapshotSizes {
    pub fn from_counts(counts: &BTreeMap<TargetType, u64>) -> Self {
        let get = |t: TargetType| counts.get(&t).copied().unwrap_or(0);
        Self {
            alias: get(TargetType::Alias),
            release: get(TargetType::Release),
            revision: get(TargetType::Revision),
            content: get(TargetType::Content),
            directory: get(TargetType::Directory),
        }
    }

    /// Number of non-release, non-alias branches.
    pub fn branch(&self) -> u64 {
        self.content + self.directory + self.revision
    }

    /// Number of branches, aliases excluded.
    pub fn total(&self) -> u64 {
        self.branch() + self.release
    }
}
