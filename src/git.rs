//! Archive content read from a local git repository.

use std::collections::BTreeMap;
use std::path::Path;
use chrono::{DateTime, FixedOffset, Utc};
use git2::{Commit, ObjectType as GitObjectType, Oid, Repository, Signature, Tag, Time};
use crate::error::Result;
use crate::id::ObjectId;
use crate::memory::MemoryArchive;
use crate::model::{BranchTarget, OriginVisit, Release, Revision, Snapshot};
use crate::swhid::ObjectType;

fn object_id(oid: Oid) -> Result<ObjectId> {
    Ok(ObjectId::from_slice(oid.as_bytes())?)
}

fn git_date(time: Time) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)?;
    DateTime::from_timestamp(time.seconds(), 0).map(|date| date.with_timezone(&offset))
}

fn person(signature: &Signature) -> String {
    format!(
        "{} <{}>",
        String::from_utf8_lossy(signature.name_bytes()),
        String::from_utf8_lossy(signature.email_bytes())
    )
}

fn message(bytes: &[u8]) -> Option<String> {
    Some(String::from_utf8_lossy(bytes).into_owned())
}

fn revision(commit: &Commit) -> Result<Revision> {
    Ok(Revision {
        id: object_id(commit.id())?,
        directory: object_id(commit.tree_id())?,
        author: Some(person(&commit.author())),
        date: git_date(commit.author().when()),
        committer_date: git_date(commit.committer().when()),
        message: message(commit.message_bytes()),
        parents: commit.parent_ids().map(object_id).collect::<Result<_>>()?,
    })
}

fn release(tag: &Tag) -> Result<Release> {
    let target_type = match tag.target_type() {
        Some(GitObjectType::Blob) => ObjectType::Content,
        Some(GitObjectType::Tree) => ObjectType::Directory,
        Some(GitObjectType::Tag) => ObjectType::Release,
        _ => ObjectType::Revision,
    };
    Ok(Release {
        id: object_id(tag.id())?,
        name: String::from_utf8_lossy(tag.name_bytes()).into_owned(),
        author: tag.tagger().as_ref().map(person),
        date: tag.tagger().and_then(|tagger| git_date(tagger.when())),
        message: tag.message_bytes().and_then(message),
        target_type,
        target: object_id(tag.target_id())?,
    })
}

/// An archive holding one snapshot of a local git repository, visited once
/// from a `file://` origin.
#[derive(Debug)]
pub struct GitArchive {
    archive: MemoryArchive,
    origin_url: String,
    snapshot_id: ObjectId,
}

impl GitArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path.as_ref())?;
        let mut archive = MemoryArchive::new();
        let mut branches: BTreeMap<String, Option<BranchTarget>> = BTreeMap::new();

        let mut references: Vec<git2::Reference> = repo.references()?.collect::<std::result::Result<_, _>>()?;
        if let Ok(head) = repo.find_reference("HEAD") {
            references.push(head);
        }

        for reference in &references {
            let name = String::from_utf8_lossy(reference.name_bytes()).into_owned();

            if let Some(symbolic_target) = reference.symbolic_target_bytes() {
                let target = String::from_utf8_lossy(symbolic_target).into_owned();
                branches.insert(name, Some(BranchTarget::Alias(target)));
                continue;
            }

            let Some(target) = reference.target() else {
                branches.insert(name, None);
                continue;
            };
            let object = match repo.find_object(target, None) {
                Ok(object) => object,
                Err(err) => {
                    log::warn!("reference {} targets a missing object {}: {}", name, target, err);
                    branches.insert(name, None);
                    continue;
                }
            };

            let id = object_id(target)?;
            let branch_target = match object.kind() {
                Some(GitObjectType::Blob) => BranchTarget::Content(id),
                Some(GitObjectType::Tree) => BranchTarget::Directory(id),
                Some(GitObjectType::Tag) => {
                    let tag = object.peel_to_tag()?;
                    archive.add_release(release(&tag)?);
                    if let Ok(commit) = tag.target()?.peel_to_commit() {
                        archive.add_revision(revision(&commit)?);
                    }
                    BranchTarget::Release(id)
                }
                _ => {
                    let commit = object.peel_to_commit()?;
                    archive.add_revision(revision(&commit)?);
                    BranchTarget::Revision(id)
                }
            };
            branches.insert(name, Some(branch_target));
        }

        let snapshot = Snapshot::new(branches);
        let snapshot_id = snapshot.id;

        let workdir = repo.workdir().unwrap_or_else(|| repo.path());
        let origin_url = format!("file://{}", workdir.canonicalize()?.display());
        archive.add_snapshot(snapshot);
        archive.add_visit(OriginVisit {
            origin: origin_url.clone(),
            visit: 1,
            date: Utc::now(),
            status: "full".to_string(),
            visit_type: Some("git".to_string()),
            snapshot: Some(snapshot_id),
        });

        log::info!(
            "read git repository {} as snapshot {} ({} references)",
            origin_url,
            snapshot_id,
            references.len()
        );

        Ok(Self {
            archive,
            origin_url,
            snapshot_id,
        })
    }

    pub fn origin_url(&self) -> &str {
        &self.origin_url
    }

    pub fn snapshot_id(&self) -> ObjectId {
        self.snapshot_id
    }

    pub fn archive(&self) -> &MemoryArchive {
        &self.archive
    }

    pub fn into_archive(self) -> MemoryArchive {
        self.archive
    }
}
