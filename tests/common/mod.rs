#![allow(dead_code)]

use std::collections::BTreeMap;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use swhid_context::{
    BranchTarget, MemoryArchive, ObjectId, ObjectType, OriginVisit, Release, Revision, Snapshot,
};

pub const ORIGIN_URL: &str = "https://git.example.org/project.git";

pub fn id(b: u8) -> ObjectId {
    ObjectId::new([b; 20])
}

pub fn date(day: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .and_then(|tz| tz.with_ymd_and_hms(2021, 3, day, 12, 0, 0).single())
        .expect("valid date")
}

pub fn revision(rev: u8, dir: u8) -> Revision {
    Revision {
        id: id(rev),
        directory: id(dir),
        author: Some("Jane Doe <jane@example.org>".to_string()),
        date: Some(date(rev as u32 % 28 + 1)),
        committer_date: Some(date(rev as u32 % 28 + 1)),
        message: Some(format!("Commit {}\n\nDetails of commit {}", rev, rev)),
        parents: vec![],
    }
}

pub fn release(rel: u8, name: &str, target_type: ObjectType, target: u8) -> Release {
    Release {
        id: id(rel),
        name: name.to_string(),
        author: None,
        date: Some(date(1)),
        message: Some(format!("Release {}", name)),
        target_type,
        target: id(target),
    }
}

pub fn snapshot(branches: &[(&str, Option<BranchTarget>)]) -> Snapshot {
    Snapshot::new(
        branches
            .iter()
            .map(|(name, target)| (name.to_string(), target.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

pub fn visit(visit: u64, day: u32, snapshot: Option<ObjectId>) -> OriginVisit {
    OriginVisit {
        origin: ORIGIN_URL.to_string(),
        visit,
        date: Utc.with_ymd_and_hms(2021, 4, day, 10, 30, 0).unwrap(),
        status: "full".to_string(),
        visit_type: Some("git".to_string()),
        snapshot,
    }
}

/// A repository with a `HEAD` alias, two branches, a pull request branch,
/// two tags and a dangling branch, visited twice.
pub struct Fixture {
    pub archive: MemoryArchive,
    pub snapshot: Snapshot,
    pub older_snapshot: Snapshot,
}

pub fn fixture() -> Fixture {
    let mut archive = MemoryArchive::new();
    archive.add_revision(revision(1, 11));
    archive.add_revision(revision(2, 12));
    archive.add_revision(revision(3, 13));
    archive.add_release(release(21, "v1.0", ObjectType::Revision, 2));
    archive.add_release(release(22, "v2.0", ObjectType::Revision, 1));

    let snapshot = snapshot(&[
        ("HEAD", Some(BranchTarget::Alias("refs/heads/main".into()))),
        ("refs/heads/develop", Some(BranchTarget::Revision(id(3)))),
        ("refs/heads/main", Some(BranchTarget::Revision(id(1)))),
        ("refs/pull/7/head", Some(BranchTarget::Revision(id(3)))),
        ("refs/tags/v1.0", Some(BranchTarget::Release(id(21)))),
        ("refs/tags/v2.0", Some(BranchTarget::Release(id(22)))),
        ("refs/heads/gone", None),
    ]);
    let older_snapshot = snapshot_older();

    archive.add_snapshot(snapshot.clone());
    archive.add_snapshot(older_snapshot.clone());
    archive.add_visit(visit(1, 1, Some(older_snapshot.id)));
    archive.add_visit(visit(2, 15, Some(snapshot.id)));
    archive.add_visit(visit(3, 20, None));

    Fixture {
        archive,
        snapshot,
        older_snapshot,
    }
}

fn snapshot_older() -> Snapshot {
    snapshot(&[
        ("HEAD", Some(BranchTarget::Alias("refs/heads/main".into()))),
        ("refs/heads/main", Some(BranchTarget::Revision(id(2)))),
        ("refs/tags/v1.0", Some(BranchTarget::Release(id(21)))),
    ])
}
