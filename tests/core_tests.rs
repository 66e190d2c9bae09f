use swhid_context::{
    Archive, BranchQuery, BranchTarget, ContextRequest, MemoryArchive, ObjectId, ObjectType,
    QualifiedSwhid, Snapshot, SnapshotContextBuilder, Swhid, SwhidError, TargetType, VisitSelector,
};

const FIXTURE: &str = r#"{
    "snapshots": [
        {
            "id": "0000000000000000000000000000000000000000",
            "branches": {
                "HEAD": {"target_type": "alias", "target": "refs/heads/master"},
                "refs/heads/master": {"target_type": "revision", "target": "1111111111111111111111111111111111111111"},
                "refs/tags/v1": {"target_type": "release", "target": "2222222222222222222222222222222222222222"},
                "refs/heads/broken": null
            }
        }
    ],
    "revisions": [
        {
            "id": "1111111111111111111111111111111111111111",
            "directory": "3333333333333333333333333333333333333333",
            "author": "Jane Doe <jane@example.org>",
            "date": "2020-05-01T12:00:00+02:00",
            "committer_date": "2020-05-01T12:00:00+02:00",
            "message": "Initial import",
            "parents": []
        }
    ],
    "releases": [
        {
            "id": "2222222222222222222222222222222222222222",
            "name": "v1",
            "target_type": "revision",
            "target": "1111111111111111111111111111111111111111"
        }
    ],
    "origins": [
        {
            "url": "https://example.org/project",
            "visits": [
                {"visit": 1, "date": "2020-06-01T00:00:00Z", "type": "git", "snapshot": "0000000000000000000000000000000000000000"}
            ]
        }
    ]
}"#;

#[test]
fn test_swhid_parsing() {
    let valid_swhid = "swh:1:cnt:0000000000000000000000000000000000000000";
    let parsed = Swhid::from_string(valid_swhid).unwrap();
    assert_eq!(parsed.object_type(), ObjectType::Content);
    assert_eq!(parsed.to_string(), valid_swhid);

    assert!(Swhid::from_string("invalid").is_err());
    assert!(Swhid::from_string("swh:2:cnt:0000000000000000000000000000000000000000").is_err());
    assert!(Swhid::from_string("swh:1:invalid:0000000000000000000000000000000000000000").is_err());
    assert!(Swhid::from_string("swh:1:cnt:00000000000000000000000000000000000000").is_err());
}

#[test]
fn test_qualified_swhid_conformance() {
    let qualified = QualifiedSwhid::new(ObjectType::Content, ObjectId::default())
        .with_origin("https://github.com/user/repo".to_string())
        .with_visit(Swhid::new(ObjectType::Snapshot, ObjectId::new([1; 20])))
        .with_path(b"/src/main.rs".to_vec())
        .with_lines(10, Some(20));

    assert_eq!(qualified.object_type(), ObjectType::Content);
    assert_eq!(qualified.origin(), Some("https://github.com/user/repo"));
    assert_eq!(qualified.lines(), Some((10, Some(20))));
    assert_eq!(
        qualified.to_string(),
        "swh:1:cnt:0000000000000000000000000000000000000000;origin=https://github.com/user/repo;\
         visit=swh:1:snp:0101010101010101010101010101010101010101;path=/src/main.rs;lines=10-20"
    );
}

#[test]
fn test_qualified_swhid_parsing() {
    let s = "swh:1:cnt:0000000000000000000000000000000000000000;origin=https://github.com/user/repo;path=/src/main.rs;lines=10-20";
    let qualified = QualifiedSwhid::from_string(s).unwrap();
    assert_eq!(qualified.origin(), Some("https://github.com/user/repo"));
    assert_eq!(qualified.path(), Some(b"/src/main.rs".as_slice()));
    assert_eq!(qualified.lines(), Some((10, Some(20))));

    let s = "swh:1:cnt:0000000000000000000000000000000000000000;lines=15";
    let qualified = QualifiedSwhid::from_string(s).unwrap();
    assert_eq!(qualified.lines(), Some((15, None)));
}

#[test]
fn test_qualified_swhid_validation() {
    let core = "swh:1:cnt:0000000000000000000000000000000000000000";

    let visit = format!("{};visit=swh:1:snp:{}", core, "1".repeat(40));
    assert!(QualifiedSwhid::from_string(&visit).unwrap().visit().is_some());

    let invalid_visit = format!("{};visit=swh:1:cnt:{}", core, "1".repeat(40));
    assert!(matches!(
        QualifiedSwhid::from_string(&invalid_visit),
        Err(SwhidError::InvalidQualifierValue(_))
    ));

    let invalid_anchor = format!("{};anchor=swh:1:cnt:{}", core, "2".repeat(40));
    assert!(QualifiedSwhid::from_string(&invalid_anchor).is_err());

    let unknown = format!("{};color=blue", core);
    assert!(matches!(
        QualifiedSwhid::from_string(&unknown),
        Err(SwhidError::UnknownQualifier(_))
    ));
}

#[test]
fn test_fixture_loading() {
    let archive = MemoryArchive::from_reader(FIXTURE.as_bytes()).unwrap();
    let snapshot_id = ObjectId::default();

    let page = archive
        .snapshot_get_branches(&snapshot_id, &BranchQuery::new(10))
        .unwrap()
        .unwrap();
    assert_eq!(page.len(), 4);
    assert_eq!(
        page.items[0].target,
        Some(BranchTarget::Alias("refs/heads/master".to_string()))
    );

    let visit = archive
        .origin_visit_get("https://example.org/project", &VisitSelector::Latest)
        .unwrap()
        .unwrap();
    assert_eq!(visit.origin, "https://example.org/project");
    assert_eq!(visit.status, "full");
    assert_eq!(visit.snapshot, Some(snapshot_id));

    let counts = archive.snapshot_count_branches(&snapshot_id, None).unwrap().unwrap();
    assert_eq!(counts.get(&TargetType::Revision), Some(&1));
}

#[test]
fn test_fixture_context() {
    let archive = MemoryArchive::from_reader(FIXTURE.as_bytes()).unwrap();
    let ctx = SnapshotContextBuilder::new(&archive)
        .build(&ContextRequest::origin("https://example.org/project"))
        .unwrap();

    assert_eq!(ctx.branch.as_deref(), Some("HEAD"));
    assert_eq!(ctx.root_directory, Some(ObjectId::new([0x33; 20])));
    assert_eq!(ctx.releases.len(), 1);
    assert_eq!(ctx.releases[0].directory, Some(ObjectId::new([0x33; 20])));

    let json = serde_json::to_value(&ctx).unwrap();
    assert_eq!(json["branch"], "HEAD");
    assert_eq!(json["visit_info"]["type"], "git");
    assert_eq!(json["revision_info"]["message_header"], "Initial import");
}

#[test]
fn test_snapshot_identifier() {
    let empty = Snapshot::new(Default::default());
    assert_eq!(
        empty.swhid().to_string(),
        "swh:1:snp:1a8893e6a86f444e8be8e7bda6cb34fb1735a00e"
    );
}
