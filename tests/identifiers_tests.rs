mod common;

use common::*;
use swhid_context::{
    get_swhids_info, resolve_swhid, ContextRequest, ExtraContext, MemoryArchive, ObjectType,
    OriginVisit, QualifiedSwhid, SnapshotContext, SnapshotContextBuilder, SwhidObject,
};

fn origin_context(archive: &MemoryArchive) -> SnapshotContext {
    SnapshotContextBuilder::new(archive)
        .build(&ContextRequest::origin(ORIGIN_URL))
        .unwrap()
}

#[test_log::test]
fn test_directory_round_trip() {
    let fixture = fixture();
    let ctx = origin_context(&fixture.archive);
    let extra = ExtraContext {
        path: Some("/src/".to_string()),
        ..Default::default()
    };

    let infos = get_swhids_info(&[SwhidObject::new(ObjectType::Directory, id(50))], Some(&ctx), Some(&extra));
    let info = &infos[0];
    let snapshot_id = fixture.snapshot.id;
    let expected = format!(
        "swh:1:dir:{};origin={};visit=swh:1:snp:{};anchor=swh:1:rev:{};path=/src/",
        id(50),
        ORIGIN_URL,
        snapshot_id,
        id(1)
    );
    assert_eq!(info.swhid_with_context.as_deref(), Some(expected.as_str()));
    assert_eq!(info.context["visit"], format!("swh:1:snp:{}", snapshot_id));

    let qualified = info.swhid_with_context.as_deref().unwrap();
    assert_eq!(QualifiedSwhid::from_string(qualified).unwrap().to_string(), qualified);

    let resolved = resolve_swhid(&fixture.archive, qualified, None).unwrap();
    assert_eq!(
        resolved.browse_url,
        format!(
            "/browse/directory/{}/?origin_url={}&path=src&revision={}&snapshot={}",
            id(11),
            ORIGIN_URL,
            id(1),
            snapshot_id
        )
    );
}

#[test_log::test]
fn test_content_round_trip_with_lines() {
    let fixture = fixture();
    let ctx = origin_context(&fixture.archive);
    let extra = ExtraContext {
        path: Some("/src/".to_string()),
        filename: Some("lib.rs".to_string()),
        lines: Some((1, Some(5))),
        ..Default::default()
    };

    let infos = get_swhids_info(&[SwhidObject::new(ObjectType::Content, id(60))], Some(&ctx), Some(&extra));
    let qualified = infos[0].swhid_with_context.clone().unwrap();
    assert!(qualified.ends_with(";path=/src/lib.rs;lines=1-5"));

    let resolved = resolve_swhid(&fixture.archive, &qualified, None).unwrap();
    assert_eq!(
        resolved.browse_url,
        format!(
            "/browse/content/sha1_git:{}/?origin_url={}&path=src/lib.rs&revision={}&snapshot={}#L1-L5",
            id(60),
            ORIGIN_URL,
            id(1),
            fixture.snapshot.id
        )
    );
}

#[test_log::test]
fn test_release_anchor_round_trip() {
    let fixture = fixture();
    let ctx = SnapshotContextBuilder::new(&fixture.archive)
        .build(&ContextRequest::origin(ORIGIN_URL).with_release("v1.0"))
        .unwrap();
    let root = ctx.root_directory.unwrap();
    let extra = ExtraContext {
        root_directory: Some(root),
        path: Some("/".to_string()),
        ..Default::default()
    };

    let infos = get_swhids_info(&[SwhidObject::new(ObjectType::Directory, root)], Some(&ctx), Some(&extra));
    let info = &infos[0];
    assert_eq!(info.context["anchor"], format!("swh:1:rel:{}", id(21)));
    assert!(!info.context.contains_key("path"));

    let resolved = resolve_swhid(&fixture.archive, info.swhid_with_context.as_deref().unwrap(), None).unwrap();
    assert_eq!(
        resolved.browse_url,
        format!(
            "/browse/directory/{}/?origin_url={}&release=v1.0&snapshot={}",
            id(12),
            ORIGIN_URL,
            fixture.snapshot.id
        )
    );
}

#[test_log::test]
fn test_root_directory_without_snapshot_context() {
    let extra = ExtraContext {
        root_directory: Some(id(11)),
        path: Some("/".to_string()),
        ..Default::default()
    };
    let infos = get_swhids_info(&[SwhidObject::new(ObjectType::Directory, id(11))], None, Some(&extra));
    assert_eq!(infos[0].swhid, format!("swh:1:dir:{}", id(11)));
    assert!(infos[0].context.is_empty());
    assert!(infos[0].swhid_with_context.is_none());
}

#[test_log::test]
fn test_snapshot_and_revision_qualifiers() {
    let fixture = fixture();
    let ctx = origin_context(&fixture.archive);
    let infos = get_swhids_info(
        &[
            SwhidObject::new(ObjectType::Snapshot, fixture.snapshot.id),
            SwhidObject::new(ObjectType::Revision, id(1)),
        ],
        Some(&ctx),
        None,
    );

    let snapshot = &infos[0];
    assert!(!snapshot.context.contains_key("visit"));
    assert_eq!(
        snapshot.swhid_with_context.as_deref(),
        Some(format!("swh:1:snp:{};origin={}", fixture.snapshot.id, ORIGIN_URL).as_str())
    );

    // only contents and directories get anchors
    let revision = &infos[1];
    assert!(!revision.context.contains_key("anchor"));
    assert_eq!(revision.context["visit"], format!("swh:1:snp:{}", fixture.snapshot.id));
}

#[test_log::test]
fn test_reserved_characters_are_escaped_twice() {
    let origin = "https://example.org/a;b?c d";
    let mut archive = MemoryArchive::new();
    let snapshot = snapshot(&[]);
    archive.add_snapshot(snapshot.clone());
    archive.add_visit(OriginVisit {
        origin: origin.to_string(),
        ..visit(1, 1, Some(snapshot.id))
    });

    let ctx = SnapshotContextBuilder::new(&archive)
        .build(&ContextRequest::origin(origin))
        .unwrap();
    let extra = ExtraContext {
        path: Some("/a dir/".to_string()),
        filename: Some("100%.txt".to_string()),
        ..Default::default()
    };
    let infos = get_swhids_info(&[SwhidObject::new(ObjectType::Content, id(5))], Some(&ctx), Some(&extra));
    let info = &infos[0];

    assert_eq!(info.context["origin"], "https://example.org/a%3Bb%3Fc%20d");
    assert_eq!(info.context["path"], "/a%20dir/100%25.txt");
    let qualified = info.swhid_with_context.as_deref().unwrap();
    assert_eq!(
        qualified,
        format!(
            "swh:1:cnt:{};origin=https://example.org/a%3Bb%3Fc%20d;visit=swh:1:snp:{};path=/a%20dir/100%25.txt",
            id(5),
            snapshot.id
        )
    );
    assert_eq!(
        info.swhid_with_context_url.as_deref(),
        Some(
            format!(
                "/swh:1:cnt:{};origin=https://example.org/a%253Bb%253Fc%2520d;visit=swh:1:snp:{};path=/a%2520dir/100%2525.txt/",
                id(5),
                snapshot.id
            )
            .as_str()
        )
    );

    let parsed = QualifiedSwhid::from_string(qualified).unwrap();
    assert_eq!(parsed.origin(), Some(origin));
    assert_eq!(parsed.path(), Some("/a dir/100%.txt".as_bytes()));
}
