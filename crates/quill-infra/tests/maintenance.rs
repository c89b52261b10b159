mod common;

use std::sync::Arc;

use quill_core::services::OrphanSweeper;
use quill_infra::InMemoryFileStorage;

use common::Harness;

#[tokio::test]
async fn test_sweeper_deletes_only_unreferenced_uploads() {
    let h = Harness::new();
    let alice = h.user("alice").await;

    h.publish(
        alice,
        "Gallery",
        r#"<p>Look:</p><img src="/media/uploads/kept.png"><img src="https://cdn.example.com/x.png">"#,
    )
    .await;
    h.draft(alice, "Draft with image").await;

    for path in ["uploads/kept.png", "uploads/orphan.png", "featured/cover.png"] {
        h.files.put(path).await.unwrap();
    }

    let sweeper = OrphanSweeper::new(h.repos.posts.clone(), h.files.clone(), "/media/");
    let report = sweeper.sweep().await.unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.deleted, vec!["uploads/orphan.png".to_string()]);
    assert!(report.failed.is_empty());
    assert!(h.files.contains("uploads/kept.png").await);
    assert!(h.files.contains("featured/cover.png").await);
    assert!(!h.files.contains("uploads/orphan.png").await);
}

#[test]
fn test_referenced_paths_strip_media_prefix() {
    let h = Harness::new();
    let sweeper = OrphanSweeper::new(
        h.repos.posts.clone(),
        Arc::new(InMemoryFileStorage::new()),
        "/media/",
    );

    let paths = sweeper.referenced_paths(
        r#"<img src="/media/uploads/a.png"> <img src="/static/b.png"> <img src="/media//uploads/c.png">"#,
    );

    assert_eq!(paths, vec!["uploads/a.png", "uploads/c.png"]);
}
