//! Blob store integration tests: dedup by digest, including under
//! concurrent writers.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use quire_core::blob::{Blob, BlobRepository as _};
use quire_db::BlobRepository;
use uuid::Uuid;

#[tokio::test]
async fn test_ensure_twice_returns_same_id() {
    let Some(db) = common::setup().await else {
        return;
    };
    let repo = BlobRepository::new(db);

    let content = format!("identical-{}", Uuid::new_v4()).into_bytes();
    let first = repo
        .ensure(&Blob::from_bytes(content.clone(), Some("image/png")))
        .await
        .unwrap();
    let second = repo
        .ensure(&Blob::from_bytes(content, Some("image/jpeg")))
        .await
        .unwrap();

    assert_eq!(first, second);

    let stored = repo.find_by_id(first).await.unwrap().unwrap();
    assert!(stored.verify());
    // first writer's declared type sticks
    assert_eq!(stored.content_type, "image/png");
}

#[tokio::test]
async fn test_concurrent_ensure_converges() {
    let Some(db) = common::setup().await else {
        return;
    };
    let repo = Arc::new(BlobRepository::new(db));
    let blob = Blob::from_bytes(format!("race-{}", Uuid::new_v4()).into_bytes(), None);

    let results = join_all((0..16).map(|_| {
        let repo = repo.clone();
        let blob = blob.clone();
        tokio::spawn(async move { repo.ensure(&blob).await })
    }))
    .await;

    let ids: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    assert!(ids.iter().all(|id| *id == ids[0]));
}

#[tokio::test]
async fn test_distinct_content_distinct_rows() {
    let Some(db) = common::setup().await else {
        return;
    };
    let repo = BlobRepository::new(db);
    let tag = Uuid::new_v4();

    let a = repo
        .ensure(&Blob::from_bytes(format!("a-{tag}").into_bytes(), None))
        .await
        .unwrap();
    let b = repo
        .ensure(&Blob::from_bytes(format!("b-{tag}").into_bytes(), None))
        .await
        .unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_known_digest_is_resolved_by_lookup() {
    let Some(db) = common::setup().await else {
        return;
    };
    let repo = BlobRepository::new(db);

    let original = Blob::from_bytes(format!("lookup-{}", Uuid::new_v4()).into_bytes(), None);
    let id = repo.ensure(&original).await.unwrap();

    // same digest, different bytes: the stored row wins without comparison
    let mut impostor = original.clone();
    impostor.content = bytes::Bytes::from_static(b"other bytes");
    assert_eq!(repo.ensure(&impostor).await.unwrap(), id);

    let stored = repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.content, original.content);
}
