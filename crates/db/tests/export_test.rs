//! Export streamer integration tests.

mod common;

use std::sync::Arc;

use futures::TryStreamExt;
use quire_core::attachment::{AttachmentService, UploadSet};
use quire_core::export::{
    ExportQuery, ExportRow, ExportStreamer, FilterValue, SubmissionField, SubmissionFilter,
};
use quire_core::xml::FieldSchema;
use quire_db::{AttachmentRepository, BlobRepository, ExportRepository};
use quire_shared::types::{FormId, KeyId};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};

use common::{SubmissionSpec, seed_form, seed_form_def, seed_submission, staged_upload};
use quire_db::entities::submissions;

fn attachments(db: &DatabaseConnection) -> AttachmentService<AttachmentRepository, BlobRepository> {
    AttachmentService::new(
        Arc::new(AttachmentRepository::new(db.clone())),
        Arc::new(BlobRepository::new(db.clone())),
        16,
    )
}

async fn export(db: &DatabaseConnection, query: ExportQuery) -> Vec<ExportRow> {
    let streamer = ExportStreamer::new(Arc::new(ExportRepository::new(db.clone())));
    streamer
        .stream(query)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

/// One plain submission with `p.jpg`, one encrypted with `e.enc` plus its
/// payload, all uploaded. Returns (form id, encrypted key id, plain submission id).
async fn seed(db: &DatabaseConnection) -> (FormId, KeyId, i64) {
    let fx = seed_form(db, None).await.unwrap();
    let form_id = fx.form.id.into_inner();
    let key = KeyId(i64::from(rand_key()));
    let encrypted_def = seed_form_def(db, form_id, Some(key.into_inner()))
        .await
        .unwrap();
    let svc = attachments(db);

    let (plain_id, plain) = seed_submission(
        db,
        form_id,
        fx.def_id,
        SubmissionSpec {
            xml: "<data><photo>p.jpg</photo></data>",
            review_state: Some("approved"),
            ..SubmissionSpec::default()
        },
    )
    .await
    .unwrap();
    let mut uploads = UploadSet::new();
    uploads.insert("p.jpg", staged_upload(b"plain").await, Some("image/jpeg"));
    svc.create(
        &plain,
        &fx.form,
        None,
        &[FieldSchema::binary("/photo")],
        &uploads,
    )
    .await
    .unwrap();

    let (_, enc) = seed_submission(
        db,
        form_id,
        encrypted_def,
        SubmissionSpec {
            xml: "<data><media><file>e.enc</file></media></data>",
            local_key: Some("k"),
            enc_data_attachment_name: Some("submission.xml.enc"),
            ..SubmissionSpec::default()
        },
    )
    .await
    .unwrap();
    let mut uploads = UploadSet::new();
    uploads.insert("e.enc", staged_upload(b"cipher").await, None);
    uploads.insert("submission.xml.enc", staged_upload(b"payload").await, None);
    svc.create(&enc, &fx.form, None, &[], &uploads).await.unwrap();

    (fx.form.id, key, plain_id)
}

fn rand_key() -> u32 {
    uuid::Uuid::new_v4().as_fields().0
}

fn names(rows: &[ExportRow]) -> Vec<&str> {
    rows.iter().map(|r| r.name.as_str()).collect()
}

#[tokio::test]
async fn test_empty_allow_list_exports_unencrypted_only() {
    let Some(db) = common::setup().await else {
        return;
    };
    let (form_id, _, _) = seed(&db).await;

    let rows = export(&db, ExportQuery::new(form_id).with_keys(Some(&[]))).await;
    assert_eq!(names(&rows), vec!["p.jpg"]);
    assert_eq!(rows[0].key_id, None);
    assert_eq!(&rows[0].content[..], b"plain");
}

#[tokio::test]
async fn test_allowed_key_exports_encrypted_without_payload() {
    let Some(db) = common::setup().await else {
        return;
    };
    let (form_id, key, _) = seed(&db).await;

    let rows = export(&db, ExportQuery::new(form_id).with_keys(Some(&[key]))).await;
    assert_eq!(names(&rows), vec!["p.jpg", "e.enc"]);
    assert_eq!(rows[1].key_id, Some(key));
}

#[tokio::test]
async fn test_deleted_and_filtered_submissions_are_skipped() {
    let Some(db) = common::setup().await else {
        return;
    };
    let (form_id, key, plain_id) = seed(&db).await;

    let approved = SubmissionFilter::eq(
        SubmissionField::ReviewState,
        FilterValue::Text("approved".to_string()),
    );
    let rows = export(
        &db,
        ExportQuery::new(form_id)
            .with_keys(Some(&[key]))
            .with_filter(approved),
    )
    .await;
    assert_eq!(names(&rows), vec!["p.jpg"]);

    let submission = submissions::Entity::find_by_id(plain_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: submissions::ActiveModel = submission.into();
    active.deleted_at = Set(Some(chrono::Utc::now().into()));
    active.update(&db).await.unwrap();

    let rows = export(&db, ExportQuery::new(form_id).with_keys(Some(&[key]))).await;
    assert_eq!(names(&rows), vec!["e.enc"]);
}

#[tokio::test]
async fn test_drafts_are_separate() {
    let Some(db) = common::setup().await else {
        return;
    };
    let (form_id, _, _) = seed(&db).await;

    let rows = export(&db, ExportQuery::new(form_id).drafts()).await;
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_filter_on_null_column_is_unknown() {
    let Some(db) = common::setup().await else {
        return;
    };
    let (form_id, key, _) = seed(&db).await;
    let scoped = || ExportQuery::new(form_id).with_keys(Some(&[key]));

    let approved = SubmissionFilter::eq(
        SubmissionField::ReviewState,
        FilterValue::Text("approved".to_string()),
    );
    let unreviewed = SubmissionFilter::eq(SubmissionField::ReviewState, FilterValue::Null);

    // the encrypted submission has no review state, so NOT (= 'approved') is unknown for it
    let rows = export(&db, scoped().with_filter(approved.clone().negate())).await;
    assert!(rows.is_empty());

    let rows = export(&db, scoped().with_filter(unreviewed.clone())).await;
    assert_eq!(names(&rows), vec!["e.enc"]);

    let rows = export(&db, scoped().with_filter(approved.or(unreviewed))).await;
    assert_eq!(names(&rows), vec!["p.jpg", "e.enc"]);
}
