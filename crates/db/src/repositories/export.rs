//! Export repository for database operations.

use bytes::Bytes;
use futures::StreamExt;
use sea_orm::sea_query::{Condition, Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, Value,
};

use crate::entities::{blobs, form_defs, submission_attachments, submission_defs, submissions};
use quire_core::export::{
    Comparison, ExportError, ExportQuery, ExportRepository as ExportRepoTrait, ExportRow,
    FilterValue, KeyScope, RowStream, SubmissionField, SubmissionFilter,
};
use quire_shared::types::{BlobId, KeyId, SubmissionDefId};

/// Export repository implementation.
#[derive(Debug, Clone)]
pub struct ExportRepository {
    db: DatabaseConnection,
}

impl ExportRepository {
    /// Create a new export repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ExportRepoTrait for ExportRepository {
    async fn stream(&self, query: ExportQuery) -> Result<RowStream<'_>, ExportError> {
        let rows = export_select(&query)
            .into_model::<ExportJoinRow>()
            .stream(&self.db)
            .await
            .map_err(|e| ExportError::repository(e.to_string()))?;

        Ok(rows
            .map(|row| {
                row.map(ExportJoinRow::into_row)
                    .map_err(|e| ExportError::repository(e.to_string()))
            })
            .boxed())
    }
}

/// Every uploaded attachment of the current version of each live submission.
fn export_select(query: &ExportQuery) -> Select<submission_attachments::Entity> {
    let mut select = submission_attachments::Entity::find()
        .select_only()
        .column_as(submission_defs::Column::InstanceId, "instance_id")
        .column_as(submission_defs::Column::Id, "submission_def_id")
        .column_as(submission_attachments::Column::Name, "name")
        .column_as(blobs::Column::Id, "blob_id")
        .column_as(blobs::Column::ContentType, "content_type")
        .column_as(blobs::Column::Content, "content")
        .column_as(form_defs::Column::KeyId, "key_id")
        .join(
            JoinType::InnerJoin,
            submission_attachments::Relation::SubmissionDefs.def(),
        )
        .join(JoinType::InnerJoin, submission_defs::Relation::Submissions.def())
        .join(JoinType::InnerJoin, submission_defs::Relation::FormDefs.def())
        .join(JoinType::InnerJoin, submission_attachments::Relation::Blobs.def())
        .filter(submissions::Column::FormId.eq(query.form_id.into_inner()))
        .filter(submissions::Column::Draft.eq(query.draft))
        .filter(submissions::Column::DeletedAt.is_null())
        .filter(submission_defs::Column::Current.eq(true))
        .filter(
            Condition::any()
                .add(submission_defs::Column::EncDataAttachmentName.is_null())
                .add(
                    Expr::col((
                        submission_attachments::Entity,
                        submission_attachments::Column::Name,
                    ))
                    .ne(Expr::col((
                        submission_defs::Entity,
                        submission_defs::Column::EncDataAttachmentName,
                    ))),
                ),
        )
        .filter(key_condition(&query.keys));

    if let Some(filter) = &query.filter {
        select = select.filter(filter_condition(filter));
    }

    select
        .order_by_asc(submissions::Column::Id)
        .order_by_asc(submission_attachments::Column::Name)
}

fn key_condition(keys: &KeyScope) -> Condition {
    let unencrypted = form_defs::Column::KeyId.is_null();
    match keys {
        KeyScope::UnencryptedOnly => Condition::all().add(unencrypted),
        KeyScope::UnencryptedOr(keys) => Condition::any()
            .add(unencrypted)
            .add(form_defs::Column::KeyId.is_in(keys.iter().map(|k| k.into_inner()))),
    }
}

fn column(field: SubmissionField) -> submissions::Column {
    match field {
        SubmissionField::SubmitterId => submissions::Column::SubmitterId,
        SubmissionField::CreatedAt => submissions::Column::CreatedAt,
        SubmissionField::ReviewState => submissions::Column::ReviewState,
        SubmissionField::DeviceId => submissions::Column::DeviceId,
        SubmissionField::InstanceId => submissions::Column::InstanceId,
    }
}

fn compare<V: Into<Value>>(col: submissions::Column, op: Comparison, value: V) -> SimpleExpr {
    match op {
        Comparison::Eq => col.eq(value),
        Comparison::Ne => col.ne(value),
        Comparison::Lt => col.lt(value),
        Comparison::Le => col.lte(value),
        Comparison::Gt => col.gt(value),
        Comparison::Ge => col.gte(value),
    }
}

/// Translate a submission predicate into SQL.
fn filter_condition(filter: &SubmissionFilter) -> SimpleExpr {
    match filter {
        SubmissionFilter::Compare { field, op, value } => {
            let col = column(*field);
            match (value, op) {
                (FilterValue::Null, Comparison::Eq) => col.is_null(),
                (FilterValue::Null, Comparison::Ne) => col.is_not_null(),
                (FilterValue::Null, _) => compare(col, *op, Option::<String>::None),
                (FilterValue::Int(v), _) => compare(col, *op, *v),
                (FilterValue::Timestamp(t), _) => compare(col, *op, *t),
                (FilterValue::Text(s), _) => compare(col, *op, s.clone()),
            }
        }
        SubmissionFilter::And(a, b) => filter_condition(a).and(filter_condition(b)),
        SubmissionFilter::Or(a, b) => filter_condition(a).or(filter_condition(b)),
        SubmissionFilter::Not(inner) => filter_condition(inner).not(),
    }
}

#[derive(Debug, FromQueryResult)]
struct ExportJoinRow {
    instance_id: String,
    submission_def_id: i64,
    name: String,
    blob_id: i64,
    content_type: String,
    content: Vec<u8>,
    key_id: Option<i64>,
}

impl ExportJoinRow {
    fn into_row(self) -> ExportRow {
        ExportRow {
            instance_id: self.instance_id,
            submission_def_id: SubmissionDefId(self.submission_def_id),
            name: self.name,
            blob_id: BlobId(self.blob_id),
            content_type: self.content_type,
            content: Bytes::from(self.content),
            key_id: self.key_id.map(KeyId),
        }
    }
}
