//! `SeaORM` Entity for blobs table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "blobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub sha: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::submission_attachments::Entity")]
    SubmissionAttachments,
}

impl Related<super::submission_attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubmissionAttachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
