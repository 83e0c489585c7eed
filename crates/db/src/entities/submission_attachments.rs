//! `SeaORM` Entity for submission_attachments table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "submission_attachments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub submission_def_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub blob_id: Option<i64>,
    pub index: Option<i32>,
    pub is_client_audit: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submission_defs::Entity",
        from = "Column::SubmissionDefId",
        to = "super::submission_defs::Column::Id"
    )]
    SubmissionDefs,
    #[sea_orm(
        belongs_to = "super::blobs::Entity",
        from = "Column::BlobId",
        to = "super::blobs::Column::Id"
    )]
    Blobs,
}

impl Related<super::submission_defs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubmissionDefs.def()
    }
}

impl Related<super::blobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Blobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
