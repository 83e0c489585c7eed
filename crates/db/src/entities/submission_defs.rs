//! `SeaORM` Entity for submission_defs table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "submission_defs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub form_def_id: i64,
    pub instance_id: String,
    #[sea_orm(column_type = "Text")]
    pub xml: String,
    pub local_key: Option<String>,
    pub enc_data_attachment_name: Option<String>,
    pub current: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submissions::Entity",
        from = "Column::SubmissionId",
        to = "super::submissions::Column::Id"
    )]
    Submissions,
    #[sea_orm(
        belongs_to = "super::form_defs::Entity",
        from = "Column::FormDefId",
        to = "super::form_defs::Column::Id"
    )]
    FormDefs,
    #[sea_orm(has_many = "super::submission_attachments::Entity")]
    SubmissionAttachments,
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl Related<super::form_defs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormDefs.def()
    }
}

impl Related<super::submission_attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubmissionAttachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
