//! `SeaORM` Entity for submissions table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub form_id: i64,
    pub instance_id: String,
    pub submitter_id: Option<i64>,
    pub device_id: Option<String>,
    pub review_state: Option<String>,
    pub draft: bool,
    pub created_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::forms::Entity",
        from = "Column::FormId",
        to = "super::forms::Column::Id"
    )]
    Forms,
    #[sea_orm(has_many = "super::submission_defs::Entity")]
    SubmissionDefs,
}

impl Related<super::forms::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Forms.def()
    }
}

impl Related<super::submission_defs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubmissionDefs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
