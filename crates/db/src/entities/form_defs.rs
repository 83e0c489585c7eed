//! `SeaORM` Entity for form_defs table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "form_defs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub form_id: i64,
    pub name: Option<String>,
    pub version: String,
    pub key_id: Option<i64>,
    #[sea_orm(column_type = "Text")]
    pub xml: String,
    pub published_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
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
