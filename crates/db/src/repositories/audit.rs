//! Audit repository for database operations.
//!
//! Extended queries join the acting actor and whatever the actee id names
//! (actor, project or form plus its current version) into one flat row,
//! which is then mapped once into the nested [`AuditContext`].

use chrono::Utc;
use sea_orm::sea_query::{Alias, Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationDef, RelationTrait,
    Select, Set,
};
use uuid::Uuid;

use crate::entities::{actors, audits, form_defs, forms, projects};
use quire_core::audit::{
    ActionFilter, ActorSummary, Audit, AuditContext, AuditError, AuditQuery, AuditRecord,
    AuditRepository as AuditRepoTrait, FormDefSummary, FormSummary, NewAudit, ProjectSummary,
};
use quire_shared::types::{ActeeId, ActorId, AuditId, FormDefId, FormId, KeyId, ProjectId};

/// Audit repository implementation.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Create a new audit repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl AuditRepoTrait for AuditRepository {
    async fn insert(&self, entry: NewAudit) -> Result<Audit, AuditError> {
        let model = insert_on(&self.db, entry)
            .await
            .map_err(|e| AuditError::repository(e.to_string()))?;
        to_domain(model)
    }

    async fn find(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, AuditError> {
        let select = filtered(query);

        if !query.extended {
            let models = select
                .all(&self.db)
                .await
                .map_err(|e| AuditError::repository(e.to_string()))?;
            return models
                .into_iter()
                .map(|m| {
                    Ok(AuditRecord {
                        audit: to_domain(m)?,
                        context: None,
                    })
                })
                .collect();
        }

        let rows = with_context(select)
            .into_model::<AuditJoinRow>()
            .all(&self.db)
            .await
            .map_err(|e| AuditError::repository(e.to_string()))?;

        rows.into_iter().map(AuditJoinRow::into_record).collect()
    }

    async fn latest_by_action(&self, action: &str) -> Result<Option<Audit>, AuditError> {
        let model = audits::Entity::find()
            .filter(audits::Column::Action.eq(action))
            .order_by_desc(audits::Column::LoggedAt)
            .order_by_desc(audits::Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| AuditError::repository(e.to_string()))?;

        model.map(to_domain).transpose()
    }

    async fn pending(&self, limit: u64, max_failures: i32) -> Result<Vec<Audit>, AuditError> {
        let models = audits::Entity::find()
            .filter(audits::Column::Processed.is_null())
            .filter(audits::Column::Failures.lt(max_failures))
            .order_by_asc(audits::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| AuditError::repository(e.to_string()))?;

        models.into_iter().map(to_domain).collect()
    }

    async fn mark_processed(&self, id: AuditId) -> Result<bool, AuditError> {
        let result = audits::Entity::update_many()
            .col_expr(audits::Column::Processed, Expr::value(Utc::now()))
            .filter(audits::Column::Id.eq(id.into_inner()))
            .filter(audits::Column::Processed.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| AuditError::repository(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    async fn record_failure(&self, id: AuditId) -> Result<(), AuditError> {
        audits::Entity::update_many()
            .col_expr(
                audits::Column::Failures,
                Expr::col(audits::Column::Failures).add(1),
            )
            .filter(audits::Column::Id.eq(id.into_inner()))
            .filter(audits::Column::Processed.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| AuditError::repository(e.to_string()))?;

        Ok(())
    }
}

/// Append an audit entry on `conn`, which may be an open transaction.
pub(crate) async fn insert_on<C: ConnectionTrait>(
    conn: &C,
    entry: NewAudit,
) -> Result<audits::Model, DbErr> {
    let now = Utc::now();
    let processed = entry.processed_at(now);

    audits::ActiveModel {
        actor_id: Set(entry.actor_id.map(ActorId::into_inner)),
        action: Set(entry.action.as_str().to_string()),
        actee_id: Set(entry.actee_id.map(ActeeId::into_inner)),
        details: Set(entry.details),
        logged_at: Set(now.into()),
        processed: Set(processed.map(Into::into)),
        failures: Set(0),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// Base query: time bounds, action filter, ordering and window.
fn filtered(query: &AuditQuery) -> Select<audits::Entity> {
    let mut select = audits::Entity::find();

    if let Some(start) = query.start {
        select = select.filter(audits::Column::LoggedAt.gte(start));
    }
    if let Some(end) = query.end {
        select = select.filter(audits::Column::LoggedAt.lte(end));
    }
    if let Some(action) = &query.action {
        select = select.filter(action_condition(&ActionFilter::resolve(action)));
    }

    select = select
        .order_by_desc(audits::Column::LoggedAt)
        .order_by_desc(audits::Column::Id)
        .offset(query.page.offset);
    if let Some(limit) = query.page.limit {
        select = select.limit(limit);
    }
    select
}

fn action_condition(filter: &ActionFilter) -> SimpleExpr {
    match filter {
        ActionFilter::In(actions) => audits::Column::Action.is_in(actions.iter().copied()),
        ActionFilter::NotIn(actions) => audits::Column::Action.is_not_in(actions.iter().copied()),
        ActionFilter::Exact(action) => audits::Column::Action.eq(action.as_str()),
    }
}

/// `audits.actee_id = actors.actee_id`
fn actee_actor() -> RelationDef {
    audits::Entity::belongs_to(actors::Entity)
        .from(audits::Column::ActeeId)
        .to(actors::Column::ActeeId)
        .into()
}

/// `audits.actee_id = projects.actee_id`
fn actee_project() -> RelationDef {
    audits::Entity::belongs_to(projects::Entity)
        .from(audits::Column::ActeeId)
        .to(projects::Column::ActeeId)
        .into()
}

/// `audits.actee_id = forms.actee_id`
fn actee_form() -> RelationDef {
    audits::Entity::belongs_to(forms::Entity)
        .from(audits::Column::ActeeId)
        .to(forms::Column::ActeeId)
        .into()
}

/// Add the context joins and their aliased columns.
fn with_context(select: Select<audits::Entity>) -> Select<audits::Entity> {
    let actor = Alias::new("actor");
    let actee = Alias::new("actee_actor");

    select
        .join_as(
            JoinType::LeftJoin,
            audits::Relation::Actors.def(),
            actor.clone(),
        )
        .join_as(JoinType::LeftJoin, actee_actor(), actee.clone())
        .join(JoinType::LeftJoin, actee_project())
        .join(JoinType::LeftJoin, actee_form())
        .join(JoinType::LeftJoin, forms::Relation::CurrentDef.def())
        .expr_as(Expr::col((actor.clone(), actors::Column::ActeeId)), "actor_actee_id")
        .expr_as(Expr::col((actor.clone(), actors::Column::DisplayName)), "actor_display_name")
        .expr_as(Expr::col((actor, actors::Column::Kind)), "actor_type")
        .expr_as(Expr::col((actee.clone(), actors::Column::Id)), "actee_actor_id")
        .expr_as(Expr::col((actee.clone(), actors::Column::DisplayName)), "actee_actor_display_name")
        .expr_as(Expr::col((actee, actors::Column::Kind)), "actee_actor_type")
        .expr_as(Expr::col((projects::Entity, projects::Column::Id)), "project_id")
        .expr_as(Expr::col((projects::Entity, projects::Column::Name)), "project_name")
        .expr_as(Expr::col((forms::Entity, forms::Column::Id)), "form_id")
        .expr_as(Expr::col((forms::Entity, forms::Column::ProjectId)), "form_project_id")
        .expr_as(Expr::col((forms::Entity, forms::Column::XmlFormId)), "form_xml_form_id")
        .expr_as(Expr::col((forms::Entity, forms::Column::CurrentDefId)), "form_current_def_id")
        .expr_as(Expr::col((form_defs::Entity, form_defs::Column::Id)), "def_id")
        .expr_as(Expr::col((form_defs::Entity, form_defs::Column::Name)), "def_name")
        .expr_as(Expr::col((form_defs::Entity, form_defs::Column::Version)), "def_version")
        .expr_as(Expr::col((form_defs::Entity, form_defs::Column::KeyId)), "def_key_id")
        .expr_as(
            Expr::col((form_defs::Entity, form_defs::Column::PublishedAt)),
            "def_published_at",
        )
}

/// One audit entry with every context join flattened.
#[derive(Debug, FromQueryResult)]
struct AuditJoinRow {
    // audits
    id: i64,
    actor_id: Option<i64>,
    action: String,
    actee_id: Option<Uuid>,
    details: Option<serde_json::Value>,
    logged_at: chrono::DateTime<chrono::FixedOffset>,
    processed: Option<chrono::DateTime<chrono::FixedOffset>>,
    failures: i32,
    // acting actor
    actor_actee_id: Option<Uuid>,
    actor_display_name: Option<String>,
    actor_type: Option<String>,
    // actee as actor
    actee_actor_id: Option<i64>,
    actee_actor_display_name: Option<String>,
    actee_actor_type: Option<String>,
    // actee as project
    project_id: Option<i64>,
    project_name: Option<String>,
    // actee as form, with its current version
    form_id: Option<i64>,
    form_project_id: Option<i64>,
    form_xml_form_id: Option<String>,
    form_current_def_id: Option<i64>,
    def_id: Option<i64>,
    def_name: Option<String>,
    def_version: Option<String>,
    def_key_id: Option<i64>,
    def_published_at: Option<chrono::DateTime<chrono::FixedOffset>>,
}

impl AuditJoinRow {
    fn into_record(self) -> Result<AuditRecord, AuditError> {
        let actee_id = self.actee_id.map(ActeeId);

        let actor = match (self.actor_id, self.actor_actee_id, self.actor_display_name) {
            (Some(id), Some(actee), Some(display_name)) => Some(ActorSummary {
                id: ActorId(id),
                actee_id: ActeeId(actee),
                display_name,
                kind: self.actor_type.unwrap_or_default(),
            }),
            _ => None,
        };

        let actee_actor = match (self.actee_actor_id, actee_id, self.actee_actor_display_name) {
            (Some(id), Some(actee_id), Some(display_name)) => Some(ActorSummary {
                id: ActorId(id),
                actee_id,
                display_name,
                kind: self.actee_actor_type.unwrap_or_default(),
            }),
            _ => None,
        };

        let project = match (self.project_id, actee_id, self.project_name) {
            (Some(id), Some(actee_id), Some(name)) => Some(ProjectSummary {
                id: ProjectId(id),
                actee_id,
                name,
            }),
            _ => None,
        };

        let form = match (self.form_id, actee_id, self.form_project_id, self.form_xml_form_id) {
            (Some(id), Some(actee_id), Some(project_id), Some(xml_form_id)) => Some(FormSummary {
                id: FormId(id),
                actee_id,
                project_id: ProjectId(project_id),
                xml_form_id,
                current_def_id: self.form_current_def_id.map(FormDefId),
            }),
            _ => None,
        };

        let def = self.def_id.map(|id| FormDefSummary {
            id: FormDefId(id),
            name: self.def_name,
            version: self.def_version.unwrap_or_default(),
            key_id: self.def_key_id.map(KeyId),
            published_at: self.def_published_at.map(|t| t.with_timezone(&Utc)),
        });

        let audit = Audit {
            id: AuditId(self.id),
            actor_id: self.actor_id.map(ActorId),
            action: self.action.parse()?,
            actee_id,
            details: self.details,
            logged_at: self.logged_at.with_timezone(&Utc),
            processed: self.processed.map(|t| t.with_timezone(&Utc)),
            failures: self.failures,
        };

        Ok(AuditRecord {
            audit,
            context: Some(AuditContext::assemble(actor, actee_actor, project, form, def)),
        })
    }
}

/// Convert database model to domain model.
fn to_domain(model: audits::Model) -> Result<Audit, AuditError> {
    Ok(Audit {
        id: AuditId(model.id),
        actor_id: model.actor_id.map(ActorId),
        action: model.action.parse()?,
        actee_id: model.actee_id.map(ActeeId),
        details: model.details,
        logged_at: model.logged_at.with_timezone(&Utc),
        processed: model.processed.map(|t| t.with_timezone(&Utc)),
        failures: model.failures,
    })
}
