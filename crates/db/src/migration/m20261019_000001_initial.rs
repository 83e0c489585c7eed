//! Initial database migration.
//!
//! Creates the submission, attachment, blob and audit tables together with
//! the actor, project and form tables the audit and export joins read.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ACTORS, PROJECTS, FORMS
        // ============================================================
        db.execute_unprepared(ACTORS_SQL).await?;
        db.execute_unprepared(PROJECTS_SQL).await?;
        db.execute_unprepared(FORMS_SQL).await?;

        // ============================================================
        // PART 2: SUBMISSIONS
        // ============================================================
        db.execute_unprepared(SUBMISSIONS_SQL).await?;

        // ============================================================
        // PART 3: BLOBS & ATTACHMENTS
        // ============================================================
        db.execute_unprepared(BLOBS_SQL).await?;
        db.execute_unprepared(SUBMISSION_ATTACHMENTS_SQL).await?;

        // ============================================================
        // PART 4: AUDIT LOG
        // ============================================================
        db.execute_unprepared(AUDITS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ACTORS_SQL: &str = r"
CREATE TABLE actors (
    id BIGSERIAL PRIMARY KEY,
    type VARCHAR(15) NOT NULL,
    actee_id UUID NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);
";

const PROJECTS_SQL: &str = r"
CREATE TABLE projects (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    actee_id UUID NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);
";

const FORMS_SQL: &str = r"
CREATE TABLE forms (
    id BIGSERIAL PRIMARY KEY,
    project_id BIGINT NOT NULL REFERENCES projects(id),
    xml_form_id TEXT NOT NULL,
    actee_id UUID NOT NULL UNIQUE,
    current_def_id BIGINT,
    draft_def_id BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
);

CREATE TABLE form_defs (
    id BIGSERIAL PRIMARY KEY,
    form_id BIGINT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
    name TEXT,
    version TEXT NOT NULL DEFAULT '',
    -- managed encryption key; NULL for unencrypted form versions
    key_id BIGINT,
    xml TEXT NOT NULL,
    published_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

ALTER TABLE forms
    ADD CONSTRAINT forms_current_def_id_fkey FOREIGN KEY (current_def_id) REFERENCES form_defs(id),
    ADD CONSTRAINT forms_draft_def_id_fkey FOREIGN KEY (draft_def_id) REFERENCES form_defs(id);

CREATE INDEX idx_form_defs_form ON form_defs(form_id);
";

const SUBMISSIONS_SQL: &str = r"
CREATE TABLE submissions (
    id BIGSERIAL PRIMARY KEY,
    form_id BIGINT NOT NULL REFERENCES forms(id),
    instance_id TEXT NOT NULL,
    submitter_id BIGINT REFERENCES actors(id),
    device_id TEXT,
    review_state TEXT,
    draft BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    UNIQUE (form_id, instance_id, draft)
);

CREATE TABLE submission_defs (
    id BIGSERIAL PRIMARY KEY,
    submission_id BIGINT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
    form_def_id BIGINT NOT NULL REFERENCES form_defs(id),
    instance_id TEXT NOT NULL,
    xml TEXT NOT NULL,
    local_key TEXT,
    enc_data_attachment_name TEXT,
    current BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX idx_submission_defs_current ON submission_defs(submission_id) WHERE current;
";

const BLOBS_SQL: &str = r"
CREATE TABLE blobs (
    id BIGSERIAL PRIMARY KEY,
    sha CHAR(64) NOT NULL,
    content BYTEA NOT NULL,
    content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
    CONSTRAINT blobs_sha_unique UNIQUE (sha)
);
";

const SUBMISSION_ATTACHMENTS_SQL: &str = r#"
CREATE TABLE submission_attachments (
    submission_def_id BIGINT NOT NULL REFERENCES submission_defs(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    blob_id BIGINT REFERENCES blobs(id),
    "index" INTEGER,
    is_client_audit BOOLEAN,
    CONSTRAINT submission_attachments_def_name_unique PRIMARY KEY (submission_def_id, name)
);

CREATE INDEX idx_submission_attachments_blob ON submission_attachments(blob_id);
"#;

const AUDITS_SQL: &str = r"
CREATE TABLE audits (
    id BIGSERIAL PRIMARY KEY,
    actor_id BIGINT REFERENCES actors(id),
    action TEXT NOT NULL,
    actee_id UUID,
    details JSONB,
    logged_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    processed TIMESTAMPTZ,
    failures INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX idx_audits_logged_at ON audits(logged_at DESC, id DESC);
CREATE INDEX idx_audits_action_logged_at ON audits(action, logged_at DESC);
CREATE INDEX idx_audits_actee ON audits(actee_id);
CREATE INDEX idx_audits_pending ON audits(id) WHERE processed IS NULL;
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS audits CASCADE;
DROP TABLE IF EXISTS submission_attachments CASCADE;
DROP TABLE IF EXISTS blobs CASCADE;
DROP TABLE IF EXISTS submission_defs CASCADE;
DROP TABLE IF EXISTS submissions CASCADE;
DROP TABLE IF EXISTS form_defs CASCADE;
DROP TABLE IF EXISTS forms CASCADE;
DROP TABLE IF EXISTS projects CASCADE;
DROP TABLE IF EXISTS actors CASCADE;
";
