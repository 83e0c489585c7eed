//! `SeaORM` entity definitions.

pub mod actors;
pub mod audits;
pub mod blobs;
pub mod form_defs;
pub mod forms;
pub mod projects;
pub mod submission_attachments;
pub mod submission_defs;
pub mod submissions;
