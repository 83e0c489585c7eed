//! Derivation of the expected attachment set from submission XML.

use std::collections::HashSet;

use super::error::AttachmentError;
use super::types::{ExpectedAttachment, SubmissionDef};
use crate::xml::{FieldOccurrence, FieldSchema, FieldStream, spawn_field_stream};

/// Schema path of the reserved client audit log field.
pub const CLIENT_AUDIT_PATH: &str = "/meta/audit";

/// Path of the file list in an encrypted submission envelope.
pub const MEDIA_FILE_PATH: &str = "/media/file";

/// Expected attachments of a submission in whichever mode applies.
///
/// Plain submissions are traversed on the blocking pool and consumed through
/// a channel of `channel_capacity` occurrences. The encrypted envelope is
/// small and is read inline.
pub async fn derive_expected(
    def: &SubmissionDef,
    fields: &[FieldSchema],
    channel_capacity: usize,
) -> Result<Vec<ExpectedAttachment>, AttachmentError> {
    if def.is_encrypted() {
        let enc_name = def
            .enc_data_attachment_name
            .as_deref()
            .ok_or(AttachmentError::MissingEncryptedPayloadName(def.id))?;
        derive_encrypted(&def.xml, enc_name)
    } else {
        derive_plain(fields, def.xml.clone(), channel_capacity).await
    }
}

/// Map one plain-mode occurrence to an expected attachment.
///
/// Non-binary fields and blank values yield nothing.
fn plain_expected(occurrence: &FieldOccurrence) -> Option<ExpectedAttachment> {
    if !occurrence.field.binary {
        return None;
    }
    let name = occurrence.text.trim();
    if name.is_empty() {
        return None;
    }
    Some(ExpectedAttachment {
        name: name.to_string(),
        index: None,
        is_client_audit: Some(occurrence.field.path == CLIENT_AUDIT_PATH),
    })
}

async fn derive_plain(
    fields: &[FieldSchema],
    xml: String,
    channel_capacity: usize,
) -> Result<Vec<ExpectedAttachment>, AttachmentError> {
    let mut rx = spawn_field_stream(fields.to_vec(), xml, channel_capacity);
    let mut expected = Vec::new();
    while let Some(occurrence) = rx.recv().await {
        if let Some(attachment) = plain_expected(&occurrence?) {
            expected.push(attachment);
        }
    }
    Ok(dedup_by_name(expected))
}

/// Every `<file>` consumes an ordinal, blank ones included, so indices match
/// positions in the envelope. The encrypted payload itself comes last and
/// its name may not be reused by a listed file.
fn derive_encrypted(
    xml: &str,
    enc_data_attachment_name: &str,
) -> Result<Vec<ExpectedAttachment>, AttachmentError> {
    let payload_name = enc_data_attachment_name.trim();
    let schema = [FieldSchema::binary(MEDIA_FILE_PATH)];
    let mut expected = Vec::new();
    let mut index: i32 = 0;

    for occurrence in FieldStream::new(&schema, xml) {
        let occurrence = occurrence?;
        let name = occurrence.text.trim();
        if !name.is_empty() {
            if name == payload_name {
                return Err(AttachmentError::PayloadNameReused(name.to_string()));
            }
            expected.push(ExpectedAttachment {
                name: name.to_string(),
                index: Some(index),
                is_client_audit: None,
            });
        }
        index += 1;
    }

    let mut expected = dedup_by_name(expected);
    expected.push(ExpectedAttachment {
        name: payload_name.to_string(),
        index: Some(index),
        is_client_audit: None,
    });
    Ok(expected)
}

/// Keep the first attachment for each name; names are unique per submission.
fn dedup_by_name(expected: Vec<ExpectedAttachment>) -> Vec<ExpectedAttachment> {
    let mut seen = HashSet::new();
    expected
        .into_iter()
        .filter(|a| seen.insert(a.name.clone()))
        .collect()
}
