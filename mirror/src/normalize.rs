//! Revision normalizer.
//!
//! Converts one decoded change-stream record (the ledger's self-describing document,
//! already decoded to JSON by the transport layer) into a typed [`RevisionEvent`].
//! Block summaries are observed and logged but never reconciled.

use serde::Deserialize;
use tracing::info;

use crate::error::{ErrorKind, MirrorResult};
use crate::types::{Cell, RevisionEvent};
use crate::{bail, mirror_error};

/// Record type for one document revision.
const REVISION_DETAILS_RECORD_TYPE: &str = "REVISION_DETAILS";

/// Record type for a journal block summary.
const BLOCK_SUMMARY_RECORD_TYPE: &str = "BLOCK_SUMMARY";

/// Envelope of one decoded change-stream record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamRecord {
    record_type: String,
    payload: Option<RecordPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPayload {
    revision: Option<Revision>,
    table_info: Option<TableInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Revision {
    metadata: Option<RevisionMetadata>,
    /// Field set of the revision; absent for tombstones.
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevisionMetadata {
    id: String,
    version: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableInfo {
    table_name: String,
}

/// Normalizes one decoded change-stream record into a [`RevisionEvent`].
///
/// Returns `Ok(None)` for `BLOCK_SUMMARY` records, which are logged and counted but
/// carry nothing to reconcile. Any structural defect in a `REVISION_DETAILS` record
/// (missing metadata, missing table info, negative version, non-document data) is a
/// [`ErrorKind::DecodeError`], fatal for that record only.
pub fn normalize_record(record: &serde_json::Value) -> MirrorResult<Option<RevisionEvent>> {
    let record: StreamRecord = serde_json::from_value(record.clone())?;

    match record.record_type.as_str() {
        BLOCK_SUMMARY_RECORD_TYPE => {
            info!("observed block summary record");
            Ok(None)
        }
        REVISION_DETAILS_RECORD_TYPE => normalize_revision_details(record).map(Some),
        other => bail!(
            ErrorKind::DecodeError,
            "Unknown change-stream record type",
            format!("record type `{other}` is not recognized")
        ),
    }
}

fn normalize_revision_details(record: StreamRecord) -> MirrorResult<RevisionEvent> {
    let payload = record.payload.ok_or_else(|| {
        mirror_error!(
            ErrorKind::DecodeError,
            "Revision record is missing its payload"
        )
    })?;

    let table = payload
        .table_info
        .map(|info| info.table_name)
        .ok_or_else(|| {
            mirror_error!(
                ErrorKind::DecodeError,
                "Revision record is missing table info"
            )
        })?;

    let revision = payload.revision.ok_or_else(|| {
        mirror_error!(
            ErrorKind::DecodeError,
            "Revision record is missing the revision block"
        )
    })?;

    let metadata = revision.metadata.ok_or_else(|| {
        mirror_error!(
            ErrorKind::DecodeError,
            "Revision record is missing its metadata"
        )
    })?;

    if metadata.version < 0 {
        bail!(
            ErrorKind::DecodeError,
            "Revision version must be non-negative",
            format!(
                "document `{}` carries version {}",
                metadata.id, metadata.version
            )
        );
    }

    // Absent data marks a tombstone; present data must be a document whose field
    // order is preserved for projection.
    let (fields, is_tombstone) = match revision.data {
        None => (Vec::new(), true),
        Some(serde_json::Value::Object(map)) => {
            let fields = map
                .into_iter()
                .map(|(name, value)| (name, Cell::from_json(value)))
                .collect();
            (fields, false)
        }
        Some(other) => bail!(
            ErrorKind::DecodeError,
            "Revision data must be a document",
            format!("document `{}` carries data `{other}`", metadata.id)
        ),
    };

    Ok(RevisionEvent {
        table,
        document_id: metadata.id,
        version: metadata.version,
        fields,
        is_tombstone,
    })
}
