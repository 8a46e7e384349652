use sqlx::PgExecutor;

use crate::{Result, models::{CallRecord, RecordingAttachment}};

const CALL_COLUMNS: &str = "\
call_id,
\tlead_id,
\tprovider_call_id,
\tagent_name,
\tstarted_at,
\tended_at,
\tduration_seconds,
\trecording_url,
\trecording_match_confidence,
\trecording_match_score,
\trecording_matched_at,
\trecording_fingerprint,
\tmetadata,
\tcreated_at,
\tupdated_at";

/// Every call of the lead, newest first, including calls that already carry a recording.
pub async fn list_calls_for_lead<'e, E>(executor: E, lead_id: &str) -> Result<Vec<CallRecord>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT\n\t{CALL_COLUMNS}\nFROM calls\nWHERE lead_id = $1\nORDER BY started_at DESC"
	);
	let rows = sqlx::query_as::<_, CallRecord>(&sql).bind(lead_id).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn list_calls_for_provider_call<'e, E>(
	executor: E,
	provider_call_id: &str,
) -> Result<Vec<CallRecord>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT\n\t{CALL_COLUMNS}\nFROM calls\nWHERE provider_call_id = $1\nORDER BY started_at DESC"
	);
	let rows =
		sqlx::query_as::<_, CallRecord>(&sql).bind(provider_call_id).fetch_all(executor).await?;

	Ok(rows)
}

/// Sets the recording on a call that has none yet.
///
/// Returns `false` when another writer attached a recording first; the row is left untouched.
pub async fn attach_recording<'e, E>(executor: E, attachment: &RecordingAttachment) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE calls
SET recording_url = $1,
\trecording_match_confidence = $2,
\trecording_match_score = $3,
\trecording_fingerprint = COALESCE($4, recording_fingerprint),
\trecording_matched_at = $5,
\tmetadata = jsonb_set(COALESCE(metadata, '{}'::jsonb), '{recording_match}', $6::jsonb, true),
\tupdated_at = $5
WHERE call_id = $7 AND recording_url IS NULL",
	)
	.bind(attachment.recording_url.as_str())
	.bind(attachment.confidence.as_str())
	.bind(attachment.score)
	.bind(attachment.fingerprint.as_deref())
	.bind(attachment.matched_at)
	.bind(attachment.match_metadata.clone())
	.bind(attachment.call_id)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}
