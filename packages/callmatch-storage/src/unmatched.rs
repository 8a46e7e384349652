//! Review queue for recordings no call could claim. Rows are never promoted automatically.

use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use callmatch_domain::{PotentialMatch, RecordingDescriptor};

use crate::{Result, models::UnmatchedRecording};

/// Inserts or refreshes the entry for `recording.recording_id`.
///
/// A refresh replaces the descriptor fields and potential matches but keeps the review state.
pub async fn upsert_unmatched<'e, E>(
	executor: E,
	lead_id: Option<&str>,
	recording: &RecordingDescriptor,
	potential_matches: &[PotentialMatch],
	now: OffsetDateTime,
) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let potential_matches: Value = serde_json::to_value(potential_matches)?;
	let lead_id = recording.lead_id.as_deref().or(lead_id);
	let unmatched_id: Uuid = sqlx::query_scalar(
		"\
INSERT INTO unmatched_recordings (
\tunmatched_id,
\tlead_id,
\trecording_id,
\trecording_url,
\tstart_time,
\tend_time,
\tduration_seconds,
\tpotential_matches,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
ON CONFLICT (recording_id) DO UPDATE
SET lead_id = COALESCE(EXCLUDED.lead_id, unmatched_recordings.lead_id),
\trecording_url = EXCLUDED.recording_url,
\tstart_time = EXCLUDED.start_time,
\tend_time = EXCLUDED.end_time,
\tduration_seconds = EXCLUDED.duration_seconds,
\tpotential_matches = EXCLUDED.potential_matches,
\tupdated_at = EXCLUDED.updated_at
RETURNING unmatched_id",
	)
	.bind(Uuid::new_v4())
	.bind(lead_id)
	.bind(recording.recording_id.as_str())
	.bind(recording.url.as_str())
	.bind(recording.started_at)
	.bind(recording.end_time())
	.bind(recording.duration_seconds)
	.bind(potential_matches)
	.bind(now)
	.fetch_one(executor)
	.await?;

	Ok(unmatched_id)
}

pub async fn list_unreviewed<'e, E>(executor: E, limit: i64) -> Result<Vec<UnmatchedRecording>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, UnmatchedRecording>(
		"\
SELECT
\tunmatched_id,
\tlead_id,
\trecording_id,
\trecording_url,
\tstart_time,
\tend_time,
\tduration_seconds,
\tpotential_matches,
\treviewed,
\treviewed_at,
\tassigned_call_id,
\tcreated_at,
\tupdated_at
FROM unmatched_recordings
WHERE reviewed = false
ORDER BY created_at DESC, recording_id ASC
LIMIT $1",
	)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn count_unreviewed<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let count: i64 =
		sqlx::query_scalar("SELECT COUNT(*) FROM unmatched_recordings WHERE reviewed = false")
			.fetch_one(executor)
			.await?;

	Ok(count)
}
