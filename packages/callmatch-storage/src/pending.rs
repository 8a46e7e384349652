//! Pending recording jobs.
//!
//! A job is claimable while `processed_at IS NULL` and `next_run_at` is due. Claims push
//! `next_run_at` forward by a lease so overlapping runs skip it; every terminal or retry
//! transition overwrites that lease.

use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use callmatch_domain::{RetryPhase, retry::EXHAUSTED_ERROR};

use crate::{
	Error, Result,
	db::Db,
	models::{EnqueueOutcome, NewPendingJob, PendingRecordingJob, PendingStats},
};

const JOB_COLUMNS: &str = "\
job_id,
\tprovider_call_id,
\tlead_id,
\tcall_started_at,
\tcall_ended_at,
\tattempts,
\tretry_phase,
\tnext_run_at,
\tlast_error,
\tprocessed_at,
\tcreated_at,
\tupdated_at";

/// Queues a recording lookup unless an unprocessed job already covers the same references.
///
/// The open-references unique index arbitrates concurrent enqueues; the loser reads back the
/// winner's job.
pub async fn enqueue_pending_job(
	db: &Db,
	job: &NewPendingJob,
	now: OffsetDateTime,
) -> Result<EnqueueOutcome> {
	let provider_call_id = non_blank(job.provider_call_id.as_deref());
	let lead_id = non_blank(job.lead_id.as_deref());

	if provider_call_id.is_none() && lead_id.is_none() {
		return Err(Error::InvalidArgument(
			"A pending job requires a provider call id or a lead id.".to_string(),
		));
	}

	loop {
		let inserted: Option<Uuid> = sqlx::query_scalar(
			"\
INSERT INTO pending_recordings (
\tjob_id,
\tprovider_call_id,
\tlead_id,
\tcall_started_at,
\tcall_ended_at,
\tattempts,
\tretry_phase,
\tnext_run_at,
\tcreated_at,
\tupdated_at
)
VALUES ($1,$2,$3,$4,$5,0,'quick',NULL,$6,$6)
ON CONFLICT ((COALESCE(provider_call_id, '')), (COALESCE(lead_id, '')))
\tWHERE processed_at IS NULL
\tDO NOTHING
RETURNING job_id",
		)
		.bind(Uuid::new_v4())
		.bind(provider_call_id)
		.bind(lead_id)
		.bind(job.call_started_at)
		.bind(job.call_ended_at)
		.bind(now)
		.fetch_optional(&db.pool)
		.await?;

		if let Some(job_id) = inserted {
			return Ok(EnqueueOutcome::Created(job_id));
		}

		let existing: Option<Uuid> = sqlx::query_scalar(
			"\
SELECT job_id
FROM pending_recordings
WHERE processed_at IS NULL
\tAND COALESCE(provider_call_id, '') = COALESCE($1, '')
\tAND COALESCE(lead_id, '') = COALESCE($2, '')
LIMIT 1",
		)
		.bind(provider_call_id)
		.bind(lead_id)
		.fetch_optional(&db.pool)
		.await?;

		// None means the conflicting job finished in between; the next insert goes through.
		if let Some(job_id) = existing {
			return Ok(EnqueueOutcome::Existing(job_id));
		}
	}
}

/// Claims the most urgent due job, ended calls first, under a lease of `lease_seconds`.
pub async fn claim_next_due(
	db: &Db,
	now: OffsetDateTime,
	lease_seconds: i64,
) -> Result<Option<PendingRecordingJob>> {
	let mut tx = db.pool.begin().await?;
	let sql = format!(
		"\
SELECT
\t{JOB_COLUMNS}
FROM pending_recordings
WHERE processed_at IS NULL
\tAND (next_run_at IS NULL OR next_run_at <= $1)
ORDER BY
\tCASE WHEN call_ended_at IS NOT NULL THEN 0 ELSE 1 END,
\tnext_run_at ASC NULLS FIRST,
\tcreated_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED"
	);
	let row = sqlx::query_as::<_, PendingRecordingJob>(&sql)
		.bind(now)
		.fetch_optional(&mut *tx)
		.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + time::Duration::seconds(lease_seconds);

		sqlx::query(
			"UPDATE pending_recordings SET next_run_at = $1, updated_at = $2 WHERE job_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.job_id)
		.execute(&mut *tx)
		.await?;

		job.next_run_at = Some(lease_until);
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn get_pending_job<'e, E>(executor: E, job_id: Uuid) -> Result<Option<PendingRecordingJob>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT\n\t{JOB_COLUMNS}\nFROM pending_recordings\nWHERE job_id = $1");
	let row = sqlx::query_as::<_, PendingRecordingJob>(&sql)
		.bind(job_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Terminal success: a recording is attached to one of the job's calls.
pub async fn resolve_pending_job<'e, E>(
	executor: E,
	job_id: Uuid,
	attempts: i32,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE pending_recordings
SET attempts = $1,
\tlast_error = NULL,
\tprocessed_at = $2,
\tupdated_at = $2
WHERE job_id = $3 AND processed_at IS NULL",
	)
	.bind(attempts)
	.bind(now)
	.bind(job_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn reschedule_pending_job<'e, E>(
	executor: E,
	job_id: Uuid,
	attempts: i32,
	phase: RetryPhase,
	next_run_at: OffsetDateTime,
	error_text: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE pending_recordings
SET attempts = $1,
\tretry_phase = $2,
\tnext_run_at = $3,
\tlast_error = $4,
\tupdated_at = $5
WHERE job_id = $6 AND processed_at IS NULL",
	)
	.bind(attempts)
	.bind(phase.as_str())
	.bind(next_run_at)
	.bind(error_text)
	.bind(now)
	.bind(job_id)
	.execute(executor)
	.await?;

	Ok(())
}

/// Terminal failure once the retry schedule runs out.
pub async fn exhaust_pending_job<'e, E>(
	executor: E,
	job_id: Uuid,
	attempts: i32,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE pending_recordings
SET attempts = $1,
\tlast_error = $2,
\tprocessed_at = $3,
\tupdated_at = $3
WHERE job_id = $4 AND processed_at IS NULL",
	)
	.bind(attempts)
	.bind(EXHAUSTED_ERROR)
	.bind(now)
	.bind(job_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn pending_stats<'e, E>(executor: E) -> Result<PendingStats>
where
	E: PgExecutor<'e>,
{
	let (quick_pending, backoff_pending, final_pending, total_succeeded, total_failed): (
		i64,
		i64,
		i64,
		i64,
		i64,
	) = sqlx::query_as(
		"\
SELECT
\tCOUNT(*) FILTER (WHERE retry_phase = 'quick' AND processed_at IS NULL),
\tCOUNT(*) FILTER (WHERE retry_phase = 'backoff' AND processed_at IS NULL),
\tCOUNT(*) FILTER (WHERE retry_phase = 'final' AND processed_at IS NULL),
\tCOUNT(*) FILTER (WHERE processed_at IS NOT NULL AND last_error IS NULL),
\tCOUNT(*) FILTER (WHERE processed_at IS NOT NULL AND last_error IS NOT NULL)
FROM pending_recordings",
	)
	.fetch_one(executor)
	.await?;

	Ok(PendingStats { quick_pending, backoff_pending, final_pending, total_succeeded, total_failed })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}
