use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use callmatch_domain::{PotentialMatch, RecordingDescriptor, RetryPhase};
use callmatch_storage::{
	calls,
	db::Db,
	models::{CallRecord, PendingRecordingJob, RecordingAttachment},
	pending, unmatched,
};

use crate::{BoxFuture, ReconcileStore, Result};

/// [`ReconcileStore`] backed by the Postgres tables.
pub struct PgReconcileStore {
	db: Arc<Db>,
}
impl PgReconcileStore {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db }
	}
}
impl ReconcileStore for PgReconcileStore {
	fn claim_next_due<'a>(
		&'a self,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> BoxFuture<'a, Result<Option<PendingRecordingJob>>> {
		Box::pin(async move { Ok(pending::claim_next_due(&self.db, now, lease_seconds).await?) })
	}

	fn job_calls<'a>(
		&'a self,
		job: &'a PendingRecordingJob,
	) -> BoxFuture<'a, Result<Vec<CallRecord>>> {
		Box::pin(async move {
			if let Some(lead_id) = job.lead_id.as_deref() {
				return Ok(calls::list_calls_for_lead(&self.db.pool, lead_id).await?);
			}

			let Some(provider_call_id) = job.provider_call_id.as_deref() else {
				return Ok(Vec::new());
			};
			let direct = calls::list_calls_for_provider_call(&self.db.pool, provider_call_id).await?;

			// Widen to the whole lead so the isolation check sees every neighbour.
			match direct.iter().find_map(|call| call.lead_id.as_deref()) {
				Some(lead_id) => Ok(calls::list_calls_for_lead(&self.db.pool, lead_id).await?),
				None => Ok(direct),
			}
		})
	}

	fn attach_recording<'a>(
		&'a self,
		attachment: &'a RecordingAttachment,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(calls::attach_recording(&self.db.pool, attachment).await?) })
	}

	fn upsert_unmatched<'a>(
		&'a self,
		lead_id: Option<&'a str>,
		recording: &'a RecordingDescriptor,
		potential_matches: &'a [PotentialMatch],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			unmatched::upsert_unmatched(&self.db.pool, lead_id, recording, potential_matches, now)
				.await?;

			Ok(())
		})
	}

	fn resolve<'a>(
		&'a self,
		job_id: Uuid,
		attempts: i32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(pending::resolve_pending_job(&self.db.pool, job_id, attempts, now).await?)
		})
	}

	fn reschedule<'a>(
		&'a self,
		job_id: Uuid,
		attempts: i32,
		phase: RetryPhase,
		next_run_at: OffsetDateTime,
		error_text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(pending::reschedule_pending_job(
				&self.db.pool,
				job_id,
				attempts,
				phase,
				next_run_at,
				error_text,
				now,
			)
			.await?)
		})
	}

	fn exhaust<'a>(
		&'a self,
		job_id: Uuid,
		attempts: i32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(pending::exhaust_pending_job(&self.db.pool, job_id, attempts, now).await?)
		})
	}
}
