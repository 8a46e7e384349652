use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use callmatch_storage::{
	models::{EnqueueOutcome, NewPendingJob, PendingStats, UnmatchedRecording},
	pending, unmatched,
};

use crate::{CallmatchService, Error, Result};

const DEFAULT_UNMATCHED_LIMIT: u32 = 50;
const MAX_UNMATCHED_LIMIT: u32 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
	#[serde(default)]
	pub provider_call_id: Option<String>,
	#[serde(default)]
	pub lead_id: Option<String>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub call_started_at: Option<OffsetDateTime>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub call_ended_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
	pub job_id: Uuid,
	pub created: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnmatchedListRequest {
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedListResponse {
	pub items: Vec<UnmatchedRecording>,
	pub total_unreviewed: i64,
}

impl CallmatchService {
	/// Queues a recording lookup for a call persisted without a recording URL.
	pub async fn enqueue(&self, req: EnqueueRequest) -> Result<EnqueueResponse> {
		let job = NewPendingJob {
			provider_call_id: req.provider_call_id,
			lead_id: req.lead_id,
			call_started_at: req.call_started_at,
			call_ended_at: req.call_ended_at,
		};
		let outcome =
			pending::enqueue_pending_job(&self.db, &job, OffsetDateTime::now_utc()).await?;
		let created = matches!(outcome, EnqueueOutcome::Created(_));

		tracing::info!(job_id = %outcome.job_id(), created, "Pending recording enqueued.");

		Ok(EnqueueResponse { job_id: outcome.job_id(), created })
	}

	pub async fn list_unmatched(&self, req: UnmatchedListRequest) -> Result<UnmatchedListResponse> {
		let limit = req.limit.unwrap_or(DEFAULT_UNMATCHED_LIMIT);

		if limit == 0 || limit > MAX_UNMATCHED_LIMIT {
			return Err(Error::InvalidRequest {
				message: format!("limit must be in the range 1-{MAX_UNMATCHED_LIMIT}."),
			});
		}

		let items = unmatched::list_unreviewed(&self.db.pool, i64::from(limit)).await?;
		let total_unreviewed = unmatched::count_unreviewed(&self.db.pool).await?;

		Ok(UnmatchedListResponse { items, total_unreviewed })
	}

	pub async fn stats(&self) -> Result<PendingStats> {
		Ok(pending::pending_stats(&self.db.pool).await?)
	}
}
