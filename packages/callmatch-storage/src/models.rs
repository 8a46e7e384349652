use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use callmatch_domain::{CallCandidate, RetryPhase};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingRecordingJob {
	pub job_id: Uuid,
	pub provider_call_id: Option<String>,
	pub lead_id: Option<String>,
	pub call_started_at: Option<OffsetDateTime>,
	pub call_ended_at: Option<OffsetDateTime>,
	pub attempts: i32,
	pub retry_phase: String,
	pub next_run_at: Option<OffsetDateTime>,
	pub last_error: Option<String>,
	pub processed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl PendingRecordingJob {
	/// Stored phase, or the phase implied by the next attempt when the column holds junk.
	pub fn phase(&self) -> RetryPhase {
		RetryPhase::parse(&self.retry_phase)
			.unwrap_or_else(|| RetryPhase::for_attempt(self.attempts + 1))
	}
}

#[derive(Debug, Clone)]
pub struct NewPendingJob {
	pub provider_call_id: Option<String>,
	pub lead_id: Option<String>,
	pub call_started_at: Option<OffsetDateTime>,
	pub call_ended_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
	Created(Uuid),
	Existing(Uuid),
}
impl EnqueueOutcome {
	pub fn job_id(self) -> Uuid {
		match self {
			Self::Created(job_id) | Self::Existing(job_id) => job_id,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingStats {
	pub quick_pending: i64,
	pub backoff_pending: i64,
	pub final_pending: i64,
	pub total_succeeded: i64,
	pub total_failed: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CallRecord {
	pub call_id: Uuid,
	pub lead_id: Option<String>,
	pub provider_call_id: Option<String>,
	pub agent_name: Option<String>,
	pub started_at: OffsetDateTime,
	pub ended_at: Option<OffsetDateTime>,
	pub duration_seconds: i64,
	pub recording_url: Option<String>,
	pub recording_match_confidence: Option<String>,
	pub recording_match_score: Option<f32>,
	pub recording_matched_at: Option<OffsetDateTime>,
	pub recording_fingerprint: Option<String>,
	pub metadata: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl CallRecord {
	pub fn candidate(&self) -> CallCandidate {
		CallCandidate {
			call_id: self.call_id,
			started_at: self.started_at,
			duration_seconds: self.duration_seconds,
			recording_url: self.recording_url.clone(),
		}
	}
}

/// Columns written when a recording is committed to a call.
#[derive(Debug, Clone)]
pub struct RecordingAttachment {
	pub call_id: Uuid,
	pub recording_url: String,
	pub confidence: String,
	pub score: f32,
	pub fingerprint: Option<String>,
	pub match_metadata: Value,
	pub matched_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UnmatchedRecording {
	pub unmatched_id: Uuid,
	pub lead_id: Option<String>,
	pub recording_id: String,
	pub recording_url: String,
	#[serde(with = "time::serde::rfc3339")]
	pub start_time: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339::option")]
	pub end_time: Option<OffsetDateTime>,
	pub duration_seconds: i64,
	pub potential_matches: Value,
	pub reviewed: bool,
	#[serde(with = "time::serde::rfc3339::option")]
	pub reviewed_at: Option<OffsetDateTime>,
	pub assigned_call_id: Option<Uuid>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
