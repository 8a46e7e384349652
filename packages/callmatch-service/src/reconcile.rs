//! Bounded reconcile batch.
//!
//! Jobs are claimed one at a time and processed sequentially. A job ends its pass in exactly one
//! of three ways: resolved (this pass put a recording on one of its calls), rescheduled by the
//! retry schedule, or exhausted. Every failed pass consumes an attempt, storage failures included.
//! Only when the outcome itself cannot be written does the job wait out its claim lease.

use std::{
	collections::HashSet,
	sync::Arc,
	time::{Duration, Instant},
};

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tokio::time as tokio_time;
use uuid::Uuid;

use callmatch_domain::{
	CallCandidate, MatchResult, RecordingDescriptor, RetryDecision, RetryPhase, fingerprint,
	matching, retry,
};
use callmatch_providers::RecordingLookup;
use callmatch_storage::models::{CallRecord, PendingRecordingJob, RecordingAttachment};

use crate::{Error, ReconcileStore, RecordingSource, Result};

const MAX_JOB_ERROR_CHARS: usize = 1_024;
const POTENTIAL_MATCH_LIMIT: usize = 3;
const NO_CALLS_ERROR: &str = "No call records found for this job.";
const NO_MATCH_ERROR: &str = "No recording matched a call.";
const NO_REFERENCE_ERROR: &str = "Job has neither a provider call id nor a lead id.";

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
	pub batch_size: u32,
	pub time_budget: Duration,
	pub inter_item_delay: Duration,
	pub claim_lease_seconds: i64,
}
impl ReconcileSettings {
	pub fn from_config(cfg: &callmatch_config::Reconcile) -> Self {
		Self {
			batch_size: cfg.batch_size,
			time_budget: Duration::from_secs(cfg.time_budget_seconds),
			inter_item_delay: Duration::from_millis(cfg.inter_item_delay_ms),
			claim_lease_seconds: cfg.claim_lease_seconds,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseBreakdown {
	pub quick: u32,
	pub backoff: u32,
	pub r#final: u32,
}
impl PhaseBreakdown {
	fn record(&mut self, phase: RetryPhase) {
		match phase {
			RetryPhase::Quick => self.quick += 1,
			RetryPhase::Backoff => self.backoff += 1,
			RetryPhase::Final => self.r#final += 1,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobError {
	pub job_id: Uuid,
	pub error: String,
}

/// Outcome of one run. `failed` counts every job that was not resolved, `exhausted` included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
	pub processed: u32,
	pub matched: u32,
	pub failed: u32,
	pub unmatched: u32,
	pub exhausted: u32,
	pub errors: Vec<JobError>,
	pub phase_breakdown: PhaseBreakdown,
	pub stopped_early: bool,
	pub duration_ms: u64,
}

pub struct Reconciler {
	store: Arc<dyn ReconcileStore>,
	source: Arc<dyn RecordingSource>,
	settings: ReconcileSettings,
}
impl Reconciler {
	pub fn new(
		store: Arc<dyn ReconcileStore>,
		source: Arc<dyn RecordingSource>,
		settings: ReconcileSettings,
	) -> Self {
		Self { store, source, settings }
	}

	/// Processes up to `batch_size` due jobs.
	///
	/// Only a failure to select the next job aborts the run; per-job failures land in
	/// [`RunSummary::errors`].
	pub async fn run(&self) -> Result<RunSummary> {
		if self.settings.batch_size == 0 {
			return Err(Error::Configuration {
				message: "reconcile.batch_size must be greater than zero.".to_string(),
			});
		}

		let started = Instant::now();
		let mut summary = RunSummary::default();

		while summary.processed < self.settings.batch_size {
			if summary.processed > 0 {
				if started.elapsed() >= self.settings.time_budget {
					summary.stopped_early = true;

					tracing::info!(
						processed = summary.processed,
						"Reconcile run reached its time budget."
					);

					break;
				}
				if !self.settings.inter_item_delay.is_zero() {
					tokio_time::sleep(self.settings.inter_item_delay).await;
				}
			}

			let now = OffsetDateTime::now_utc();
			let Some(job) =
				self.store.claim_next_due(now, self.settings.claim_lease_seconds).await?
			else {
				break;
			};

			summary.processed += 1;
			summary.phase_breakdown.record(job.phase());

			self.process_job(&job, &mut summary).await;
		}

		summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

		tracing::info!(
			processed = summary.processed,
			matched = summary.matched,
			failed = summary.failed,
			unmatched = summary.unmatched,
			exhausted = summary.exhausted,
			duration_ms = summary.duration_ms,
			"Reconcile run finished."
		);

		Ok(summary)
	}

	async fn process_job(&self, job: &PendingRecordingJob, summary: &mut RunSummary) {
		let attempt = job.attempts.saturating_add(1);
		let failure = match self.attempt_job(job, summary).await {
			Ok(JobPass::Resolved) => match self.store.resolve(job.job_id, attempt, now()).await {
				Ok(()) => {
					summary.matched += 1;

					tracing::info!(job_id = %job.job_id, attempt, "Pending recording resolved.");

					return;
				},
				Err(err) => PassFailure::storage(job, &err),
			},
			Ok(JobPass::Retry(failure)) => failure,
			Err(err) => PassFailure::storage(job, &err),
		};

		self.schedule_retry(job, attempt, failure, summary).await;
	}

	async fn attempt_job(
		&self,
		job: &PendingRecordingJob,
		summary: &mut RunSummary,
	) -> Result<JobPass> {
		let calls = self.store.job_calls(job).await?;

		if calls.is_empty() {
			return Ok(JobPass::quiet(NO_CALLS_ERROR));
		}
		if calls.iter().all(|call| call.recording_url.is_some()) {
			tracing::debug!(job_id = %job.job_id, "Every call already has a recording.");

			return Ok(JobPass::Resolved);
		}

		let Some(lookup) = job_lookup(job) else {
			return Ok(JobPass::quiet(NO_REFERENCE_ERROR));
		};
		let recordings = match self.source.fetch(lookup).await {
			Ok(recordings) => recordings,
			Err(err) if err.is_empty_result() => return Ok(JobPass::quiet(&err.to_string())),
			Err(err) => {
				tracing::warn!(job_id = %job.job_id, error = %err, "Recording fetch failed.");

				return Ok(JobPass::Retry(PassFailure::reported(&err.to_string())));
			},
		};
		let mut candidates: Vec<CallCandidate> = calls.iter().map(CallRecord::candidate).collect();
		let mut attached: HashSet<String> =
			calls.iter().filter_map(|call| call.recording_url.clone()).collect();
		let mut resolved = false;

		for recording in &recordings {
			// Already on some call of the lead; it says nothing about the calls still missing one.
			if attached.contains(&recording.url) {
				continue;
			}

			let Some(result) = matching::best_match(recording, &candidates)
				.filter(MatchResult::is_committable)
			else {
				let potential =
					matching::potential_matches(recording, &candidates, POTENTIAL_MATCH_LIMIT);

				self.store
					.upsert_unmatched(job.lead_id.as_deref(), recording, &potential, now())
					.await?;

				summary.unmatched += 1;

				tracing::info!(
					job_id = %job.job_id,
					recording_id = %recording.recording_id,
					potential = potential.len(),
					"Recording queued for review."
				);

				continue;
			};
			let call = calls.iter().find(|call| call.call_id == result.call_id);
			let attachment = build_attachment(job, recording, &result, call);
			let committed = self.store.attach_recording(&attachment).await?;

			if committed {
				tracing::info!(
					job_id = %job.job_id,
					call_id = %result.call_id,
					tier = result.tier.as_str(),
					score = result.score,
					"Recording attached to call."
				);
			} else {
				tracing::debug!(
					job_id = %job.job_id,
					call_id = %result.call_id,
					"Call already had a recording."
				);
			}

			if let Some(candidate) =
				candidates.iter_mut().find(|candidate| candidate.call_id == result.call_id)
			{
				candidate.recording_url = Some(recording.url.clone());
			}

			attached.insert(recording.url.clone());

			resolved = true;
		}

		if resolved { Ok(JobPass::Resolved) } else { Ok(JobPass::quiet(NO_MATCH_ERROR)) }
	}

	async fn schedule_retry(
		&self,
		job: &PendingRecordingJob,
		attempt: i32,
		failure: PassFailure,
		summary: &mut RunSummary,
	) {
		let PassFailure { reason, report } = failure;
		let reason = reason.as_str();

		if report {
			summary.errors.push(JobError { job_id: job.job_id, error: reason.to_string() });
		}

		let now = now();
		let (result, exhausted) = match retry::next_retry(attempt) {
			RetryDecision::Retry { delay, phase } => {
				tracing::info!(
					job_id = %job.job_id,
					attempt,
					phase = phase.as_str(),
					delay_minutes = delay.whole_minutes(),
					"Pending recording rescheduled."
				);

				(
					self.store.reschedule(job.job_id, attempt, phase, now + delay, reason, now).await,
					false,
				)
			},
			RetryDecision::Exhausted => {
				tracing::warn!(
					job_id = %job.job_id,
					attempt,
					last_error = reason,
					"Pending recording exhausted its retries."
				);

				(self.store.exhaust(job.job_id, attempt, now).await, true)
			},
		};

		summary.failed += 1;

		if let Err(err) = result {
			let error_text = sanitize_job_error(&err.to_string());

			// The claim lease still hides the job; the next claim repeats this attempt.
			tracing::error!(
				job_id = %job.job_id,
				attempt,
				error = %error_text,
				"Failed to record pending recording outcome."
			);

			summary.errors.push(JobError { job_id: job.job_id, error: error_text });
		} else if exhausted {
			summary.exhausted += 1;
		}
	}
}

enum JobPass {
	Resolved,
	Retry(PassFailure),
}
impl JobPass {
	fn quiet(reason: &str) -> Self {
		Self::Retry(PassFailure { reason: reason.to_string(), report: false })
	}
}

/// `report` marks failures worth surfacing in the run summary, as opposed to the ordinary
/// "not ready yet" outcomes.
struct PassFailure {
	reason: String,
	report: bool,
}
impl PassFailure {
	fn reported(text: &str) -> Self {
		Self { reason: sanitize_job_error(text), report: true }
	}

	fn storage(job: &PendingRecordingJob, err: &Error) -> Self {
		let failure = Self::reported(&err.to_string());

		tracing::error!(
			job_id = %job.job_id,
			error = %failure.reason,
			"Pending recording pass hit a storage error."
		);

		failure
	}
}

fn now() -> OffsetDateTime {
	OffsetDateTime::now_utc()
}

fn job_lookup(job: &PendingRecordingJob) -> Option<RecordingLookup<'_>> {
	non_blank(&job.provider_call_id)
		.map(RecordingLookup::Call)
		.or_else(|| non_blank(&job.lead_id).map(RecordingLookup::Lead))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn build_attachment(
	job: &PendingRecordingJob,
	recording: &RecordingDescriptor,
	result: &MatchResult,
	call: Option<&CallRecord>,
) -> RecordingAttachment {
	let fallback_lead_id =
		non_blank(&job.lead_id).or_else(|| call.and_then(|call| non_blank(&call.lead_id)));
	let fallback_agent_name = call.and_then(|call| non_blank(&call.agent_name));
	let fingerprint =
		fingerprint::descriptor_fingerprint(recording, fallback_lead_id, fallback_agent_name);

	RecordingAttachment {
		call_id: result.call_id,
		recording_url: recording.url.clone(),
		confidence: result.tier.as_str().to_string(),
		score: result.score,
		fingerprint,
		match_metadata: json!({
			"recording_id": recording.recording_id,
			"job_id": job.job_id,
			"tier": result.tier,
			"score": result.score,
			"reason": result.reason,
			"start_diff_seconds": result.start_diff_seconds,
			"duration_diff_seconds": result.duration_diff_seconds,
		}),
		matched_at: now(),
	}
}

/// Redacts credential-looking words and bounds the length of stored error text.
pub fn sanitize_job_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["auth_token", "api_key", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_JOB_ERROR_CHARS {
		out = out.chars().take(MAX_JOB_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}
