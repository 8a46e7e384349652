//! Recording-to-call matching.
//!
//! Tiers are evaluated strictest first. An exact hit ends the scan, fuzzy and probable hits are
//! kept only while nothing better has been seen. Calls that already carry a recording are never
//! candidates but still count as neighbours for the probable-tier isolation check.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recording::{CallCandidate, RecordingDescriptor};

pub const EXACT_SCORE: f32 = 1.0;
pub const FUZZY_SCORE: f32 = 0.95;
pub const PROBABLE_SCORE: f32 = 0.8;
/// Lowest score the orchestrator may commit.
pub const MIN_COMMIT_SCORE: f32 = PROBABLE_SCORE;

const EXACT_MAX_START_SECONDS: f64 = 1.0;
const EXACT_MAX_DURATION_SECONDS: i64 = 1;
const FUZZY_MAX_START_SECONDS: f64 = 5.0;
const FUZZY_MAX_DURATION_SECONDS: i64 = 3;
const PROBABLE_MAX_START_SECONDS: f64 = 30.0;
const PROBABLE_MAX_DURATION_SECONDS: i64 = 10;
const ISOLATION_WINDOW_SECONDS: f64 = 60.0;
const POTENTIAL_WINDOW_SECONDS: f64 = 600.0;
const POTENTIAL_SCORE_CEILING: f32 = 0.79;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
	Exact,
	Fuzzy,
	Probable,
	Unmatched,
}
impl MatchTier {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Exact => "exact",
			Self::Fuzzy => "fuzzy",
			Self::Probable => "probable",
			Self::Unmatched => "unmatched",
		}
	}

	pub fn score(self) -> f32 {
		match self {
			Self::Exact => EXACT_SCORE,
			Self::Fuzzy => FUZZY_SCORE,
			Self::Probable => PROBABLE_SCORE,
			Self::Unmatched => 0.0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
	pub call_id: Uuid,
	pub tier: MatchTier,
	pub score: f32,
	pub reason: String,
	pub start_diff_seconds: f64,
	pub duration_diff_seconds: i64,
}
impl MatchResult {
	pub fn is_committable(&self) -> bool {
		self.tier != MatchTier::Unmatched && self.score >= MIN_COMMIT_SCORE
	}
}

/// Sub-threshold candidate kept alongside an unmatched recording for manual review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialMatch {
	pub call_id: Uuid,
	pub score: f32,
	pub start_diff_seconds: f64,
	pub duration_diff_seconds: i64,
}

#[derive(Debug, Clone, Copy)]
struct Deltas {
	start_seconds: f64,
	duration_seconds: i64,
}
impl Deltas {
	fn between(recording: &RecordingDescriptor, call: &CallCandidate) -> Self {
		let start_seconds = start_gap_seconds(recording.started_at, call.started_at);
		let duration_seconds = (recording.duration_seconds - call.duration_seconds).abs();

		Self { start_seconds, duration_seconds }
	}

	fn is_exact(self) -> bool {
		self.start_seconds <= EXACT_MAX_START_SECONDS
			&& self.duration_seconds <= EXACT_MAX_DURATION_SECONDS
	}

	fn is_fuzzy(self) -> bool {
		self.start_seconds <= FUZZY_MAX_START_SECONDS
			&& self.duration_seconds <= FUZZY_MAX_DURATION_SECONDS
	}

	fn is_probable(self) -> bool {
		self.start_seconds <= PROBABLE_MAX_START_SECONDS
			&& self.duration_seconds <= PROBABLE_MAX_DURATION_SECONDS
	}
}

/// Scores `recording` against the lead's calls, supplied newest first.
///
/// Returns `None` when no call clears the probable tier. Any returned result has a score of at
/// least [`MIN_COMMIT_SCORE`].
pub fn best_match(recording: &RecordingDescriptor, calls: &[CallCandidate]) -> Option<MatchResult> {
	let mut best: Option<MatchResult> = None;

	for call in calls.iter().filter(|call| !call.has_recording()) {
		let deltas = Deltas::between(recording, call);

		if deltas.is_exact() {
			return Some(build_result(call, MatchTier::Exact, deltas));
		}

		let best_score = best.as_ref().map(|result| result.score).unwrap_or(0.0);

		if deltas.is_fuzzy() {
			if best_score < FUZZY_SCORE {
				best = Some(build_result(call, MatchTier::Fuzzy, deltas));
			}

			continue;
		}
		if deltas.is_probable() && best_score < PROBABLE_SCORE && is_isolated(call, calls) {
			best = Some(build_result(call, MatchTier::Probable, deltas));
		}
	}

	best
}

/// True when no other call of the lead starts within a minute of `candidate`.
///
/// The window is centred on the candidate's start, not the recording's.
pub fn is_isolated(candidate: &CallCandidate, calls: &[CallCandidate]) -> bool {
	!calls.iter().any(|other| {
		other.call_id != candidate.call_id
			&& start_gap_seconds(other.started_at, candidate.started_at) <= ISOLATION_WINDOW_SECONDS
	})
}

/// Closest unmatched calls within ten minutes, best first, each scored below the commit floor.
pub fn potential_matches(
	recording: &RecordingDescriptor,
	calls: &[CallCandidate],
	limit: usize,
) -> Vec<PotentialMatch> {
	let mut out: Vec<PotentialMatch> = calls
		.iter()
		.filter(|call| !call.has_recording())
		.filter_map(|call| {
			let deltas = Deltas::between(recording, call);

			if deltas.start_seconds > POTENTIAL_WINDOW_SECONDS {
				return None;
			}

			Some(PotentialMatch {
				call_id: call.call_id,
				score: potential_score(deltas),
				start_diff_seconds: deltas.start_seconds,
				duration_diff_seconds: deltas.duration_seconds,
			})
		})
		.collect();

	out.sort_by(|a, b| {
		b.score.total_cmp(&a.score).then(a.start_diff_seconds.total_cmp(&b.start_diff_seconds))
	});
	out.truncate(limit);

	out
}

fn potential_score(deltas: Deltas) -> f32 {
	let start_factor = 1.0 - (deltas.start_seconds / POTENTIAL_WINDOW_SECONDS);
	let duration_factor = 1.0 - (deltas.duration_seconds.min(60) as f64 / 120.0);
	let raw = (start_factor * duration_factor).clamp(0.0, 1.0) as f32;
	let rounded = (raw * 100.0).round() / 100.0;

	rounded.min(POTENTIAL_SCORE_CEILING)
}

fn build_result(call: &CallCandidate, tier: MatchTier, deltas: Deltas) -> MatchResult {
	let reason = format!(
		"{}: start diff {}s, duration diff {}s",
		tier.as_str().to_ascii_uppercase(),
		deltas.start_seconds,
		deltas.duration_seconds
	);

	MatchResult {
		call_id: call.call_id,
		tier,
		score: tier.score(),
		reason,
		start_diff_seconds: deltas.start_seconds,
		duration_diff_seconds: deltas.duration_seconds,
	}
}

fn start_gap_seconds(a: time::OffsetDateTime, b: time::OffsetDateTime) -> f64 {
	(a - b).abs().as_seconds_f64()
}
