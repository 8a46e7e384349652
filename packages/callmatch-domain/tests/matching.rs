use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use callmatch_domain::{
	CallCandidate, MatchTier, RecordingDescriptor,
	matching::{self, MIN_COMMIT_SCORE},
};

const T: OffsetDateTime = datetime!(2025-01-15 10:30:00 UTC);

fn recording(duration_seconds: i64) -> RecordingDescriptor {
	RecordingDescriptor {
		recording_id: "rec-1".to_string(),
		url: "https://recordings.example/rec-1.mp3".to_string(),
		started_at: T,
		ended_at: None,
		duration_seconds,
		lead_id: Some("10393511".to_string()),
		call_id: None,
		agent_name: Some("Agent".to_string()),
	}
}

fn call(offset_seconds: i64, duration_seconds: i64) -> CallCandidate {
	CallCandidate {
		call_id: Uuid::new_v4(),
		started_at: T + Duration::seconds(offset_seconds),
		duration_seconds,
		recording_url: None,
	}
}

#[test]
fn identical_call_is_exact() {
	let calls = vec![call(0, 185)];
	let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

	assert_eq!(result.tier, MatchTier::Exact);
	assert_eq!(result.score, 1.0);
	assert_eq!(result.call_id, calls[0].call_id);
}

#[test]
fn small_drift_is_fuzzy() {
	let calls = vec![call(4, 187)];
	let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

	assert_eq!(result.tier, MatchTier::Fuzzy);
	assert_eq!(result.score, 0.95);
}

#[test]
fn isolated_wider_drift_is_probable() {
	let calls = vec![call(25, 192)];
	let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

	assert_eq!(result.tier, MatchTier::Probable);
	assert_eq!(result.score, 0.8);
}

#[test]
fn start_beyond_thirty_seconds_is_unmatched() {
	let calls = vec![call(45, 185)];

	assert!(matching::best_match(&recording(185), &calls).is_none());
}

#[test]
fn exact_wins_over_earlier_fuzzy_candidate() {
	let fuzzy = call(3, 186);
	let exact = call(1, 185);
	let calls = vec![fuzzy, exact.clone()];
	let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

	assert_eq!(result.tier, MatchTier::Exact);
	assert_eq!(result.call_id, exact.call_id);
}

#[test]
fn exact_stops_scanning() {
	let exact = call(0, 185);
	let also_exact = call(1, 184);
	let calls = vec![exact.clone(), also_exact];
	let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

	assert_eq!(result.call_id, exact.call_id);
}

#[test]
fn first_fuzzy_candidate_is_kept() {
	let first = call(-4, 183);
	let second = call(2, 185);
	let calls = vec![first.clone(), second];
	let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

	assert_eq!(result.tier, MatchTier::Fuzzy);
	assert_eq!(result.call_id, first.call_id);
}

#[test]
fn ambiguous_probable_candidates_are_unmatched() {
	// Two calls forty seconds apart, both inside the probable window of the recording.
	let calls = vec![call(20, 190), call(-20, 180)];

	assert!(matching::best_match(&recording(185), &calls).is_none());
}

#[test]
fn neighbour_with_recording_still_breaks_isolation() {
	let mut matched = call(-30, 400);

	matched.recording_url = Some("https://recordings.example/old.mp3".to_string());

	let calls = vec![call(25, 192), matched];

	assert!(matching::best_match(&recording(185), &calls).is_none());
}

#[test]
fn calls_with_recordings_are_never_matched() {
	let mut matched = call(0, 185);

	matched.recording_url = Some("https://recordings.example/rec-0.mp3".to_string());

	assert!(matching::best_match(&recording(185), &[matched]).is_none());
}

#[test]
fn every_match_clears_commit_floor() {
	let offsets = [-40, -31, -30, -6, -5, -2, -1, 0, 1, 2, 5, 6, 29, 30, 31, 90];
	let durations = [170, 174, 175, 182, 184, 185, 186, 188, 195, 196, 240];

	for offset in offsets {
		for duration in durations {
			let calls = vec![call(offset, duration)];

			if let Some(result) = matching::best_match(&recording(185), &calls) {
				assert!(result.score >= MIN_COMMIT_SCORE, "offset {offset} duration {duration}");
				assert!(result.is_committable());
			}
		}
	}
}

#[test]
fn exact_window_always_yields_exact() {
	for offset in [-1, 0, 1] {
		for duration in [184, 185, 186] {
			let calls = vec![call(offset, duration), call(offset + 2, duration)];
			let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

			assert_eq!(result.tier, MatchTier::Exact);
			assert_eq!(result.score, 1.0);
			assert_eq!(result.call_id, calls[0].call_id);
		}
	}
}

#[test]
fn potential_matches_are_sub_threshold_and_ordered() {
	let near = call(40, 190);
	let far = call(300, 185);
	let outside = call(900, 185);
	let calls = vec![far.clone(), outside, near.clone()];
	let potentials = matching::potential_matches(&recording(185), &calls, 3);

	assert_eq!(potentials.len(), 2);
	assert_eq!(potentials[0].call_id, near.call_id);
	assert_eq!(potentials[1].call_id, far.call_id);
	assert!(potentials.iter().all(|potential| potential.score < MIN_COMMIT_SCORE));
}

#[test]
fn reason_names_tier_and_deltas() {
	let calls = vec![call(4, 187)];
	let result = matching::best_match(&recording(185), &calls).expect("Expected a match.");

	assert_eq!(result.reason, "FUZZY: start diff 4s, duration diff 2s");
}

#[test]
fn descriptor_end_time_falls_back_to_duration() {
	let rec = recording(185);

	assert_eq!(rec.end_time(), Some(T + Duration::seconds(185)));
}

#[test]
fn descriptor_end_time_prefers_provider_value_and_survives_overflow() {
	let mut rec = recording(185);

	rec.ended_at = Some(T + Duration::seconds(200));

	assert_eq!(rec.end_time(), Some(T + Duration::seconds(200)));

	rec.ended_at = None;
	rec.duration_seconds = i64::MAX;

	assert_eq!(rec.end_time(), None);
}
