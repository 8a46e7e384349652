use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Canonical recording entry returned by the telephony provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDescriptor {
	pub recording_id: String,
	pub url: String,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339::option")]
	pub ended_at: Option<OffsetDateTime>,
	pub duration_seconds: i64,
	pub lead_id: Option<String>,
	pub call_id: Option<String>,
	pub agent_name: Option<String>,
}
impl RecordingDescriptor {
	/// Provider end time when present, otherwise start plus duration. `None` when that sum
	/// leaves the representable range.
	pub fn end_time(&self) -> Option<OffsetDateTime> {
		self.ended_at.or_else(|| {
			self.started_at.checked_add(time::Duration::seconds(self.duration_seconds))
		})
	}
}

/// A stored call as seen by the scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct CallCandidate {
	pub call_id: Uuid,
	pub started_at: OffsetDateTime,
	pub duration_seconds: i64,
	pub recording_url: Option<String>,
}
impl CallCandidate {
	pub fn has_recording(&self) -> bool {
		self.recording_url.is_some()
	}
}
