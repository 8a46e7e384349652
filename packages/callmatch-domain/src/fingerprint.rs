use time::{
	OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::recording::RecordingDescriptor;

const START_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Lowercased `lead_agent_start_duration` key with the start in UTC and whole seconds.
pub fn recording_fingerprint(
	lead_id: &str,
	agent_name: &str,
	started_at: OffsetDateTime,
	duration_seconds: i64,
) -> Option<String> {
	let lead_id = lead_id.trim();
	let agent_name = agent_name.trim();

	if lead_id.is_empty() || agent_name.is_empty() {
		return None;
	}

	let start = started_at.to_offset(UtcOffset::UTC).format(START_FORMAT).ok()?;

	Some(format!("{lead_id}_{agent_name}_{start}_{duration_seconds}").to_lowercase())
}

/// Fingerprint of a provider entry; the fallbacks fill a lead or agent the provider left out.
pub fn descriptor_fingerprint(
	recording: &RecordingDescriptor,
	fallback_lead_id: Option<&str>,
	fallback_agent_name: Option<&str>,
) -> Option<String> {
	let lead_id = non_blank(recording.lead_id.as_deref()).or(fallback_lead_id)?;
	let agent_name = non_blank(recording.agent_name.as_deref()).or(fallback_agent_name)?;

	recording_fingerprint(lead_id, agent_name, recording.started_at, recording.duration_seconds)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.filter(|value| !value.trim().is_empty())
}
