//! Canonicalization of provider recording payloads.
//!
//! Endpoint versions disagree on envelope shape and field names. Each field has an ordered alias
//! list; the first alias holding a usable value wins.

use serde_json::{Map, Value};
use time::{
	OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
	format_description::well_known::Rfc3339, macros::format_description,
};

use callmatch_domain::RecordingDescriptor;

use crate::{Error, Result};

pub const RECORDING_ID_ALIASES: [&str; 3] = ["recording_id", "RecordingID", "id"];
pub const URL_ALIASES: [&str; 4] = ["url", "recording_url", "RecordingURL", "file_name"];
pub const START_ALIASES: [&str; 5] = ["start_time", "StartTime", "started_at", "date", "Date"];
pub const END_ALIASES: [&str; 3] = ["end_time", "EndTime", "ended_at"];
pub const DURATION_ALIASES: [&str; 4] = ["seconds", "duration", "Duration", "duration_sec"];
pub const LEAD_ALIASES: [&str; 2] = ["lead_id", "LeadID"];
pub const CALL_ALIASES: [&str; 2] = ["call_id", "CallID"];
pub const AGENT_ALIASES: [&str; 4] = ["agent_name", "AgentName", "User", "user"];

const SPACE_SEPARATED: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const T_SEPARATED: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Parses a lookup response into descriptors, in provider order.
///
/// Envelope precedence: `data.entries`, `data` as an array, `recordings`, then a bare array.
pub fn parse_recordings(json: &Value) -> Result<Vec<RecordingDescriptor>> {
	if let Some(false) = json.get("success").and_then(Value::as_bool) {
		let message = json
			.get("error")
			.or_else(|| json.get("message"))
			.and_then(Value::as_str)
			.unwrap_or("success flag is false")
			.to_string();

		return Err(Error::Unavailable { message });
	}

	let entries = entries(json).ok_or_else(|| Error::InvalidResponse {
		message: "Response has no recording entries list.".to_string(),
	})?;
	let descriptors: Vec<RecordingDescriptor> =
		entries.iter().filter_map(Value::as_object).filter_map(descriptor_from_entry).collect();

	if descriptors.is_empty() {
		return Err(Error::EmptyResult);
	}

	Ok(descriptors)
}

/// Maps one raw entry. Entries without a URL or a parseable start time are dropped.
pub fn descriptor_from_entry(entry: &Map<String, Value>) -> Option<RecordingDescriptor> {
	let url = first_string(entry, &URL_ALIASES)?;
	let started_at = first_timestamp(entry, &START_ALIASES)?;
	let ended_at = first_timestamp(entry, &END_ALIASES);
	let duration_seconds = first_seconds(entry, &DURATION_ALIASES)
		.or_else(|| ended_at.map(|end| (end - started_at).whole_seconds()))
		.unwrap_or(0)
		.max(0);
	let recording_id = first_string(entry, &RECORDING_ID_ALIASES).unwrap_or_else(|| url.clone());

	Some(RecordingDescriptor {
		recording_id,
		url,
		started_at,
		ended_at,
		duration_seconds,
		lead_id: first_string(entry, &LEAD_ALIASES),
		call_id: first_string(entry, &CALL_ALIASES),
		agent_name: first_string(entry, &AGENT_ALIASES),
	})
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	if raw.is_empty() {
		return None;
	}
	if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Some(ts);
	}

	// Naive timestamps are provider-local UTC.
	for format in [SPACE_SEPARATED, T_SEPARATED] {
		if let Ok(ts) = PrimitiveDateTime::parse(raw, format) {
			return Some(ts.assume_utc());
		}
	}

	raw.parse::<i64>().ok().and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
}

fn entries(json: &Value) -> Option<&Vec<Value>> {
	if let Some(data) = json.get("data") {
		if let Some(entries) = data.get("entries").and_then(Value::as_array) {
			return Some(entries);
		}
		if let Some(entries) = data.as_array() {
			return Some(entries);
		}
	}
	if let Some(entries) = json.get("recordings").and_then(Value::as_array) {
		return Some(entries);
	}

	json.as_array()
}

fn first_string(entry: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
	aliases.iter().find_map(|alias| match entry.get(*alias)? {
		Value::String(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	})
}

fn first_timestamp(entry: &Map<String, Value>, aliases: &[&str]) -> Option<OffsetDateTime> {
	aliases.iter().find_map(|alias| match entry.get(*alias)? {
		Value::String(raw) => parse_timestamp(raw),
		Value::Number(number) =>
			number.as_i64().and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()),
		_ => None,
	})
}

fn first_seconds(entry: &Map<String, Value>, aliases: &[&str]) -> Option<i64> {
	aliases.iter().find_map(|alias| {
		let seconds = match entry.get(*alias)? {
			Value::Number(number) => number.as_f64(),
			Value::String(raw) => raw.trim().parse::<f64>().ok(),
			_ => None,
		}?;

		seconds.is_finite().then(|| seconds.round() as i64)
	})
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use time::macros::datetime;

	use super::*;

	#[test]
	fn reads_entries_envelope() {
		let payload = json!({
			"success": true,
			"data": {
				"entries": [{
					"recording_id": "778",
					"url": "https://cdn.example/778.mp3",
					"start_time": "2025-01-15 10:30:00",
					"end_time": "2025-01-15 10:33:05",
					"seconds": "185",
					"lead_id": "10393511",
					"agent_name": "Jane Doe"
				}]
			}
		});
		let parsed = parse_recordings(&payload).expect("Expected descriptors.");

		assert_eq!(parsed.len(), 1);
		assert_eq!(parsed[0].recording_id, "778");
		assert_eq!(parsed[0].started_at, datetime!(2025-01-15 10:30:00 UTC));
		assert_eq!(parsed[0].ended_at, Some(datetime!(2025-01-15 10:33:05 UTC)));
		assert_eq!(parsed[0].duration_seconds, 185);
		assert_eq!(parsed[0].lead_id.as_deref(), Some("10393511"));
		assert_eq!(parsed[0].agent_name.as_deref(), Some("Jane Doe"));
	}

	#[test]
	fn reads_pascal_case_aliases_in_bare_array() {
		let payload = json!([{
			"RecordingID": 42,
			"RecordingURL": "https://cdn.example/42.mp3",
			"StartTime": "2025-01-15T10:30:00Z",
			"Duration": 61.6,
			"LeadID": 77,
			"AgentName": "Sam"
		}]);
		let parsed = parse_recordings(&payload).expect("Expected descriptors.");

		assert_eq!(parsed[0].recording_id, "42");
		assert_eq!(parsed[0].url, "https://cdn.example/42.mp3");
		assert_eq!(parsed[0].duration_seconds, 62);
		assert_eq!(parsed[0].lead_id.as_deref(), Some("77"));
	}

	#[test]
	fn alias_precedence_prefers_canonical_name() {
		let payload = json!({
			"recordings": [{
				"url": "https://cdn.example/primary.mp3",
				"recording_url": "https://cdn.example/secondary.mp3",
				"seconds": 10,
				"duration": 99,
				"start_time": "2025-01-15 10:30:00"
			}]
		});
		let parsed = parse_recordings(&payload).expect("Expected descriptors.");

		assert_eq!(parsed[0].url, "https://cdn.example/primary.mp3");
		assert_eq!(parsed[0].duration_seconds, 10);
		assert_eq!(parsed[0].recording_id, "https://cdn.example/primary.mp3");
	}

	#[test]
	fn blank_alias_falls_through() {
		let payload = json!({
			"success": true,
			"data": [{
				"url": "  ",
				"recording_url": "https://cdn.example/fallback.mp3",
				"date": "2025-01-15 10:30:00",
				"end_time": "2025-01-15 10:31:00"
			}]
		});
		let parsed = parse_recordings(&payload).expect("Expected descriptors.");

		assert_eq!(parsed[0].url, "https://cdn.example/fallback.mp3");
		assert_eq!(parsed[0].duration_seconds, 60);
	}

	#[test]
	fn drops_entries_without_url_or_start() {
		let payload = json!({
			"success": true,
			"data": { "entries": [
				{ "start_time": "2025-01-15 10:30:00", "seconds": 5 },
				{ "url": "https://cdn.example/no-start.mp3" }
			]}
		});

		assert!(matches!(parse_recordings(&payload), Err(Error::EmptyResult)));
	}

	#[test]
	fn empty_entries_is_empty_result() {
		let payload = json!({ "success": true, "data": { "entries": [] } });

		assert!(matches!(parse_recordings(&payload), Err(Error::EmptyResult)));
	}

	#[test]
	fn failed_envelope_is_unavailable() {
		let payload = json!({ "success": false, "error": "Rate limit exceeded" });

		match parse_recordings(&payload) {
			Err(Error::Unavailable { message }) => assert_eq!(message, "Rate limit exceeded"),
			other => panic!("Expected unavailable, got {other:?}."),
		}
	}

	#[test]
	fn missing_list_is_invalid() {
		let payload = json!({ "success": true, "data": { "total": 0 } });

		assert!(matches!(parse_recordings(&payload), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn parses_unix_seconds() {
		assert_eq!(parse_timestamp("1736937000"), Some(datetime!(2025-01-15 10:30:00 UTC)));
		assert_eq!(parse_timestamp("not a time"), None);
	}
}
