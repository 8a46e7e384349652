use std::time::Duration;

use reqwest::{Client, StatusCode, header::ACCEPT};
use serde_json::Value;

use callmatch_config::ProviderConfig;
use callmatch_domain::RecordingDescriptor;

use crate::{Error, Result, normalize};

/// Which provider reference a lookup is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingLookup<'a> {
	Call(&'a str),
	Lead(&'a str),
}
impl RecordingLookup<'_> {
	fn query_key(&self) -> &'static str {
		match self {
			Self::Call(_) => "call_id",
			Self::Lead(_) => "lead_id",
		}
	}

	fn value(&self) -> &str {
		match self {
			Self::Call(value) | Self::Lead(value) => value,
		}
	}
}

/// Recording-lookup client. Performs exactly one request per [`RecordingClient::fetch`].
#[derive(Debug, Clone)]
pub struct RecordingClient {
	client: Client,
	endpoint: String,
	auth_token: String,
	result_limit: u32,
}
impl RecordingClient {
	pub fn new(cfg: &ProviderConfig) -> Result<Self> {
		let auth_token = cfg
			.auth_token
			.as_deref()
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.ok_or_else(|| Error::Auth {
				message: "Provider auth token is not configured.".to_string(),
			})?
			.to_string();
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let endpoint = format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.recordings_path);

		Ok(Self { client, endpoint, auth_token, result_limit: cfg.result_limit })
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	pub async fn fetch(&self, lookup: RecordingLookup<'_>) -> Result<Vec<RecordingDescriptor>> {
		let limit = self.result_limit.to_string();
		let res = self
			.client
			.get(&self.endpoint)
			.header(ACCEPT, "application/json")
			.query(&[
				("auth_token", self.auth_token.as_str()),
				("limit", limit.as_str()),
				(lookup.query_key(), lookup.value()),
			])
			.send()
			.await?;
		let status = res.status();

		if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
			return Err(Error::Auth { message: format!("Provider returned HTTP {status}.") });
		}
		if !status.is_success() {
			return Err(Error::Unavailable { message: format!("Provider returned HTTP {status}.") });
		}

		let json: Value = res.json().await?;
		let descriptors = normalize::parse_recordings(&json).map_err(|err| match err {
			Error::Unavailable { message } =>
				Error::Unavailable { message: crate::redact(&message, &self.auth_token) },
			other => other,
		})?;

		tracing::debug!(
			lookup = lookup.query_key(),
			count = descriptors.len(),
			"Fetched provider recordings."
		);

		Ok(descriptors)
	}
}
