use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub provider: ProviderConfig,
	#[serde(default)]
	pub reconcile: Reconcile,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

/// Telephony provider recording-lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub api_base: String,
	#[serde(default = "default_recordings_path")]
	pub recordings_path: String,
	/// Sent as the `auth_token` query parameter. A missing token fails every reconcile run.
	pub auth_token: Option<String>,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_result_limit")]
	pub result_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reconcile {
	#[serde(default = "default_batch_size")]
	pub batch_size: u32,
	/// Wall-clock budget per run. Checked between jobs.
	#[serde(default = "default_time_budget_seconds")]
	pub time_budget_seconds: u64,
	#[serde(default = "default_inter_item_delay_ms")]
	pub inter_item_delay_ms: u64,
	#[serde(default = "default_claim_lease_seconds")]
	pub claim_lease_seconds: i64,
	/// Only used by the standalone worker loop.
	#[serde(default = "default_run_interval_seconds")]
	pub run_interval_seconds: u64,
}
impl Default for Reconcile {
	fn default() -> Self {
		Self {
			batch_size: default_batch_size(),
			time_budget_seconds: default_time_budget_seconds(),
			inter_item_delay_ms: default_inter_item_delay_ms(),
			claim_lease_seconds: default_claim_lease_seconds(),
			run_interval_seconds: default_run_interval_seconds(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Security {
	/// Shared secret the scheduler presents as a bearer token.
	pub cron_secret: Option<String>,
}

fn default_recordings_path() -> String {
	"/v1/leads/get-recordings".to_string()
}

fn default_timeout_ms() -> u64 {
	15_000
}

fn default_result_limit() -> u32 {
	10
}

fn default_batch_size() -> u32 {
	50
}

fn default_time_budget_seconds() -> u64 {
	300
}

fn default_inter_item_delay_ms() -> u64 {
	1_000
}

fn default_claim_lease_seconds() -> i64 {
	600
}

fn default_run_interval_seconds() -> u64 {
	60
}
