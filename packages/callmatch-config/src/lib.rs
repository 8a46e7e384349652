mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Postgres, ProviderConfig, Reconcile, Security, Service, Storage};

use std::{env, fs, path::Path};

pub const ENV_PROVIDER_API_BASE: &str = "CALLMATCH_PROVIDER_API_BASE";
pub const ENV_PROVIDER_AUTH_TOKEN: &str = "CALLMATCH_PROVIDER_AUTH_TOKEN";
pub const ENV_CRON_SECRET: &str = "CALLMATCH_CRON_SECRET";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg = parse(&raw, path)?;

	apply_env_overrides(&mut cfg, |key| env::var(key).ok());
	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn parse(raw: &str, path: &Path) -> Result<Config> {
	toml::from_str(raw).map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })
}

/// Secrets and the provider base URL may come from the environment instead of the file.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	if let Some(api_base) = lookup(ENV_PROVIDER_API_BASE) {
		cfg.provider.api_base = api_base;
	}
	if let Some(token) = lookup(ENV_PROVIDER_AUTH_TOKEN) {
		cfg.provider.auth_token = Some(token);
	}
	if let Some(secret) = lookup(ENV_CRON_SECRET) {
		cfg.security.cron_secret = Some(secret);
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let api_base = cfg.provider.api_base.trim();

	if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
		return Err(Error::Validation {
			message: "provider.api_base must be an http or https URL.".to_string(),
		});
	}
	if !cfg.provider.recordings_path.starts_with('/') {
		return Err(Error::Validation {
			message: "provider.recordings_path must start with '/'.".to_string(),
		});
	}
	if cfg.provider.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "provider.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.provider.result_limit == 0 || cfg.provider.result_limit > 100 {
		return Err(Error::Validation {
			message: "provider.result_limit must be in the range 1-100.".to_string(),
		});
	}
	if cfg.reconcile.batch_size == 0 {
		return Err(Error::Validation {
			message: "reconcile.batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.reconcile.time_budget_seconds == 0 {
		return Err(Error::Validation {
			message: "reconcile.time_budget_seconds must be greater than zero.".to_string(),
		});
	}
	// A lease shorter than the run budget lets an overlapping run pick up a job that is
	// still being worked on.
	if cfg.reconcile.claim_lease_seconds <= cfg.reconcile.time_budget_seconds as i64 {
		return Err(Error::Validation {
			message: "reconcile.claim_lease_seconds must exceed reconcile.time_budget_seconds."
				.to_string(),
		});
	}
	if cfg.reconcile.run_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "reconcile.run_interval_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

pub fn normalize(cfg: &mut Config) {
	cfg.provider.api_base = cfg.provider.api_base.trim().trim_end_matches('/').to_string();

	if cfg.provider.auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false) {
		cfg.provider.auth_token = None;
	}
	if cfg.security.cron_secret.as_deref().map(|secret| secret.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.cron_secret = None;
	}
}

