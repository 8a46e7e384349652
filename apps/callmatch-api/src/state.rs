use std::sync::Arc;

use callmatch_service::CallmatchService;
use callmatch_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CallmatchService>,
}
impl AppState {
	pub async fn new(config: callmatch_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = CallmatchService::new(config, db)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: CallmatchService) -> Self {
		Self { service: Arc::new(service) }
	}

	pub fn cron_secret(&self) -> Option<&str> {
		self.service.cfg.security.cron_secret.as_deref()
	}
}
