use std::time::Duration;

use color_eyre::Result;
use tokio::time as tokio_time;

use callmatch_service::{CallmatchService, Error, RunSummary};

/// Runs reconcile batches forever, one every `interval`.
///
/// Configuration errors stop the loop; anything else is logged and retried on the next tick.
pub async fn run_worker(service: &CallmatchService, interval: Duration) -> Result<()> {
	loop {
		match run_once(service).await {
			Ok(_) => {},
			Err(err @ Error::Configuration { .. }) => return Err(err.into()),
			Err(err) => {
				tracing::error!(error = %err, "Reconcile run failed.");
			},
		}

		tokio_time::sleep(interval).await;
	}
}

pub async fn run_once(service: &CallmatchService) -> Result<RunSummary, Error> {
	let summary = service.reconcile().await?;

	if !summary.errors.is_empty() {
		tracing::warn!(errors = summary.errors.len(), "Reconcile run finished with job errors.");
	}

	Ok(summary)
}
