pub mod queue;
pub mod reconcile;
pub mod store;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use callmatch_config::Config;
use callmatch_domain::{PotentialMatch, RecordingDescriptor, RetryPhase};
use callmatch_providers::{RecordingClient, RecordingLookup};
use callmatch_storage::{
	db::Db,
	models::{CallRecord, PendingRecordingJob, RecordingAttachment},
};

pub use error::{Error, Result};
pub use queue::{EnqueueRequest, EnqueueResponse, UnmatchedListRequest, UnmatchedListResponse};
pub use reconcile::{JobError, PhaseBreakdown, ReconcileSettings, Reconciler, RunSummary};
pub use store::PgReconcileStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where recordings come from. One call per lookup; retries belong to the scheduler.
pub trait RecordingSource
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		lookup: RecordingLookup<'a>,
	) -> BoxFuture<'a, callmatch_providers::Result<Vec<RecordingDescriptor>>>;
}

/// Persistence seen by the orchestrator.
pub trait ReconcileStore
where
	Self: Send + Sync,
{
	fn claim_next_due<'a>(
		&'a self,
		now: OffsetDateTime,
		lease_seconds: i64,
	) -> BoxFuture<'a, Result<Option<PendingRecordingJob>>>;

	/// Calls of the job's lead, newest first, including calls that already carry a recording.
	fn job_calls<'a>(&'a self, job: &'a PendingRecordingJob) -> BoxFuture<'a, Result<Vec<CallRecord>>>;

	/// Returns `false` when the call already had a recording.
	fn attach_recording<'a>(
		&'a self,
		attachment: &'a RecordingAttachment,
	) -> BoxFuture<'a, Result<bool>>;

	fn upsert_unmatched<'a>(
		&'a self,
		lead_id: Option<&'a str>,
		recording: &'a RecordingDescriptor,
		potential_matches: &'a [PotentialMatch],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn resolve<'a>(
		&'a self,
		job_id: Uuid,
		attempts: i32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn reschedule<'a>(
		&'a self,
		job_id: Uuid,
		attempts: i32,
		phase: RetryPhase,
		next_run_at: OffsetDateTime,
		error_text: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn exhaust<'a>(
		&'a self,
		job_id: Uuid,
		attempts: i32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;
}

impl RecordingSource for RecordingClient {
	fn fetch<'a>(
		&'a self,
		lookup: RecordingLookup<'a>,
	) -> BoxFuture<'a, callmatch_providers::Result<Vec<RecordingDescriptor>>> {
		Box::pin(RecordingClient::fetch(self, lookup))
	}
}

pub struct CallmatchService {
	pub cfg: Config,
	pub db: Arc<Db>,
	source: Option<Arc<dyn RecordingSource>>,
}
impl CallmatchService {
	/// Builds the provider client from `cfg`. A missing auth token is not fatal here; it surfaces
	/// as a configuration error on the first reconcile run.
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let source: Option<Arc<dyn RecordingSource>> = match RecordingClient::new(&cfg.provider) {
			Ok(client) => Some(Arc::new(client)),
			Err(callmatch_providers::Error::Auth { .. }) => None,
			Err(err) => return Err(Error::Configuration { message: err.to_string() }),
		};

		Ok(Self { cfg, db: Arc::new(db), source })
	}

	pub fn with_source(cfg: Config, db: Db, source: Arc<dyn RecordingSource>) -> Self {
		Self { cfg, db: Arc::new(db), source: Some(source) }
	}

	/// Runs one bounded reconcile batch against Postgres.
	pub async fn reconcile(&self) -> Result<RunSummary> {
		let source = self.source.clone().ok_or_else(|| Error::Configuration {
			message: "provider.auth_token is not configured.".to_string(),
		})?;
		let store = Arc::new(PgReconcileStore::new(self.db.clone()));
		let reconciler =
			Reconciler::new(store, source, ReconcileSettings::from_config(&self.cfg.reconcile));

		reconciler.run().await
	}
}
