pub mod worker;

use clap::Parser;

use callmatch_service::CallmatchService;
use callmatch_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = callmatch_cli::VERSION,
	rename_all = "kebab",
	styles = callmatch_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
	/// Run a single reconcile batch and exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = callmatch_config::load(&args.config)?;

	callmatch_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let interval = std::time::Duration::from_secs(config.reconcile.run_interval_seconds);
	let service = CallmatchService::new(config, db)?;

	if args.once {
		worker::run_once(&service).await?;

		return Ok(());
	}

	worker::run_worker(&service, interval).await
}
