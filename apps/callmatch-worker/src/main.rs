use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = callmatch_worker::Args::parse();

	callmatch_worker::run(args).await
}
