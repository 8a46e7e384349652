use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = callmatch_api::Args::parse();

	callmatch_api::run(args).await
}
