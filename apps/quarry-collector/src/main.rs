use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = quarry_collector::Args::parse();
	quarry_collector::run(args).await
}
