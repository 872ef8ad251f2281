use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = tome_api::Args::parse();
	tome_api::run(args).await
}
