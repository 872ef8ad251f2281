use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = tome_embed::Args::parse();
	tome_embed::run(args).await
}
