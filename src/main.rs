use clap::Parser;
use pagesnap::{setup_logging, Cli};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose);
    info!("starting pagesnap v{}", env!("CARGO_PKG_VERSION"));

    let mut pagesnap = args.build_engine().await?;
    pagesnap.run().await?;

    println!("{}", pagesnap.success_message());
    Ok(())
}
