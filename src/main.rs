use clap::Parser;
use irradiance_processor::cli::{run, Cli};
use irradiance_processor::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
