use anyhow::Result;
use calproxy::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
