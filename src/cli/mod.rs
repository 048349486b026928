use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod convert;
pub mod serve;

use crate::client::DisplayZone;

#[derive(Subcommand)]
enum Command {
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "4000")]
        port: String,
    },
    /// Convert a zone-local `yyyy-MM-ddTHH:mm` value to UTC
    ToUtc {
        value: String,
        #[arg(long, default_value = "America/Chicago")]
        zone: DisplayZone,
    },
    /// Render a UTC instant as a zone-local `yyyy-MM-ddTHH:mm` value
    ToLocal {
        value: String,
        #[arg(long, default_value = "America/Chicago")]
        zone: DisplayZone,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    // A missing .env is fine, the environment may already be set
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::ToUtc { value, zone }) => {
            println!("{}", convert::to_utc(&value, zone)?);
        }
        Some(Command::ToLocal { value, zone }) => {
            println!("{}", convert::to_local(&value, zone)?);
        }
        None => {}
    }

    Ok(())
}
