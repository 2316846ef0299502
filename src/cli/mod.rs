mod auth;
mod upload;

use crate::error::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "csv-to-sheets")]
#[command(about = "Append rows from a local CSV file to a Google Sheets tab", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Upload => upload::execute().await,
            Commands::Auth { reset } => auth::execute(*reset).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append the configured CSV file to the configured spreadsheet
    Upload,
    /// Verify Google authentication, running the consent flow if needed
    Auth {
        /// Discard cached tokens and authenticate from scratch
        #[arg(long)]
        reset: bool,
    },
}
