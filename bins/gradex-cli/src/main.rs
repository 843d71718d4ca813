mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gradex-cli")]
#[command(about = "Gradex CLI - Run submissions and validate question banks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file against a question's hidden test cases
    Grade {
        /// Path to the student source file
        #[arg(short, long)]
        file: PathBuf,

        /// Language name (python, javascript, java, cpp)
        #[arg(short, long)]
        language: String,

        /// Question bank JSON file
        #[arg(short, long, default_value = "config/tests.json")]
        bank: PathBuf,

        /// Test or assignment id inside the bank
        #[arg(short, long)]
        test: String,

        /// Question id (positional index for legacy records without one)
        #[arg(short, long)]
        question: String,
    },

    /// Validate a question bank file without dispatching anything
    CheckBank {
        /// Question bank JSON file
        #[arg(short, long, default_value = "config/tests.json")]
        bank: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Grade {
            file,
            language,
            bank,
            test,
            question,
        } => commands::grade(&file, &language, &bank, &test, &question).await,
        Commands::CheckBank { bank } => commands::check_bank(&bank),
    }
}
