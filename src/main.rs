use clap::{Parser, Subcommand};
use std::path::PathBuf;
use transcript_blame::commands;
use transcript_blame::config::Config;
use transcript_blame::observability;

#[derive(Parser)]
#[command(name = "transcript-blame", version)]
#[command(about = "Line-level provenance for transcripts of file edits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a session and write its code-view data as JSON
    Build {
        /// JSON file with `operations`, `messages` and optional `context_ids`
        session: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Show a progress bar while replaying
        #[arg(long)]
        progress: bool,
    },
    /// Print the range and message a deep link such as `src/a.rs:L12` points at
    Resolve { session: PathBuf, link: String },
}

fn main() {
    let cli = Cli::parse();

    Config::init();
    if let Some(log_path) = Config::get().log_path() {
        observability::set_log_path(log_path.clone());
    }

    let result = match &cli.command {
        Command::Build {
            session,
            output,
            progress,
        } => commands::build::handle_build(session, output.as_deref(), *progress),
        Command::Resolve { session, link } => commands::resolve::handle_resolve(session, link),
    };

    if let Err(e) = result {
        observability::log_error(&e, None);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
