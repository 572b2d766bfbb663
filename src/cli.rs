use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "Summarize YouTube videos from their transcripts",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Account email (defaults to default_user from the config file)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Output format: text (default), json
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Show config and data locations
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize a video (reads URLs from stdin if omitted)
    Summarize {
        /// YouTube video URL
        url: Option<String>,

        /// Preferred caption language
        #[arg(short, long)]
        lang: Option<String>,

        /// LLM model for summarization
        #[arg(long)]
        model: Option<String>,
    },

    /// List your saved summaries, newest first
    History {
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Show a saved summary
    Show {
        /// Summary id
        id: String,
    },

    /// Delete one of your saved summaries
    Delete {
        /// Summary id
        id: String,
    },

    /// Show your remaining credits
    Credits,
}
