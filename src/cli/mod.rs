//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{AuthorRole, Period, SortKey};

#[derive(Parser)]
#[command(name = "chat-export-analyzer")]
#[command(version)]
#[command(about = "Analyze chat conversation exports (export .zip or conversations.json)", long_about = None)]
pub struct Cli {
    /// Export .zip or conversations.json to load (defaults to config
    /// `export_path`, then the newest export in the downloads directory)
    #[arg(long, global = true)]
    pub export: Option<PathBuf>,

    /// Configuration file (defaults to <config dir>/chat-export-analyzer/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fail on the first invalid conversation instead of skipping it
    #[arg(long, global = true)]
    pub strict: bool,

    /// Only consider matching conversations, e.g. `plugin:weather content:code`
    #[arg(long, short = 'f', global = true)]
    pub filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show collection statistics
    Stats {
        /// Print per-conversation statistics and the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the highest-ranking conversations
    Top {
        #[arg(long, value_enum, default_value_t = SortBy::Messages)]
        by: SortBy,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Write one markdown file per conversation
    Markdown {
        /// Output directory (defaults to config `output_dir`)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Remove existing markdown files in the output directory first
        #[arg(long)]
        clear: bool,
        /// Omit the YAML front matter
        #[arg(long)]
        no_yaml: bool,
    },
    /// Count conversations (or messages) per week or month
    Timeline {
        #[arg(long, value_enum, default_value_t = PeriodArg::Week)]
        period: PeriodArg,
        /// Count individual messages by their own timestamps
        #[arg(long)]
        messages: bool,
        /// With --messages, only count messages by this author
        #[arg(long, value_enum, requires = "messages")]
        role: Option<RoleArg>,
    },
    /// Most frequent words in the conversation text
    Words {
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
        /// Include regenerated branches, not only the main branch
        #[arg(long)]
        all_branches: bool,
        #[arg(short = 'n', long, default_value_t = 30)]
        count: usize,
        #[arg(long, default_value_t = 3)]
        min_len: usize,
        /// Also write the full table as TSV
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    Messages,
    Leaves,
    Branches,
    Plugins,
    ContentTypes,
    Created,
    Updated,
}

impl From<SortBy> for SortKey {
    fn from(value: SortBy) -> Self {
        match value {
            SortBy::Messages => SortKey::MessageCount,
            SortBy::Leaves => SortKey::LeafCount,
            SortBy::Branches => SortKey::BranchPoints,
            SortBy::Plugins => SortKey::PluginCount,
            SortBy::ContentTypes => SortKey::ContentTypeCount,
            SortBy::Created => SortKey::CreateTime,
            SortBy::Updated => SortKey::UpdateTime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Week,
    Month,
}

impl From<PeriodArg> for Period {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Week => Period::Week,
            PeriodArg::Month => Period::Month,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    User,
    Assistant,
    System,
    Tool,
}

impl From<RoleArg> for AuthorRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::User => AuthorRole::User,
            RoleArg::Assistant => AuthorRole::Assistant,
            RoleArg::System => AuthorRole::System,
            RoleArg::Tool => AuthorRole::Tool,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config);
    commands::execute(&cli, &config)
}

/// `RUST_LOG` wins over the configured level; logs go to stderr so reports on
/// stdout stay machine readable
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
