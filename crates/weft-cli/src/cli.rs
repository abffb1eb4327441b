use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use weft_types::WhitespaceMode;

#[derive(Parser)]
#[command(
    name = "weft",
    about = "weft -- two- and three-way file diff, merge and directory comparison",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with [diff], [merge] and [tree] sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum WhitespaceArg {
    None,
    Trailing,
    All,
}

impl From<WhitespaceArg> for WhitespaceMode {
    fn from(arg: WhitespaceArg) -> Self {
        match arg {
            WhitespaceArg::None => WhitespaceMode::None,
            WhitespaceArg::Trailing => WhitespaceMode::Trailing,
            WhitespaceArg::All => WhitespaceMode::All,
        }
    }
}

/// Line comparison flags shared by every subcommand.
#[derive(Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// Ignore changes that only add or remove blank lines
    #[arg(long, global = true)]
    pub ignore_blank_lines: bool,
    /// Ignore whitespace differences
    #[arg(long, global = true, value_enum)]
    pub ignore_whitespace: Option<WhitespaceArg>,
    /// Compare lines case-insensitively
    #[arg(long, global = true)]
    pub ignore_case: bool,
    /// Keep popular lines in the match index
    #[arg(long, global = true)]
    pub no_autojunk: bool,
    /// Regex removed from every line before comparison (repeatable)
    #[arg(long = "text-filter", global = true)]
    pub text_filters: Vec<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two files
    Diff(DiffArgs),
    /// Merge two files against their common ancestor
    Merge(MergeArgs),
    /// Compare two or three directories
    Dir(DirArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    pub left: PathBuf,
    pub right: PathBuf,
    /// Lines of context around each change
    #[arg(short = 'U', long, default_value = "3")]
    pub context: usize,
    /// Show character-level changes of replaced lines
    #[arg(long)]
    pub inline: bool,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Your version
    pub mine: PathBuf,
    /// The common ancestor
    pub base: PathBuf,
    /// Their version
    pub theirs: PathBuf,
    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Keep directly adjacent conflicts apart
    #[arg(long)]
    pub no_coalesce: bool,
}

#[derive(Args)]
pub struct DirArgs {
    /// Two directories, or three with the ancestor in the middle
    #[arg(num_args = 2..=3, required = true)]
    pub roots: Vec<PathBuf>,
    /// Trust equal size and modification time
    #[arg(long)]
    pub shallow: bool,
    /// Match entry names case-insensitively
    #[arg(long)]
    pub ignore_name_case: bool,
    /// Gitignore-style pattern to leave out (repeatable)
    #[arg(short = 'x', long = "exclude")]
    pub excludes: Vec<String>,
    /// Do not apply the built-in backup and VCS excludes
    #[arg(long)]
    pub no_default_excludes: bool,
    /// Report symlinks as errors instead of following them
    #[arg(long)]
    pub no_follow: bool,
    /// List entries that are the same as well
    #[arg(short, long)]
    pub all: bool,
}
