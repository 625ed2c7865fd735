use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dry")]
#[command(about = "Duplicates detector [Don't repeat yourself!]", long_about = None)]
pub struct Cli {
    /// Print all messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// No output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index a folder and report its duplicate files
    Scan(ScanArgs),
    /// Index a folder into the shared PostgreSQL store as one producer
    Index(IndexArgs),
    /// Group the duplicates of a session in the shared PostgreSQL store
    Group(GroupArgs),
    /// Print the newest session id of the shared PostgreSQL store
    LastSession,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output target, a file or a folder (default .)
    #[arg(short = 'o', long = "target", visible_alias = "out", default_value = ".")]
    pub target: PathBuf,

    /// Output format
    #[arg(short, long = "format", visible_alias = "fmt", value_enum, default_value_t = Format::Sqlite)]
    pub format: Format,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Folder to scan
    pub path: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Producer id of this process
    #[arg(long)]
    pub producer: Option<i32>,

    /// Session id shared by all producers of one run
    #[arg(long)]
    pub session: Option<i32>,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Folder to scan
    pub path: PathBuf,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Delete the session's file records once groups are written
    #[arg(long)]
    pub cleanup: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// JSON report file
    Json,
    /// JSON report on standard output
    Stdout,
    /// Coloured listing on standard output
    Text,
    /// The SQLite store itself
    Sqlite,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => ".json",
            Format::Stdout | Format::Text => ".txt",
            Format::Sqlite => ".sqlite",
        }
    }
}
