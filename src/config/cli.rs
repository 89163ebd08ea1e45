use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "raw-loader")]
#[command(about = "Incrementally stage source tables as CSV and load them into the warehouse")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "raw-loader.toml")]
    pub config: PathBuf,

    /// Local directory standing in for the buckets; each bucket is a subdirectory
    #[arg(long, default_value = "./output")]
    pub output_path: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU/memory usage per phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract every configured table since its checkpoint and stage it as CSV
    Ingest {
        /// Show the queries that would run without touching anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Submit warehouse copy statements for the objects in a stored trigger event
    Load {
        /// Object-created notification JSON
        #[arg(short, long)]
        event: PathBuf,
    },
}

impl CliConfig {
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.output_path.join(bucket)
    }
}
