use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use swdist_util::ExtractOptions;

#[derive(Debug, Parser)]
#[command(name = "swdist")]
#[command(about = "Legacy software distribution extractor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the products of a distribution directory
    Products {
        /// Distribution directory
        #[arg(value_name = "ROOT")]
        root: PathBuf,
    },

    /// List the entries of a product
    List {
        /// Distribution directory
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Product identifier (manifest name without .idb)
        product: String,
    },

    /// Extract the entries of a product
    Extract {
        /// Distribution directory
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Product identifier (manifest name without .idb)
        product: String,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Only extract entries with these exact names
        #[arg(value_name = "NAMES")]
        names: Vec<String>,

        #[command(flatten)]
        options: OptionArgs,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Debug, Args)]
pub struct OptionArgs {
    /// Leave payloads compressed as <name>.Z
    #[arg(long)]
    pub no_decompress: bool,

    /// Keep <name>.Z next to the decompressed file
    #[arg(long)]
    pub keep_z: bool,

    /// Stop at the first failed entry
    #[arg(long)]
    pub stop_on_error: bool,

    /// Bytes to search before a misplaced payload
    #[arg(long, value_name = "BYTES", default_value_t = ExtractOptions::default().resync_back)]
    pub resync_back: u64,

    /// Bytes to search after a misplaced payload
    #[arg(long, value_name = "BYTES", default_value_t = ExtractOptions::default().resync_forward)]
    pub resync_forward: u64,

    /// Read size while searching
    #[arg(long, value_name = "BYTES", default_value_t = ExtractOptions::default().resync_chunk)]
    pub resync_chunk: u64,
}

impl From<&OptionArgs> for ExtractOptions {
    fn from(args: &OptionArgs) -> Self {
        Self {
            no_decompress: args.no_decompress,
            keep_z: args.keep_z,
            continue_on_error: !args.stop_on_error,
            resync_back: args.resync_back,
            resync_forward: args.resync_forward,
            resync_chunk: args.resync_chunk,
        }
    }
}
