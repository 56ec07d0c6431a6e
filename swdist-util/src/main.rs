mod cli;

use clap::Parser;
use cli::{Cli, Command, OptionArgs};
use snafu::{ResultExt, Snafu, ensure};
use std::path::{Path, PathBuf};
use swdist_idb::FileEntry;
use swdist_util::{ConsoleProgress, DistExtractor, ExtractOptions, ExtractResult, SilentProgress};

/// Top-level application errors for swdist.
#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to list products in '{}'", root.display()))]
    ListProducts {
        root: PathBuf,
        source: swdist_idb::ListProductsError,
    },

    #[snafu(display("failed to parse product '{product}'"))]
    Parse {
        product: String,
        source: swdist_idb::ParseError,
    },

    #[snafu(display("product '{product}' has no entry named '{name}'"))]
    UnknownEntry { product: String, name: String },

    #[snafu(display("{errors} entries failed"))]
    Incomplete { errors: usize },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[snafu::report]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Products { root } => cmd_products(&root),
        Command::List { root, product } => cmd_list(&root, &product),
        Command::Extract {
            root,
            product,
            output,
            names,
            options,
            quiet,
        } => cmd_extract(&root, &product, &output, &names, &options, quiet),
    }
}

fn cmd_products(root: &Path) -> Result<()> {
    let products = swdist_idb::list_products(root).context(ListProductsSnafu { root })?;

    for product in products {
        println!("{product}");
    }

    Ok(())
}

fn cmd_list(root: &Path, product: &str) -> Result<()> {
    let parsed = swdist_idb::parse(root, product).context(ParseSnafu { product })?;

    println!("Entries in {product}:");
    println!(
        "{:<4}  {:>4}  {:>10}  {:>10}  {:<20}  Name",
        "Type", "Mode", "Size", "Offset", "Subgroup"
    );
    println!("{:-<4}  {:-<4}  {:-<10}  {:-<10}  {:-<20}  {:-<30}", "", "", "", "", "", "");

    for entry in &parsed.entries {
        let offset = entry
            .payload_offset
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".into());
        let name = match &entry.symlink_target {
            Some(target) if entry.is_symlink() => format!("{} -> {target}", entry.name),
            _ => entry.name.clone(),
        };

        println!(
            "{:<4}  {:04o}  {:>10}  {:>10}  {:<20}  {}",
            entry.entry_type.tag(),
            entry.mode,
            entry.payload_size,
            offset,
            entry.subgroup,
            name
        );
    }

    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    Ok(())
}

fn cmd_extract(
    root: &Path,
    product: &str,
    output: &Path,
    names: &[String],
    args: &OptionArgs,
    quiet: bool,
) -> Result<()> {
    let parsed = swdist_idb::parse(root, product).context(ParseSnafu { product })?;

    for warning in &parsed.warnings {
        eprintln!("warning: {warning}");
    }

    let entries = select(parsed.entries, product, names)?;
    let options = ExtractOptions::from(args);

    if !quiet {
        println!(
            "Extracting {} entries of {product} to {}...",
            entries.len(),
            output.display()
        );
    }

    let start = std::time::Instant::now();

    let result = if quiet {
        DistExtractor::new(root, SilentProgress, options).extract(&entries, output)
    } else {
        DistExtractor::new(root, ConsoleProgress::new(), options).extract(&entries, output)
    };

    print_summary(&result, start.elapsed(), quiet);

    ensure!(result.errors == 0, IncompleteSnafu { errors: result.errors });

    Ok(())
}

/// Keeps the entries named in `names`, in manifest order. No names keeps
/// everything.
fn select(entries: Vec<FileEntry>, product: &str, names: &[String]) -> Result<Vec<FileEntry>> {
    if names.is_empty() {
        return Ok(entries);
    }

    if let Some(name) = names.iter().find(|n| !entries.iter().any(|e| &e.name == *n)) {
        return UnknownEntrySnafu { product, name }.fail();
    }

    Ok(entries
        .into_iter()
        .filter(|e| names.contains(&e.name))
        .collect())
}

fn print_summary(result: &ExtractResult, elapsed: std::time::Duration, quiet: bool) {
    for message in &result.messages {
        eprintln!("error: {message}");
    }

    if quiet {
        return;
    }

    println!(
        "Extracted {} of {} entries ({} skipped, {} errors){} in {:.2}s.",
        result.extracted,
        result.total,
        result.skipped,
        result.errors,
        if result.canceled { ", canceled" } else { "" },
        elapsed.as_secs_f64()
    );
}
