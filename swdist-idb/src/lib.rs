//! A library for parsing legacy software distribution manifests.
//!
//! A distribution directory holds one `<product>.idb` manifest per product
//! and a set of headerless subproduct files (`<product>.<sub>`) that
//! concatenate the compressed payload of every file entry. This crate turns
//! a manifest into [`FileEntry`] records and works out where each payload
//! record should start inside its subproduct file.
//!
//! # Features
//!
//! - Discover products in a distribution directory
//! - Tokenize manifest lines and locate the subgroup token
//! - Decode `key(value)` attributes (`size`, `cmpsize`, `symval`, `mach`)
//! - Track a write cursor per subproduct file to predict payload offsets
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! let root = Path::new("/mnt/cdrom/dist");
//!
//! for product in swdist_idb::list_products(root).unwrap() {
//!     let parsed = swdist_idb::parse(root, &product).unwrap();
//!
//!     for warning in &parsed.warnings {
//!         eprintln!("{warning}");
//!     }
//!
//!     for entry in parsed.entries.iter().filter(|e| e.is_file()) {
//!         println!("{} @ {:?}", entry.name, entry.payload_offset);
//!     }
//! }
//! ```

use snafu::{ResultExt, Snafu};
use std::path::{Path, PathBuf};

pub mod attrs;
pub mod entry;
pub mod latin1;
pub mod line;
pub mod parser;

pub use self::attrs::Attributes;
pub use self::entry::{EntryType, FileEntry};
pub use self::line::SubproductLookup;
pub use self::parser::{IdbParser, ParseWarning, WarningKind};

/// File extension of manifests.
pub const IDB_EXTENSION: &str = "idb";

/// Length of the fixed prologue at the start of every subproduct file.
/// The first payload record follows it.
pub const SUBPRODUCT_HEADER_LEN: u64 = 13;

/// The outcome of parsing one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Product identifier (manifest file name without extension).
    pub product: String,
    /// Entries in manifest order.
    pub entries: Vec<FileEntry>,
    /// One warning per skipped line.
    pub warnings: Vec<ParseWarning>,
}

/// Errors that abort a parse.
#[derive(Debug, Snafu)]
#[snafu(module)]
#[non_exhaustive]
pub enum ParseError {
    #[snafu(display("cannot open idb: {}", path.display()))]
    OpenManifest {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("missing subproduct file '{base}' referenced by {manifest}:{line}"))]
    MissingSubproduct {
        base: String,
        manifest: String,
        line: usize,
    },
}

/// Errors when listing the products of a distribution directory.
#[derive(Debug, Snafu)]
#[snafu(module)]
#[non_exhaustive]
pub enum ListProductsError {
    #[snafu(display("cannot read directory {}", path.display()))]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Returns the identifiers of all products in `root`, sorted by name.
///
/// A product is any regular file with the `.idb` extension; its identifier
/// is the file name without the extension.
pub fn list_products(root: &Path) -> Result<Vec<String>, ListProductsError> {
    let read_dir = root
        .read_dir()
        .context(list_products_error::ReadDirSnafu { path: root })?;

    let mut products = Vec::new();

    for dirent in read_dir {
        let dirent = dirent.context(list_products_error::ReadDirSnafu { path: root })?;
        let path = dirent.path();

        if !path.is_file() || path.extension().is_none_or(|ext| ext != IDB_EXTENSION) {
            continue;
        }

        if let Some(stem) = path.file_stem() {
            products.push(stem.to_string_lossy().into_owned());
        }
    }

    products.sort();

    Ok(products)
}

/// Parses `<root>/<product>.idb`.
///
/// Subproduct files are looked up in `root`, both to disambiguate subgroup
/// tokens and to check that every referenced subproduct is present.
///
/// # Errors
///
/// Fails if the manifest cannot be read or references a subproduct file that
/// does not exist. Malformed lines are reported as warnings instead.
pub fn parse(root: &Path, product: &str) -> Result<ParseResult, ParseError> {
    let file_name = format!("{product}.{IDB_EXTENSION}");
    let path = root.join(&file_name);
    let raw = std::fs::read(&path).context(parse_error::OpenManifestSnafu { path: &path })?;

    let result = parse_manifest(root, product, &file_name, &latin1::decode(&raw))?;

    tracing::info!(
        product,
        entries = result.entries.len(),
        warnings = result.warnings.len(),
        "parsed manifest"
    );

    Ok(result)
}

/// Parses manifest text that has already been loaded.
///
/// `manifest` names the manifest in error messages.
pub fn parse_manifest<L: SubproductLookup>(
    lookup: L,
    product: &str,
    manifest: &str,
    text: &str,
) -> Result<ParseResult, ParseError> {
    let mut parser = IdbParser::new(lookup, manifest);

    for line in text.lines() {
        parser.feed_line(line)?;
    }

    Ok(parser.finish(product))
}
