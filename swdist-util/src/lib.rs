//! Library for extracting legacy software distributions.
//!
//! This crate turns the entries of a parsed manifest (see [`swdist_idb`]) into
//! files on disk. Payloads are read from the subproduct files next to the
//! manifest, found even when their recorded offsets have drifted, and
//! decompressed with [`swdist_lzw`].
//!
//! # Overview
//!
//! The main entry point is [`DistExtractor`], which takes the distribution
//! directory, an [`ExtractProgress`] implementation and [`ExtractOptions`],
//! then extracts a list of entries below an output directory. Every entry is
//! attempted in order; failures are collected in the [`ExtractResult`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use swdist_util::{DistExtractor, ExtractOptions, SilentProgress};
//!
//! let root = Path::new("/mnt/cdrom/dist");
//! let parsed = swdist_idb::parse(root, "eoe").expect("failed to parse manifest");
//!
//! let extractor = DistExtractor::new(root, SilentProgress, ExtractOptions::default());
//! let result = extractor.extract(&parsed.entries, "output/");
//!
//! for message in &result.messages {
//!     eprintln!("{message}");
//! }
//! ```
//!
//! # Cancellation
//!
//! Any `Fn(usize, usize, &str) -> bool` closure is an [`ExtractProgress`];
//! returning `false` stops the run before the next entry. For runs on a
//! background thread, [`spawn_extract`] returns a handle with a `cancel`
//! method.

pub mod extract;
pub mod locate;
pub mod options;
pub mod output;
pub mod progress;
pub mod source;
pub mod task;

pub use self::extract::{DistExtractor, EntryError, ExtractError, ExtractResult, extract};
pub use self::options::ExtractOptions;
pub use self::progress::{ExtractProgress, SilentProgress};
pub use self::task::{ExtractTask, ScanOutcome, ScanRequest, ScanWorker, spawn_extract};

#[cfg(feature = "cli")]
pub use self::progress::ConsoleProgress;
