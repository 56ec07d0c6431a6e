use crate::locate::LocateError;
use snafu::Snafu;
use std::path::PathBuf;

/// Why a single entry could not be extracted.
///
/// The display text is the reason recorded next to the entry name in
/// [`ExtractResult::messages`](super::ExtractResult::messages).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum EntryError {
    #[snafu(display("cannot open subproduct {}: {source}", path.display()))]
    OpenSubproduct {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{source}"))]
    Locate { source: LocateError },

    #[snafu(display("LZW decompress failed: {name}"))]
    Decompress {
        name: String,
        source: swdist_lzw::DecodeError,
    },

    #[snafu(display("cannot create directory {}: {source}", path.display()))]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("output path is a directory: {}", path.display()))]
    OutputIsDirectory { path: PathBuf },

    #[snafu(display("cannot write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot commit {}: {source}", path.display()))]
    Commit {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot set permissions on {}: {source}", path.display()))]
    SetPermissions {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot remove temp file {}: {source}", path.display()))]
    RemoveTemp {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that stop a run before any entry is processed.
///
/// These are folded into the [`ExtractResult`](super::ExtractResult) rather
/// than returned, so callers always get a result to display.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ExtractError {
    #[snafu(display("Cannot create output directory: {}", path.display()))]
    CreateOutputRoot {
        path: PathBuf,
        source: std::io::Error,
    },
}
