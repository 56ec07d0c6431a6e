pub(crate) mod error;

pub use self::error::{EntryError, ExtractError};

use self::error::{
    CreateOutputRootSnafu, DecompressSnafu, LocateSnafu, OpenSubproductSnafu, RemoveTempSnafu,
};
use crate::locate::{ResyncWindow, Subproduct};
use crate::options::ExtractOptions;
use crate::output::{self, COMPRESSED_SUFFIX, DEFAULT_MODE, LinkOutcome};
use crate::progress::ExtractProgress;
use crate::source::SubproductFile;
use snafu::ResultExt;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use swdist_idb::{EntryType, FileEntry};

/// Counters and messages of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractResult {
    /// Number of entries handed to the run.
    pub total: usize,
    pub extracted: usize,
    /// Entries whose type is not file, directory or symlink.
    pub skipped: usize,
    pub errors: usize,
    pub canceled: bool,
    /// One `"name: reason"` line per failure.
    pub messages: Vec<String>,
}

impl ExtractResult {
    /// Number of entries that were attempted.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.extracted + self.skipped + self.errors
    }

    /// Returns `true` if every entry was handled without error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors == 0 && !self.canceled
    }
}

enum Outcome {
    Extracted,
    Skipped,
}

/// Extracts manifest entries from the subproduct files of a distribution.
pub struct DistExtractor<'a, P: ExtractProgress> {
    root: &'a Path,
    progress: P,
    options: ExtractOptions,
}

impl<'a, P: ExtractProgress> DistExtractor<'a, P> {
    /// Creates an extractor reading subproduct files from `root`.
    pub fn new(root: &'a Path, progress: P, options: ExtractOptions) -> Self {
        Self {
            root,
            progress,
            options,
        }
    }

    /// Extracts `entries` in order below `output`.
    ///
    /// Failures are counted in the returned result rather than returned as
    /// errors. Subproduct files are opened on first use and the offset
    /// corrections learned for them only live for this call.
    pub fn extract(&self, entries: &[FileEntry], output: impl AsRef<Path>) -> ExtractResult {
        let output = output.as_ref();
        let mut result = ExtractResult {
            total: entries.len(),
            ..ExtractResult::default()
        };

        if let Err(e) =
            std::fs::create_dir_all(output).context(CreateOutputRootSnafu { path: output })
        {
            tracing::error!(error = %e, "extraction aborted");

            result.errors = 1;
            result.messages.push(e.to_string());
            self.progress.completed(&result);

            return result;
        }

        let mut subproducts = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            if !self.progress.entry_start(i + 1, result.total, &entry.name) {
                tracing::info!(index = i + 1, "extraction canceled");
                result.canceled = true;
                break;
            }

            match self.extract_entry(entry, output, &mut subproducts) {
                Ok(Outcome::Extracted) => result.extracted += 1,
                Ok(Outcome::Skipped) => {
                    tracing::debug!(name = %entry.name, kind = %entry.entry_type, "skipped");
                    result.skipped += 1;
                    self.progress.entry_skipped(&entry.name);
                }
                Err(e) => {
                    let reason = e.to_string();

                    tracing::warn!(name = %entry.name, "{reason}");

                    result.errors += 1;
                    result.messages.push(format!("{}: {reason}", entry.name));
                    self.progress.entry_failed(&entry.name, &reason);

                    if !self.options.continue_on_error {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            total = result.total,
            extracted = result.extracted,
            skipped = result.skipped,
            errors = result.errors,
            canceled = result.canceled,
            "extraction finished"
        );

        self.progress.completed(&result);

        result
    }

    fn extract_entry(
        &self,
        entry: &FileEntry,
        out_dir: &Path,
        subproducts: &mut HashMap<String, Subproduct<SubproductFile>>,
    ) -> Result<Outcome, EntryError> {
        let path = output::output_path(out_dir, &entry.name);

        tracing::debug!(name = %entry.name, path = %path.display(), "extracting");

        match entry.entry_type {
            EntryType::Directory => output::create_dir(&path, entry.mode)?,
            EntryType::Symlink => {
                let target = entry.symlink_target.as_deref().unwrap_or_default();

                if let LinkOutcome::Fallback(file) = output::write_symlink(&path, target)? {
                    tracing::debug!(name = %entry.name, fallback = %file.display(), "link stored as text");
                }
            }
            EntryType::File if entry.payload_size == 0 => {
                output::write_file(&path, &[], entry.mode)?;
            }
            EntryType::File => self.extract_payload(entry, &path, subproducts)?,
            EntryType::Other(_) => return Ok(Outcome::Skipped),
        }

        Ok(Outcome::Extracted)
    }

    fn extract_payload(
        &self,
        entry: &FileEntry,
        path: &Path,
        subproducts: &mut HashMap<String, Subproduct<SubproductFile>>,
    ) -> Result<(), EntryError> {
        let subproduct = match subproducts.entry(entry.subproduct_base.clone()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                let sub_path = self.root.join(slot.key());
                let file =
                    SubproductFile::open(&sub_path).context(OpenSubproductSnafu { path: &sub_path })?;

                tracing::debug!(path = %sub_path.display(), "opened subproduct");

                slot.insert(Subproduct::new(file))
            }
        };

        let window = ResyncWindow {
            back: self.options.resync_back,
            forward: self.options.resync_forward,
            chunk: self.options.resync_chunk,
        };

        let payload = subproduct
            .read_payload(entry, &window)
            .context(LocateSnafu)?;

        let z_path = output::with_suffix(path, COMPRESSED_SUFFIX);

        output::write_file(&z_path, &payload, DEFAULT_MODE)?;

        if self.options.no_decompress {
            return Ok(());
        }

        let data = if payload.starts_with(&swdist_lzw::MAGIC) {
            swdist_lzw::decompress(&payload).context(DecompressSnafu { name: &entry.name })?
        } else {
            payload
        };

        output::write_file(path, &data, entry.mode)?;

        if !self.options.keep_z {
            output::remove_file(&z_path).context(RemoveTempSnafu { path: &z_path })?;
        }

        Ok(())
    }
}

/// Extracts `entries` of the distribution in `root` below `output`.
///
/// Shorthand for [`DistExtractor::extract`].
pub fn extract<P: ExtractProgress>(
    root: &Path,
    entries: &[FileEntry],
    output: &Path,
    options: ExtractOptions,
    progress: P,
) -> ExtractResult {
    DistExtractor::new(root, progress, options).extract(entries, output)
}
