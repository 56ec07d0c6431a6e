use crate::attrs::Attributes;
use crate::entry::{EntryType, FileEntry};
use crate::line::{RawLine, SubproductLookup, subproduct_base};
use crate::{ParseError, ParseResult, SUBPRODUCT_HEADER_LEN};
use std::collections::HashMap;
use std::fmt;

/// A manifest line that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number.
    pub line: usize,
    pub kind: WarningKind,
}

/// Why a manifest line was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WarningKind {
    NotEnoughFields,
    NoSubgroup,
    BadSubgroup { subgroup: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {} ignored: ", self.line)?;

        match &self.kind {
            WarningKind::NotEnoughFields => write!(f, "not enough fields"),
            WarningKind::NoSubgroup => write!(f, "cannot locate subgroup token"),
            WarningKind::BadSubgroup { subgroup } => write!(f, "bad subgroup '{subgroup}'"),
        }
    }
}

/// Incremental manifest parser.
///
/// Lines are fed in manifest order. The parser keeps one write cursor per
/// subproduct file: each file entry records the cursor as its payload offset,
/// then the cursor moves past the entry's record (`2 + name + payload`).
/// Directories and symlinks never move a cursor.
#[derive(Debug)]
pub struct IdbParser<L> {
    lookup: L,
    manifest: String,
    cursors: HashMap<String, u64>,
    entries: Vec<FileEntry>,
    warnings: Vec<ParseWarning>,
    line_no: usize,
}

impl<L: SubproductLookup> IdbParser<L> {
    /// Creates a parser. `manifest` is only used in error messages.
    pub fn new(lookup: L, manifest: impl Into<String>) -> Self {
        Self {
            lookup,
            manifest: manifest.into(),
            cursors: HashMap::new(),
            entries: Vec::new(),
            warnings: Vec::new(),
            line_no: 0,
        }
    }

    /// Parses the next manifest line.
    ///
    /// Malformed lines are recorded as warnings and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingSubproduct`] the first time a line
    /// references a subproduct file that `lookup` does not know. The parser
    /// must not be used after that.
    pub fn feed_line(&mut self, line: &str) -> Result<(), ParseError> {
        self.line_no += 1;

        if line.trim().is_empty() {
            return Ok(());
        }

        let Some(mut raw) = RawLine::split(line) else {
            self.warn(WarningKind::NotEnoughFields);
            return Ok(());
        };

        let Some((subgroup, raw_attributes)) = raw.take_subgroup(&self.lookup) else {
            self.warn(WarningKind::NoSubgroup);
            return Ok(());
        };

        let Some(base) = subproduct_base(subgroup) else {
            self.warn(WarningKind::BadSubgroup {
                subgroup: subgroup.to_owned(),
            });
            return Ok(());
        };

        if !self.cursors.contains_key(&base) {
            if !self.lookup.contains(&base) {
                return Err(ParseError::MissingSubproduct {
                    base,
                    manifest: self.manifest.clone(),
                    line: self.line_no,
                });
            }

            tracing::debug!(subproduct = %base, line = self.line_no, "first reference to subproduct");
            self.cursors.insert(base.clone(), SUBPRODUCT_HEADER_LEN);
        }

        let attrs = if raw_attributes.is_empty() {
            Attributes::default()
        } else {
            Attributes::parse(&raw_attributes)
        };

        let mut entry = FileEntry {
            // Tokens are never empty, so there is always a first char.
            entry_type: EntryType::from_tag(raw.tag.chars().next().unwrap_or_default()),
            mode: u32::from_str_radix(raw.mode, 8).unwrap_or(0),
            owner: raw.owner.to_owned(),
            group: raw.group.to_owned(),
            name: raw.name.to_owned(),
            source_path: raw.source_path.to_owned(),
            subgroup: subgroup.to_owned(),
            subproduct_base: base,
            raw_attributes,
            machine_expr: attrs.mach,
            symlink_target: attrs.symval,
            declared_size: attrs.size,
            compressed_size: attrs.cmpsize,
            payload_size: 0,
            payload_offset: None,
        };

        if entry.is_file() {
            let payload = if entry.compressed_size > 0 {
                entry.compressed_size
            } else {
                entry.declared_size
            };

            let name_len = entry.name_bytes().len() as u64;

            // Inserted above on first reference.
            if let Some(cursor) = self.cursors.get_mut(&entry.subproduct_base) {
                entry.payload_size = payload;
                entry.payload_offset = Some(*cursor);
                *cursor += payload + name_len + 2;
            }
        }

        self.entries.push(entry);

        Ok(())
    }

    /// Returns the entries parsed so far.
    #[must_use]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Returns the current write cursor for a subproduct, if it has been
    /// referenced.
    #[must_use]
    pub fn cursor(&self, base: &str) -> Option<u64> {
        self.cursors.get(base).copied()
    }

    /// Consumes the parser and returns the result.
    pub fn finish(self, product: impl Into<String>) -> ParseResult {
        ParseResult {
            product: product.into(),
            entries: self.entries,
            warnings: self.warnings,
        }
    }

    fn warn(&mut self, kind: WarningKind) {
        let warning = ParseWarning {
            line: self.line_no,
            kind,
        };

        tracing::warn!(manifest = %self.manifest, "{warning}");
        self.warnings.push(warning);
    }
}
