//! Splitting a manifest line into fields and finding its subgroup token.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Number of whitespace separated tokens a line needs: six leading fields
/// and at least one tail token.
pub const MIN_FIELDS: usize = 7;

/// Answers whether a subproduct file exists for a given base name.
///
/// Subgroup detection and the missing-subproduct check both consult this.
/// A directory on disk is the usual implementation; sets are handy in tests.
pub trait SubproductLookup {
    /// Returns `true` if a subproduct file named `base` is available.
    fn contains(&self, base: &str) -> bool;
}

impl SubproductLookup for Path {
    fn contains(&self, base: &str) -> bool {
        self.join(base).is_file()
    }
}

impl SubproductLookup for PathBuf {
    fn contains(&self, base: &str) -> bool {
        self.as_path().contains(base)
    }
}

impl SubproductLookup for BTreeSet<String> {
    fn contains(&self, base: &str) -> bool {
        BTreeSet::contains(self, base)
    }
}

impl SubproductLookup for HashSet<String> {
    fn contains(&self, base: &str) -> bool {
        HashSet::contains(self, base)
    }
}

impl<T: SubproductLookup + ?Sized> SubproductLookup for &T {
    fn contains(&self, base: &str) -> bool {
        (**self).contains(base)
    }
}

/// The fixed leading fields of a line plus its unparsed tail tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    pub tag: &'a str,
    pub mode: &'a str,
    pub owner: &'a str,
    pub group: &'a str,
    pub name: &'a str,
    pub source_path: &'a str,
    pub tail: Vec<&'a str>,
}

impl<'a> RawLine<'a> {
    /// Splits a line on runs of whitespace.
    ///
    /// Returns `None` if the line has fewer than [`MIN_FIELDS`] tokens.
    #[must_use]
    pub fn split(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace();

        let tag = tokens.next()?;
        let mode = tokens.next()?;
        let owner = tokens.next()?;
        let group = tokens.next()?;
        let name = tokens.next()?;
        let source_path = tokens.next()?;
        let tail: Vec<&str> = tokens.collect();

        if tail.is_empty() {
            return None;
        }

        Some(Self {
            tag,
            mode,
            owner,
            group,
            name,
            source_path,
            tail,
        })
    }

    /// Removes the subgroup token from the tail.
    ///
    /// Returns the token and the remaining tail joined by single spaces, or
    /// `None` if no tail token qualifies. See [`find_subgroup`].
    pub fn take_subgroup<L: SubproductLookup + ?Sized>(
        &mut self,
        lookup: &L,
    ) -> Option<(&'a str, String)> {
        let index = find_subgroup(&self.tail, lookup)?;
        let subgroup = self.tail.remove(index);

        Some((subgroup, self.tail.join(" ")))
    }
}

/// Returns the first two dot separated segments of a subgroup token,
/// skipping empty segments.
///
/// `prod.sw.base` names the subproduct file `prod.sw`.
#[must_use]
pub fn subproduct_base(subgroup: &str) -> Option<String> {
    let mut parts = subgroup.split('.').filter(|s| !s.is_empty());
    let first = parts.next()?;
    let second = parts.next()?;

    Some(format!("{first}.{second}"))
}

/// Returns `true` if `token` has the shape `seg.seg.seg[.seg...]`.
///
/// Only ASCII alphanumerics and `_+.-` are allowed, which also rules out
/// `(`, `)`, `/` and `=`.
#[must_use]
pub fn looks_like_subgroup(token: &str) -> bool {
    let allowed = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'.' | b'-');
    let bytes = token.as_bytes();

    if bytes.len() < 5 || !bytes.iter().copied().all(allowed) {
        return false;
    }

    // Need a dot with something before it, and a later dot with something
    // between and after.
    let first = bytes[1..].iter().position(|&b| b == b'.').map(|p| p + 1);
    let last = bytes[..bytes.len() - 1].iter().rposition(|&b| b == b'.');

    match (first, last) {
        (Some(first), Some(last)) => last >= first + 2,
        _ => false,
    }
}

/// Picks the index of the subgroup token among the tail tokens of a line.
///
/// The first token whose [`subproduct_base`] exists according to `lookup`
/// wins. If there is none, the first token that [`looks_like_subgroup`] is
/// used.
///
/// Results depend on which subproduct files are present: the same line can
/// resolve differently against a partial distribution.
pub fn find_subgroup<L: SubproductLookup + ?Sized>(tail: &[&str], lookup: &L) -> Option<usize> {
    tail.iter()
        .position(|token| subproduct_base(token).is_some_and(|base| lookup.contains(&base)))
        .or_else(|| tail.iter().position(|token| looks_like_subgroup(token)))
}
