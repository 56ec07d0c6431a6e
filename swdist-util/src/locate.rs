//! Finding payload records inside a subproduct file.
//!
//! Records are `[u16 BE name length][name][payload]`. The offsets predicted
//! by the manifest parser drift on some media, so a record that is not where
//! it should be is searched for in a window around the expected offset, and
//! the correction found is reused for later records of the same file.

use crate::source::Source;
use snafu::{OptionExt, Snafu};
use swdist_idb::FileEntry;
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// Smallest read size of a resync scan.
pub const MIN_RESYNC_CHUNK: u64 = 4096;

/// Size of the name length that precedes every record name.
pub const NAME_LEN_SIZE: u64 = 2;

#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RecordHeaderRaw {
    name_len: U16,
}

/// Errors when locating or reading a payload.
#[derive(Debug, Snafu)]
#[snafu(module)]
#[non_exhaustive]
pub enum LocateError {
    #[snafu(display("{name} has no payload offset"))]
    NoOffset { name: String },

    #[snafu(display("out of sync at {offset} (delta={delta})"))]
    OutOfSync { offset: u64, delta: i64 },

    #[snafu(display("short read for {name}"))]
    ShortRead {
        name: String,
        source: std::io::Error,
    },
}

/// Bounds of a resync scan around the expected offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncWindow {
    pub back: u64,
    pub forward: u64,
    pub chunk: u64,
}

/// A located record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Offset of the name length.
    pub offset: u64,
    /// Length of the matching name variant.
    pub name_len: u64,
}

impl Record {
    /// Offset of the first payload byte.
    #[must_use]
    pub const fn payload_offset(&self) -> u64 {
        self.offset + NAME_LEN_SIZE + self.name_len
    }
}

/// A subproduct file and the offset correction learned for it.
pub struct Subproduct<S> {
    source: S,
    delta: i64,
}

impl<S: Source> Subproduct<S> {
    pub fn new(source: S) -> Self {
        Self { source, delta: 0 }
    }

    /// Correction applied to every predicted offset in this file.
    #[must_use]
    pub fn delta(&self) -> i64 {
        self.delta
    }

    /// Returns `true` if a record named `name` starts at `offset`.
    #[must_use]
    pub fn header_matches(&self, offset: u64, name: &[u8]) -> bool {
        let mut raw = vec![0u8; NAME_LEN_SIZE as usize + name.len()];

        if self.source.read_exact_at(offset, &mut raw).is_err() {
            return false;
        }

        let Ok((header, stored)) = RecordHeaderRaw::read_from_prefix(&raw) else {
            return false;
        };

        usize::from(header.name_len.get()) == name.len() && stored == name
    }

    /// Finds the record of `entry`, updating the delta when the record was
    /// not at its corrected offset.
    pub fn locate(
        &mut self,
        entry: &FileEntry,
        window: &ResyncWindow,
    ) -> Result<Record, LocateError> {
        let offset = entry.payload_offset.context(locate_error::NoOffsetSnafu {
            name: &entry.name,
        })?;
        let variants = entry.name_variants();
        let expected = offset.checked_add_signed(self.delta);

        if let Some(record) = expected.and_then(|at| self.match_at(at, &variants)) {
            return Ok(record);
        }

        let anchor = expected.unwrap_or(0);

        if let Some(record) = self.scan(anchor, &variants, window) {
            let delta = record.offset as i64 - offset as i64;

            tracing::warn!(
                name = %entry.name,
                expected = offset,
                found = record.offset,
                delta,
                "resynchronized payload offset"
            );

            self.delta = delta;

            return Ok(record);
        }

        if self.delta != 0 {
            if let Some(record) = self.match_at(offset, &variants) {
                tracing::warn!(
                    name = %entry.name,
                    stale = self.delta,
                    "dropped stale offset correction"
                );

                self.delta = 0;

                return Ok(record);
            }
        }

        locate_error::OutOfSyncSnafu {
            offset,
            delta: self.delta,
        }
        .fail()
    }

    /// Locates `entry` and reads its `payload_size` bytes.
    pub fn read_payload(
        &mut self,
        entry: &FileEntry,
        window: &ResyncWindow,
    ) -> Result<Vec<u8>, LocateError> {
        let record = self.locate(entry, window)?;
        let fits = record
            .payload_offset()
            .checked_add(entry.payload_size)
            .is_some_and(|end| end <= self.source.len());

        if !fits {
            return Err(LocateError::ShortRead {
                name: entry.name.clone(),
                source: std::io::ErrorKind::UnexpectedEof.into(),
            });
        }

        let mut payload = vec![0u8; entry.payload_size as usize];

        self.source
            .read_exact_at(record.payload_offset(), &mut payload)
            .map_err(|source| LocateError::ShortRead {
                name: entry.name.clone(),
                source,
            })?;

        Ok(payload)
    }

    fn match_at(&self, offset: u64, variants: &[Vec<u8>]) -> Option<Record> {
        variants
            .iter()
            .find(|name| self.header_matches(offset, name))
            .map(|name| Record {
                offset,
                name_len: name.len() as u64,
            })
    }

    /// Scans the window around `anchor` for a verified record header.
    ///
    /// Consecutive chunks overlap by the longest variant plus the length
    /// field, so a header crossing a chunk boundary is seen whole in the
    /// later chunk.
    fn scan(&self, anchor: u64, variants: &[Vec<u8>], window: &ResyncWindow) -> Option<Record> {
        let start = anchor.saturating_sub(window.back);
        let end = anchor.saturating_add(window.forward).min(self.source.len());

        if start >= end {
            return None;
        }

        let chunk = window.chunk.max(MIN_RESYNC_CHUNK);
        let overlap = variants.iter().map(Vec::len).max().unwrap_or(0) as u64 + NAME_LEN_SIZE;
        let mut buf = Vec::new();
        let mut pos = start;

        tracing::debug!(anchor, start, end, "scanning for payload header");

        while pos < end {
            let want = chunk.min(end - pos);

            buf.resize(want as usize, 0);

            let read = match self.source.read_at(pos, &mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(pos, error = %e, "resync read failed");
                    return None;
                }
            };

            if let Some(record) = self.scan_chunk(pos, &buf[..read], variants) {
                return Some(record);
            }

            let read = read as u64;

            if read <= overlap {
                break;
            }

            pos += read - overlap;
        }

        None
    }

    /// Returns the earliest verified header whose name occurs in `chunk`.
    fn scan_chunk(&self, pos: u64, chunk: &[u8], variants: &[Vec<u8>]) -> Option<Record> {
        let mut best: Option<Record> = None;

        for name in variants.iter().filter(|v| !v.is_empty()) {
            let hit = find_all(chunk, name)
                .filter(|&at| at >= NAME_LEN_SIZE as usize)
                .map(|at| pos + at as u64 - NAME_LEN_SIZE)
                .find(|&offset| self.header_matches(offset, name));

            let Some(offset) = hit else {
                continue;
            };

            if best.is_none_or(|b| offset < b.offset) {
                best = Some(Record {
                    offset,
                    name_len: name.len() as u64,
                });
            }
        }

        best
    }
}

/// Yields the start of every occurrence of `needle` in `haystack`.
fn find_all<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(move |(_, w)| *w == needle)
        .map(|(at, _)| at)
}
