/// Bytes in one mebibyte.
const MIB: u64 = 1024 * 1024;

/// Settings for one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Stop after writing the raw `.Z` payload.
    pub no_decompress: bool,
    /// Keep the `.Z` payload next to the decoded file.
    pub keep_z: bool,
    /// Carry on with the next entry after a failure.
    pub continue_on_error: bool,
    /// How far before the expected offset a resync scan starts.
    pub resync_back: u64,
    /// How far past the expected offset a resync scan reaches.
    pub resync_forward: u64,
    /// Read size of a resync scan. Clamped to at least
    /// [`MIN_RESYNC_CHUNK`](crate::locate::MIN_RESYNC_CHUNK).
    pub resync_chunk: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            no_decompress: false,
            keep_z: false,
            continue_on_error: true,
            resync_back: MIB,
            resync_forward: 16 * MIB,
            resync_chunk: MIB,
        }
    }
}
