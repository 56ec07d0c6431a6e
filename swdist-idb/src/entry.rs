use crate::latin1;

/// The kind of filesystem object a manifest line describes.
///
/// The manifest stores this as a single character tag. Unknown tags are kept
/// verbatim in [`EntryType::Other`] so the caller can still display them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file (`f`), backed by a payload in a subproduct file.
    File,
    /// Directory (`d`).
    Directory,
    /// Symbolic link (`l`), target taken from the `symval` attribute.
    Symlink,
    /// Any other tag.
    Other(char),
}

impl EntryType {
    /// Converts a manifest type tag into an [`EntryType`].
    #[must_use]
    pub const fn from_tag(tag: char) -> Self {
        match tag {
            'f' => Self::File,
            'd' => Self::Directory,
            'l' => Self::Symlink,
            other => Self::Other(other),
        }
    }

    /// Returns the manifest tag for this type.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            Self::File => 'f',
            Self::Directory => 'd',
            Self::Symlink => 'l',
            Self::Other(c) => c,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One parsed manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub entry_type: EntryType,
    /// Permission bits, parsed from the octal mode field.
    pub mode: u32,
    pub owner: String,
    pub group: String,
    /// Manifest-relative path. Must be sanitized before touching a filesystem.
    pub name: String,
    /// Path of the file on the build host. Informational only.
    pub source_path: String,
    /// Raw subgroup token, e.g. `prod.sw.base`.
    pub subgroup: String,
    /// First two segments of [`subgroup`](Self::subgroup); names the
    /// subproduct file on disk.
    pub subproduct_base: String,
    /// The tail of the line with the subgroup token removed.
    pub raw_attributes: String,
    pub machine_expr: Option<String>,
    pub symlink_target: Option<String>,
    pub declared_size: u64,
    pub compressed_size: u64,
    /// Number of payload bytes stored in the subproduct file. Zero for
    /// anything that is not a file.
    pub payload_size: u64,
    /// Expected position of this entry's record header inside its subproduct
    /// file. Only files have one.
    pub payload_offset: Option<u64>,
}

impl FileEntry {
    /// Returns `true` if this entry is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    /// Returns `true` if this entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Returns `true` if this entry is a symbolic link.
    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.entry_type == EntryType::Symlink
    }

    /// Returns the name as stored in the subproduct record headers.
    #[must_use]
    pub fn name_bytes(&self) -> Vec<u8> {
        latin1::encode(&self.name)
    }

    /// Returns the record header names this entry may have been archived
    /// under, in lookup order and without duplicates.
    ///
    /// Archives are inconsistent about leading `./` and `/`, so the bare name
    /// is tried first, then `./name`, then `/name`.
    #[must_use]
    pub fn name_variants(&self) -> Vec<Vec<u8>> {
        let bare = self.name_bytes();
        let candidates = [
            bare.clone(),
            [b"./".as_slice(), bare.as_slice()].concat(),
            [b"/".as_slice(), bare.as_slice()].concat(),
        ];

        let mut variants: Vec<Vec<u8>> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if !variants.contains(&candidate) {
                variants.push(candidate);
            }
        }

        variants
    }
}
