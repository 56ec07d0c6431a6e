//! ISO-8859-1 conversions.
//!
//! Manifests predate UTF-8, so every byte is read as one character and names
//! are written back one byte per character.

/// Decodes ISO-8859-1 bytes. Never fails.
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Encodes a string as ISO-8859-1, replacing unrepresentable characters
/// with `?`.
#[must_use]
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
