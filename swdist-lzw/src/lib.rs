//! A decoder for the legacy adaptive LZW stream format (`.Z` files).
//!
//! The format is the one written by the classic `compress` utility: a
//! three-byte header followed by variable width codes (9 to 16 bits). In
//! block mode, code 256 clears the dictionary.
//!
//! Decoding is a pure in-memory transform with memory bounded by the
//! dictionary size chosen in the header.
//!
//! # Example
//!
//! ```no_run
//! let compressed = std::fs::read("hello.Z").unwrap();
//!
//! if swdist_lzw::is_compressed(&compressed) {
//!     let data = swdist_lzw::decompress(&compressed).unwrap();
//!     std::fs::write("hello", data).unwrap();
//! }
//! ```

use self::reader::{CodeReader, CodeWidth};
use snafu::{Snafu, ensure};

mod reader;

/// Magic bytes at the start of every stream.
pub const MAGIC: [u8; 2] = [0x1F, 0x9D];

/// Code that resets the dictionary in block mode.
pub const CLEAR_CODE: u32 = 256;

/// First free dictionary slot in block mode (256 is reserved for clear).
const FIRST_CODE: u32 = 257;

const HEADER_LEN: usize = 3;
const BLOCK_MODE_FLAG: u8 = 0x80;
const MAX_BITS_MASK: u8 = 0x1F;

/// Errors when decoding a stream.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[snafu(display("not a .Z stream"))]
    NotCompressed,

    #[snafu(display("unsupported maximum code width: {max_bits} bits"))]
    UnsupportedMaxBits { max_bits: u32 },

    #[snafu(display("corrupt stream: first code {code} is not a literal"))]
    InvalidFirstCode { code: u32 },

    #[snafu(display("corrupt stream: code {code} is beyond the next free entry {free_ent}"))]
    InvalidCode { code: u32, free_ent: u32 },

    #[snafu(display("corrupt stream: code chain is too deep"))]
    StackOverflow,
}

/// The three-byte stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Maximum code width, 9 to 16.
    pub max_bits: u32,
    /// Whether [`CLEAR_CODE`] resets the dictionary.
    pub block_mode: bool,
}

impl Header {
    /// Parses and validates the header at the start of `data`.
    pub fn read(data: &[u8]) -> Result<Self, DecodeError> {
        ensure!(is_compressed(data), NotCompressedSnafu);

        let flags = data[2];
        let max_bits = u32::from(flags & MAX_BITS_MASK);

        ensure!(
            (9..=16).contains(&max_bits),
            UnsupportedMaxBitsSnafu { max_bits }
        );

        Ok(Self {
            max_bits,
            block_mode: flags & BLOCK_MODE_FLAG != 0,
        })
    }
}

/// Returns `true` if `data` starts with the `.Z` magic and has room for
/// the flags byte.
#[must_use]
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN && data[..2] == MAGIC
}

/// Decodes a complete `.Z` stream.
///
/// Either the whole stream decodes or an error is returned; no partial
/// output is produced.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let header = Header::read(input)?;
    let max_max_code = 1u32 << header.max_bits;
    let table_len = max_max_code as usize;
    let first_free = if header.block_mode {
        FIRST_CODE
    } else {
        CLEAR_CODE
    };

    let mut prefix = vec![0u16; table_len];
    let mut suffix = vec![0u8; table_len];
    let mut stack: Vec<u8> = Vec::with_capacity(table_len);

    for (code, byte) in suffix.iter_mut().take(256).enumerate() {
        *byte = code as u8;
    }

    let mut reader = CodeReader::new(&input[HEADER_LEN..]);
    let mut width = CodeWidth::new(header.max_bits);
    let mut free_ent = first_free;
    let mut old_code: Option<u32> = None;
    let mut fin_char = 0u8;
    let mut output = Vec::with_capacity(input.len() * 3);

    while let Some(code) = reader.next_code(&mut width, free_ent) {
        if header.block_mode && code == CLEAR_CODE {
            reader.clear = true;
            free_ent = FIRST_CODE;
            old_code = None;
            continue;
        }

        let Some(prev) = old_code else {
            ensure!(code < 256, InvalidFirstCodeSnafu { code });

            fin_char = code as u8;
            output.push(fin_char);
            old_code = Some(code);
            continue;
        };

        let in_code = code;
        let mut code = code;

        stack.clear();

        if code >= free_ent {
            ensure!(code == free_ent, InvalidCodeSnafu { code, free_ent });

            // Code being defined by this very step: previous string plus
            // its own first byte.
            stack.push(fin_char);
            code = prev;
        }

        while code >= 256 {
            ensure!(code < free_ent, InvalidCodeSnafu { code, free_ent });
            ensure!(stack.len() < table_len, StackOverflowSnafu);

            stack.push(suffix[code as usize]);
            code = u32::from(prefix[code as usize]);
        }

        ensure!(stack.len() < table_len, StackOverflowSnafu);

        fin_char = code as u8;
        stack.push(fin_char);
        output.extend(stack.iter().rev());

        if free_ent < max_max_code {
            prefix[free_ent as usize] = prev as u16;
            suffix[free_ent as usize] = fin_char;
            free_ent += 1;
        }

        old_code = Some(in_code);
    }

    Ok(output)
}
