/// Code width that every stream starts with, and returns to after a clear.
pub(crate) const INIT_BITS: u32 = 9;

/// Current code width and the largest code representable before it grows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CodeWidth {
    pub n_bits: u32,
    pub max_code: u32,
    max_bits: u32,
    max_max_code: u32,
}

impl CodeWidth {
    pub fn new(max_bits: u32) -> Self {
        Self {
            n_bits: INIT_BITS,
            max_code: (1 << INIT_BITS) - 1,
            max_bits,
            max_max_code: 1 << max_bits,
        }
    }

    /// Widens codes by one bit, never past `max_bits`. For 9-bit streams
    /// this departs from `compress`, which goes on to 10-bit codes.
    fn grow(&mut self) {
        if self.n_bits < self.max_bits {
            self.n_bits += 1;
        }

        self.max_code = if self.n_bits == self.max_bits {
            self.max_max_code
        } else {
            (1 << self.n_bits) - 1
        };
    }

    fn reset(&mut self) {
        self.n_bits = INIT_BITS;
        self.max_code = (1 << INIT_BITS) - 1;
    }
}

/// Reads variable width codes the way `compress` wrote them.
///
/// The writer emits codes in groups of eight, i.e. `n_bits` bytes at a time,
/// and pads the current group when the width changes or the table is
/// cleared. The reader mirrors that: it loads `n_bits` bytes per chunk and
/// throws away the rest of a chunk whenever the width changes, so a width
/// change lands on a chunk boundary rather than the next bit.
pub(crate) struct CodeReader<'a> {
    data: &'a [u8],
    pos: usize,
    chunk: &'a [u8],
    /// Bit offset of the next code inside `chunk`.
    offset: usize,
    /// Codes may start at any bit offset below this.
    size: usize,
    /// Set after a clear code; the next read resets the width.
    pub clear: bool,
}

impl<'a> CodeReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            chunk: &[],
            offset: 0,
            size: 0,
            clear: false,
        }
    }

    /// Returns the next code, or `None` at the end of the stream.
    ///
    /// `free_ent` is the next unassigned dictionary slot; when it no longer
    /// fits in the current width, the width grows before reading.
    pub fn next_code(&mut self, width: &mut CodeWidth, free_ent: u32) -> Option<u32> {
        if self.clear || self.offset >= self.size || free_ent > width.max_code {
            if free_ent > width.max_code {
                width.grow();
            }

            if self.clear {
                width.reset();
                self.clear = false;
            }

            self.refill(width.n_bits as usize)?;
        }

        let n_bits = width.n_bits as usize;
        let start = self.offset >> 3;

        // A code spans at most three bytes (16 bits + 7 bit shift).
        let mut word = 0u32;

        for (i, &byte) in self.chunk.iter().skip(start).take(3).enumerate() {
            word |= u32::from(byte) << (8 * i);
        }

        let code = (word >> (self.offset & 7)) & ((1 << n_bits) - 1);

        self.offset += n_bits;

        Some(code)
    }

    fn refill(&mut self, n_bits: usize) -> Option<()> {
        let remain = self.data.len() - self.pos;

        if remain == 0 {
            return None;
        }

        let len = n_bits.min(remain);

        self.chunk = &self.data[self.pos..self.pos + len];
        self.pos += len;
        self.offset = 0;
        // Last bit offset where a whole code still fits, plus one.
        self.size = (len * 8 + 1).saturating_sub(n_bits);

        if self.size == 0 { None } else { Some(()) }
    }
}
