//! Round trips through a reference encoder that groups and pads codes the
//! way the classic `compress` utility does (groups of eight codes, padded on
//! width changes and clears). Code width never grows past `max_bits`, so
//! 9-bit streams follow the capped rule rather than `compress`, which widens
//! them to 10 bits.

use std::collections::HashMap;

const CLEAR: u32 = 256;

struct BitWriter {
    out: Vec<u8>,
    buf: Vec<u8>,
    offset: usize,
    n_bits: u32,
    max_code: u32,
    max_bits: u32,
    clear_flag: bool,
}

impl BitWriter {
    fn new(out: Vec<u8>, max_bits: u32) -> Self {
        Self {
            out,
            buf: vec![0; 9],
            offset: 0,
            n_bits: 9,
            max_code: 511,
            max_bits,
            clear_flag: false,
        }
    }

    fn output(&mut self, code: u32, free_ent: u32) {
        let n_bits = self.n_bits as usize;

        for i in 0..n_bits {
            if code >> i & 1 != 0 {
                let bit = self.offset + i;
                self.buf[bit / 8] |= 1 << (bit % 8);
            }
        }

        self.offset += n_bits;

        if self.offset == n_bits * 8 {
            self.out.extend_from_slice(&self.buf);
            self.buf.fill(0);
            self.offset = 0;
        }

        if free_ent > self.max_code || self.clear_flag {
            // The reader only notices the new width after a whole group.
            if self.offset > 0 {
                self.out.extend_from_slice(&self.buf);
            }

            self.offset = 0;

            if self.clear_flag {
                self.n_bits = 9;
                self.max_code = 511;
                self.clear_flag = false;
            } else {
                if self.n_bits < self.max_bits {
                    self.n_bits += 1;
                }

                self.max_code = if self.n_bits == self.max_bits {
                    1 << self.max_bits
                } else {
                    (1 << self.n_bits) - 1
                };
            }

            self.buf = vec![0; self.n_bits as usize];
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.offset > 0 {
            let len = self.offset.div_ceil(8);
            self.out.extend_from_slice(&self.buf[..len]);
        }

        self.out
    }
}

/// Compresses `input`. In block mode with `clear_when_full`, a clear code is
/// emitted whenever the dictionary fills up.
fn compress(input: &[u8], max_bits: u32, block_mode: bool, clear_when_full: bool) -> Vec<u8> {
    let flags = max_bits as u8 | if block_mode { 0x80 } else { 0 };
    let header = vec![0x1F, 0x9D, flags];

    let Some((&first, rest)) = input.split_first() else {
        return header;
    };

    let first_free = if block_mode { 257 } else { 256 };
    let max_max_code = 1u32 << max_bits;

    let mut writer = BitWriter::new(header, max_bits);
    let mut table: HashMap<(u32, u8), u32> = HashMap::new();
    let mut free_ent = first_free;
    let mut ent = u32::from(first);

    for &c in rest {
        if let Some(&code) = table.get(&(ent, c)) {
            ent = code;
            continue;
        }

        writer.output(ent, free_ent);

        if free_ent < max_max_code {
            table.insert((ent, c), free_ent);
            free_ent += 1;
        } else if block_mode && clear_when_full {
            table.clear();
            free_ent = first_free;
            writer.clear_flag = true;
            writer.output(CLEAR, free_ent);
        }

        ent = u32::from(c);
    }

    writer.output(ent, free_ent);
    writer.finish()
}

/// Deterministic pseudo-random bytes drawn from a small alphabet so the
/// dictionary actually finds matches.
fn noise(len: usize, alphabet: u8, mut seed: u64) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b'a' + ((seed >> 33) % u64::from(alphabet)) as u8
        })
        .collect()
}

fn assert_round_trip(input: &[u8], max_bits: u32, block_mode: bool, clear_when_full: bool) {
    let compressed = compress(input, max_bits, block_mode, clear_when_full);
    let decoded = swdist_lzw::decompress(&compressed).unwrap_or_else(|e| {
        panic!("max_bits={max_bits} block={block_mode} len={}: {e}", input.len())
    });

    assert!(
        decoded == input,
        "max_bits={max_bits} block={block_mode} len={}: output differs",
        input.len()
    );
}

#[test]
fn encoder_matches_hand_written_fixture() {
    assert_eq!(compress(b"ab", 16, true, false), [0x1F, 0x9D, 0x90, 0x61, 0xC4, 0x00]);
}

#[test]
fn empty_input() {
    assert_round_trip(b"", 16, true, false);
}

#[test]
fn text() {
    let text = b"TOBEORNOTTOBEORTOBEORNOT#TOBEORNOTTOBEORTOBEORNOT#".repeat(40);

    for max_bits in [9, 12, 16] {
        assert_round_trip(&text, max_bits, true, false);
        assert_round_trip(&text, max_bits, false, false);
    }
}

#[test]
fn repeated_byte_exercises_self_reference() {
    assert_round_trip(&[b'x'; 10_000], 16, true, false);
}

#[test]
fn every_width_transition() {
    // Enough distinct strings to grow the table through all widths.
    let data = noise(400_000, 16, 7);

    assert_round_trip(&data, 16, true, false);
}

#[test]
fn full_table_without_clear() {
    let data = noise(100_000, 8, 11);

    for max_bits in 9..=12 {
        assert_round_trip(&data, max_bits, true, false);
        assert_round_trip(&data, max_bits, false, false);
    }
}

#[test]
fn clear_codes_in_block_mode() {
    let data = noise(60_000, 12, 3);

    for max_bits in [9, 10, 12] {
        assert_round_trip(&data, max_bits, true, true);
    }
}

#[test]
fn all_byte_values() {
    let data: Vec<u8> = (0..=255u8).cycle().take(5_000).collect();

    assert_round_trip(&data, 14, true, false);
}

#[test]
fn truncated_stream_does_not_panic() {
    let compressed = compress(&noise(5_000, 6, 1), 12, true, false);

    for len in [3, 4, 5, 17, compressed.len() / 2] {
        let _ = swdist_lzw::decompress(&compressed[..len]);
    }
}
