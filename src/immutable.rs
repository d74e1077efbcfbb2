//! C4: Immutable Masker.
//!
//! Overwrites byte ranges flagged as immutable references with the sentinel
//! nibble `'X'`, preserving the string's length. A pure function: no I/O, no
//! shared state.

use crate::types::ImmutableReferences;

const SENTINEL: char = 'X';

/// Masks every immutable byte range in `hex` (expected to be canonical:
/// prefix-stripped, lower-case) with `'X'` nibbles. The output has the same
/// length as the input. References are `{start, length}` in bytes; a
/// reference entirely past the end of `hex` is ignored, and one that
/// overflows is clamped to the end.
pub fn mask(hex: &str, references: &ImmutableReferences) -> String {
    let mut chars: Vec<char> = hex.chars().collect();
    let len = chars.len();

    for refs in references.values() {
        for r in refs {
            let start_idx = 2 * r.start;
            if start_idx >= len {
                continue;
            }
            let end_idx = (2 * (r.start + r.length)).min(len);
            for c in chars.iter_mut().take(end_idx).skip(start_idx) {
                *c = SENTINEL;
            }
        }
    }

    chars.into_iter().collect()
}
