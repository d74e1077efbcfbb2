//! C3: Metadata Stripper.
//!
//! Solidity appends one of two trailing metadata structures to runtime
//! bytecode. `strip` locates the last occurrence of either marker -- scanning
//! from the right, since the marker bytes can legitimately occur inside
//! runtime code as data -- and truncates there. It never validates the
//! payload itself.

/// `a165627a7a72305820` + 32-byte hash + `0029`.
const LEGACY_MARKER: &str = "a165627a7a72305820";
/// `a264697066735822` + 32-byte hash + compiler-version bytes.
const MODERN_MARKER: &str = "a264697066735822";

/// Returns the prefix of `hex` preceding the last occurrence of either
/// metadata marker. Operates on canonical (prefix-stripped, lower-case) hex;
/// callers are expected to have normalized their input already.
pub fn strip(hex: &str) -> &str {
    let legacy = hex.rfind(LEGACY_MARKER);
    let modern = hex.rfind(MODERN_MARKER);

    match (legacy, modern) {
        (None, None) => hex,
        (Some(i), None) => &hex[..i],
        (None, Some(i)) => &hex[..i],
        (Some(l), Some(m)) => &hex[..l.max(m)],
    }
}
