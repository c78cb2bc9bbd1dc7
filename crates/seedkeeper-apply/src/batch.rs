//! Splits hash sets into client-RPC-sized batches (batch size, default
//! 150, configured by the caller rather than hardcoded here).

/// Split `hashes` into chunks of at most `size` entries.
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn batches(hashes: &[String], size: usize) -> Vec<&[String]> {
    assert!(size > 0, "batch size must be positive");
    hashes.chunks(size).collect()
}
