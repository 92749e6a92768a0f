/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// A short, filesystem-friendly key for an arbitrary string.
///
/// Returns the first `len` hex characters of the BLAKE3 digest (capped at 64).
#[must_use]
pub fn short_key(input: &str, len: usize) -> String {
    let mut hex = blake3_bytes(input.as_bytes());
    hex.truncate(len.min(64));
    hex
}
