use sha2::{Digest, Sha256};

/// Calculate the SHA-256 of an in-memory buffer as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    finalize_hex(Sha256::new_with_prefix(data))
}

/// Finish a running hasher and render the digest as lowercase hex
pub fn finalize_hex(hasher: Sha256) -> String {
    format!("{:x}", hasher.finalize())
}

/// Compare two hex digests, ignoring case
pub fn hashes_equal(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.eq_ignore_ascii_case(b)
}
