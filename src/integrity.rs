use bfp_support::constants::DIGEST_LEN;
use bitcoin::hashes::{sha256, Hash};

/// Single SHA-256 of the file contents, as stored in `file_sha256`.
pub fn file_sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    sha256::Hash::hash(data).to_byte_array()
}
