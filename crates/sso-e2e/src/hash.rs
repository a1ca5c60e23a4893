//! Identity keys for the Users service.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
pub const HASH_LEN: usize = 10;

/// Short SHA-256 hex digest used as a user's id in the Users service.
///
/// The Users service keys every record by `hash(email)`, so the helpers never
/// need the service's own ids.
#[must_use]
pub fn hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    hex
}
