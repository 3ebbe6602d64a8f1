use sha2::{Digest, Sha256};

use crate::schema::Schema;

/// Short display digest of a normalized schema: the first 16 hex characters
/// of the SHA-256 of its JSON serialization.
pub fn config_hash(schema: &Schema) -> String {
    let payload = serde_json::to_vec(schema).unwrap_or_default();
    let digest = Sha256::digest(&payload);
    hex::encode(&digest[..8])
}
