use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 over the inputs, independent of their order.
///
/// Every input is serialized to JSON on its own, the serialized strings are
/// sorted and joined with a single space before hashing.
pub fn digest_bytes(inputs: &[Value]) -> [u8; 32] {
    let parts = inputs.iter().map(Value::to_string).collect();
    digest_serialized(parts)
}

/// Hex form of [`digest_bytes`]; this is the canonical digest string.
pub fn crypto_hash(inputs: &[Value]) -> String {
    hex::encode(digest_bytes(inputs))
}

/// Hashes inputs that were already serialized with `serde_json`.
pub(crate) fn digest_serialized(mut parts: Vec<String>) -> [u8; 32] {
    parts.sort();
    let mut hasher = Sha256::new();
    hasher.update(parts.join(" ").as_bytes());
    hasher.finalize().into()
}

/// True when the binary form of `hash_hex` starts with at least
/// `difficulty` zero bits.
pub fn hash_meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    let Ok(bytes) = hex::decode(hash_hex) else {
        return false;
    };

    let mut zeros = 0u32;
    for byte in bytes {
        if byte == 0 {
            zeros += 8;
            continue;
        }
        zeros += byte.leading_zeros();
        break;
    }
    zeros >= difficulty
}
