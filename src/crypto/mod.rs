pub mod hash;
pub mod signature;

pub use hash::{crypto_hash, hash_meets_difficulty};
pub use signature::{KeyPair, generate_keypair_hex, verify_signature};
