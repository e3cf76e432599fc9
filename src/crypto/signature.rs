use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use serde_json::Value;

use super::hash::digest_bytes;

/// A secp256k1 keypair. The hex of the compressed public key is the address.
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self { secret, public }
    }

    /// Hex of the compressed (33 byte) public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.serialize())
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret.secret_bytes())
    }

    /// Signs a 32-byte digest, returning the hex-encoded DER signature.
    pub fn sign_digest(&self, digest: [u8; 32]) -> String {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest(digest);
        let sig = secp.sign_ecdsa(&msg, &self.secret);
        hex::encode(sig.serialize_der().to_vec())
    }

    /// Hashes `data` with the canonical hasher, then signs the digest.
    pub fn sign(&self, data: &Value) -> String {
        self.sign_digest(digest_bytes(std::slice::from_ref(data)))
    }
}

/// Generate a new keypair and return (priv_hex, pub_hex_compressed, address_hex).
pub fn generate_keypair_hex() -> (String, String, String) {
    let keypair = KeyPair::generate();
    let pk_hex = keypair.public_key_hex();
    (keypair.secret_key_hex(), pk_hex.clone(), pk_hex)
}

/// Verifies that `sig_hex` is `public_key_hex`'s signature over the digest of
/// `data`. Malformed keys or signatures simply fail verification.
pub fn verify_signature(public_key_hex: &str, data: &Value, sig_hex: &str) -> bool {
    let secp = Secp256k1::verification_only();

    let Some(pk) = hex::decode(public_key_hex)
        .ok()
        .and_then(|bytes| PublicKey::from_slice(&bytes).ok())
    else {
        return false;
    };
    let Some(sig) = hex::decode(sig_hex)
        .ok()
        .and_then(|bytes| Signature::from_der(&bytes).ok())
    else {
        return false;
    };

    let msg = Message::from_digest(digest_bytes(std::slice::from_ref(data)));
    secp.verify_ecdsa(&msg, &sig, &pk).is_ok()
}
