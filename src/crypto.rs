//! Cryptographic primitives for ForgeChain

use crate::blockchain::Sha256Hash;
use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// An address is the SHA-256 hash of a compressed public key.
pub type Address = [u8; 32];

/// Derives the address owning outputs spendable by `public_key`.
pub fn address_of(public_key: &[u8]) -> Address {
    Sha256::digest(public_key).into()
}

/// Hashes an arbitrary label into an address. Handy for tests and tooling.
pub fn address_from_string(s: &str) -> Address {
    Sha256::digest(s.as_bytes()).into()
}

/// Convert a hex string to an address.
pub fn address_from_hex(hex_str: &str) -> Result<Address, ChainError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ChainError::Crypto(format!("Invalid hex address: {}", e)))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        ChainError::Crypto(format!("Address must be 32 bytes, got {}", bytes.len()))
    })
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::Crypto(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::Crypto(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn address(&self) -> Address {
        address_of(&self.public_key_bytes())
    }

    /// Returns the public key in compressed form.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs a 32-byte message hash and returns the compact signature.
    pub fn sign_hash(&self, hash: &Sha256Hash) -> [u8; COMPACT_SIGNATURE_SIZE] {
        let message = Message::from_digest(*hash);
        SECP256K1_CONTEXT
            .sign_ecdsa(&message, &self.secret_key)
            .serialize_compact()
    }
}

/// Verifies a compact ECDSA signature over a 32-byte message hash.
pub fn verify_signature(
    public_key_bytes: &[u8],
    hash: &Sha256Hash,
    signature_bytes: &[u8],
) -> Result<(), ChainError> {
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(ChainError::Crypto(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::Crypto(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| ChainError::Crypto(format!("Invalid public key: {}", e)))?;
    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| ChainError::Crypto(format!("Invalid signature: {}", e)))?;
    let message = Message::from_digest(*hash);

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ChainError::Crypto("Signature verification failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let keypair = KeyPair::generate();
        assert_eq!(keypair.public_key_bytes().len(), PUBLIC_KEY_SIZE);
        assert_eq!(keypair.secret_key.as_ref().len(), SECRET_KEY_SIZE);
    }

    #[test]
    fn test_address_is_hash_of_public_key() {
        let keypair = KeyPair::generate();
        let expected: Address = Sha256::digest(keypair.public_key_bytes()).into();
        assert_eq!(keypair.address(), expected);
        assert_eq!(hex::encode(keypair.address()).len(), 64);
    }

    #[test]
    fn test_signing_and_verification() {
        let keypair = KeyPair::generate();
        let hash: Sha256Hash = Sha256::digest(b"Hello, ForgeChain!").into();

        let signature = keypair.sign_hash(&hash);
        assert!(verify_signature(&keypair.public_key_bytes(), &hash, &signature).is_ok());
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = KeyPair::generate();
        let keypair2 = KeyPair::generate();
        let hash: Sha256Hash = Sha256::digest(b"Test message").into();

        let signature = keypair1.sign_hash(&hash);
        let result = verify_signature(&keypair2.public_key_bytes(), &hash, &signature);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Cryptographic error: Signature verification failed"
        );
    }

    #[test]
    fn test_invalid_key_or_sig_length_check() {
        let keypair = KeyPair::generate();
        let hash = [7u8; 32];
        let signature = keypair.sign_hash(&hash);
        let pubkey_bytes = keypair.public_key_bytes();

        let result = verify_signature(&pubkey_bytes[1..], &hash, &signature);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Public key must be exactly"));

        let result = verify_signature(&pubkey_bytes, &hash, &signature[1..]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Signature must be exactly"));
    }

    #[test]
    fn test_address_from_hex() {
        let addr = address_from_string("alice");
        assert_eq!(address_from_hex(&hex::encode(addr)).unwrap(), addr);
        assert!(address_from_hex("abcd").is_err());
        assert!(address_from_hex("zz").is_err());
    }
}
