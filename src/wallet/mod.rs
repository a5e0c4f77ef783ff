use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Public material left on a block after its message was signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message_id: String,
    /// Hex of the compressed secp256k1 public key (33 bytes).
    pub public_key: String,
    /// Hex DER ECDSA signature over SHA-256(message).
    pub signature: String,
}

/// Ephemeral key pair, generated for exactly one block.
///
/// Signing consumes the identity, so the secret key never outlives the
/// message it signed.
pub struct Identity {
    secret: SecretKey,
    public: PublicKey,
}

impl Identity {
    /// Generate a fresh secp256k1 key pair from the OS entropy source.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self { secret, public }
    }

    /// Hex of the compressed public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.serialize())
    }

    /// Sign `message` and derive its message id.
    pub fn sign(self, message: &str) -> Result<SignedMessage, Error> {
        let public_key = self.public_key_hex();
        let signature = sign_message(message, &self.secret)?;
        let message_id = message_id(message, &public_key, &signature);
        Ok(SignedMessage {
            message_id,
            public_key,
            signature,
        })
    }
}

/// ECDSA-sign SHA-256(message); returns hex DER.
pub fn sign_message(message: &str, secret: &SecretKey) -> Result<String, Error> {
    let secp = Secp256k1::signing_only();
    let msg = Message::from_digest_slice(&sha256(message.as_bytes()))?;
    let sig = secp.sign_ecdsa(&msg, secret);
    Ok(hex::encode(sig.serialize_der().to_vec()))
}

/// Content identifier binding a message to its key and signature:
/// hex(SHA-256(SHA-256(message || public_key || signature))).
pub fn message_id(message: &str, public_key: &str, signature: &str) -> String {
    let preimage = format!("{message}{public_key}{signature}");
    let first = sha256(preimage.as_bytes());
    hex::encode(sha256(&first))
}

/// Verify a hex DER signature over `message` against a hex compressed public key.
pub fn verify(message: &str, public_key_hex: &str, signature_hex: &str) -> Result<bool, Error> {
    let secp = Secp256k1::verification_only();

    let sig = Signature::from_der(&hex::decode(signature_hex)?)?;
    let pk = PublicKey::from_slice(&hex::decode(public_key_hex)?)?;
    let msg = Message::from_digest_slice(&sha256(message.as_bytes()))?;

    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_identities_differ_and_both_verify() {
        let a = Identity::generate().sign("hello").unwrap();
        let b = Identity::generate().sign("hello").unwrap();

        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.signature, b.signature);
        assert!(verify("hello", &a.public_key, &a.signature).unwrap());
        assert!(verify("hello", &b.public_key, &b.signature).unwrap());
    }

    #[test]
    fn signature_does_not_verify_under_other_key() {
        let a = Identity::generate().sign("hello").unwrap();
        let b = Identity::generate().sign("hello").unwrap();
        assert!(!verify("hello", &b.public_key, &a.signature).unwrap());
        assert!(!verify("hell0", &a.public_key, &a.signature).unwrap());
    }

    #[test]
    fn message_id_is_hashed_twice() {
        let signed = Identity::generate().sign("payload").unwrap();
        let preimage = format!("payload{}{}", signed.public_key, signed.signature);

        let once = Sha256::digest(preimage.as_bytes());
        let twice = Sha256::digest(once);

        assert_eq!(signed.message_id, hex::encode(twice));
        assert_ne!(signed.message_id, hex::encode(once));
        assert_eq!(signed.message_id.len(), 64);
    }

    #[test]
    fn public_key_is_compressed_hex() {
        let id = Identity::generate();
        let pk = id.public_key_hex();
        assert_eq!(pk.len(), 66);
        assert!(pk.starts_with("02") || pk.starts_with("03"));
    }

    #[test]
    fn empty_message_still_signs() {
        let signed = Identity::generate().sign("").unwrap();
        assert!(verify("", &signed.public_key, &signed.signature).unwrap());
    }

    #[test]
    fn malformed_hex_is_an_error() {
        assert!(matches!(
            verify("m", "00", "zz"),
            Err(Error::Encoding(_))
        ));
    }
}
