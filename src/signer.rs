use crate::address::Address;
use crate::error::BuilderError;
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};

pub use ed25519_dalek::Signature;

/// A principal able to produce signatures for its own address
///
/// Key material never crosses this boundary: the builder hands a message in
/// and gets a signature back. The system signer and the user signer are
/// distinct implementations of this trait with no shared secret.
pub trait TransactionSigner {
    /// The address this signer produces signatures for
    fn address(&self) -> Address;

    /// Sign a message
    ///
    /// # Parameters
    /// * `message` - The canonical message bytes to sign
    ///
    /// # Returns
    /// The signature, or an error if the signing backend failed
    fn try_sign(&self, message: &[u8]) -> Result<Signature, BuilderError>;
}

/// An in-process ed25519 keypair
///
/// Constructed from injected secret bytes; the crate never embeds key
/// material as literals.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Create a keypair from a 32-byte secret seed
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Create a keypair from 64 bytes: the secret seed followed by the
    /// public key, the layout wallet exports use
    pub fn from_keypair_bytes(bytes: &[u8; 64]) -> Result<Self, BuilderError> {
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|err| BuilderError::Signing(err.to_string()))?;
        Ok(Self { signing_key })
    }

    /// The public half of the keypair
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl TransactionSigner for Keypair {
    fn address(&self) -> Address {
        Address::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    fn try_sign(&self, message: &[u8]) -> Result<Signature, BuilderError> {
        self.signing_key
            .try_sign(message)
            .map_err(|err| BuilderError::Signing(err.to_string()))
    }
}

/// Verify a signature over `message` for the given address
///
/// Wallet addresses are ed25519 public keys, so verification needs nothing
/// beyond the address itself.
pub fn verify_signature(
    address: &Address,
    message: &[u8],
    signature: &Signature,
) -> Result<(), BuilderError> {
    let verifying_key = VerifyingKey::from_bytes(address.as_array())
        .map_err(|err| BuilderError::Signing(format!("{} is not a signing address: {}", address, err)))?;

    verifying_key
        .verify_strict(message, signature)
        .map_err(|err| BuilderError::Signing(format!("signature for {} is invalid: {}", address, err)))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// A deterministic keypair for tests
    pub fn keypair(tag: u8) -> Keypair {
        Keypair::from_secret_bytes(&[tag; 32])
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = keypair(1);
        let message = b"canonical message bytes";

        let signature = signer.try_sign(message).unwrap();
        verify_signature(&signer.address(), message, &signature).unwrap();
    }

    #[test]
    fn test_verify_rejects_tampered_message() {
        let signer = keypair(1);

        let signature = signer.try_sign(b"original").unwrap();
        let result = verify_signature(&signer.address(), b"tampered", &signature);
        assert!(matches!(result, Err(BuilderError::Signing(_))));
    }

    #[test]
    fn test_address_is_stable() {
        let first = keypair(2).address();
        let second = keypair(2).address();
        assert_eq!(first, second);
        assert_ne!(first, keypair(3).address());
    }

    #[test]
    fn test_keypair_bytes_round_trip() {
        let signer = keypair(4);
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&signer.signing_key.to_bytes());
        bytes[32..].copy_from_slice(&signer.verifying_key().to_bytes());

        let restored = Keypair::from_keypair_bytes(&bytes).unwrap();
        assert_eq!(restored.address(), signer.address());
    }
}
