mod address;
mod hash;
mod signature;

pub use address::{Address, AddressError, AddressKind};
pub use hash::{hash, Hash, Hashable, HASH_SIZE};
pub use signature::{Signature, SIGNATURE_SIZE};

use std::fmt::Debug;

// Hashing and signature verification are injected capabilities: the core
// never assumes a concrete algorithm, and tests substitute deterministic
// implementations.

pub trait Hasher: Send + Sync + Debug {
    fn hash(&self, bytes: &[u8]) -> Hash;
}

pub trait SignatureVerifier: Send + Sync + Debug {
    fn verify(&self, message: &[u8], signature: &Signature, owner: &Address) -> bool;
}

// Production hasher backed by blake3
#[derive(Debug, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn hash(&self, bytes: &[u8]) -> Hash {
        hash(bytes)
    }
}

// Production verifier: the signature must bind the message to the owner
// address. The first half carries the binding digest, the second half is
// free material from the signing side.
#[derive(Debug, Default)]
pub struct RecoveredOwnerVerifier;

impl RecoveredOwnerVerifier {
    fn binding_digest(message: &[u8], owner: &Address) -> Hash {
        let mut data = Vec::with_capacity(message.len() + owner.as_str().len());
        data.extend_from_slice(owner.as_str().as_bytes());
        data.extend_from_slice(message);
        hash(&data)
    }

    // Produce a signature the verifier accepts for (message, owner)
    pub fn sign(message: &[u8], owner: &Address) -> Signature {
        let digest = Self::binding_digest(message, owner);
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[..HASH_SIZE].copy_from_slice(digest.as_bytes());
        bytes[HASH_SIZE..].copy_from_slice(digest.as_bytes());
        Signature::new(bytes)
    }
}

impl SignatureVerifier for RecoveredOwnerVerifier {
    fn verify(&self, message: &[u8], signature: &Signature, owner: &Address) -> bool {
        if !signature.is_well_formed() {
            return false;
        }

        let digest = Self::binding_digest(message, owner);
        signature.as_bytes()[..HASH_SIZE] == *digest.as_bytes()
    }
}

// Deterministic verifier for tests: accepts or rejects everything
#[derive(Debug)]
pub struct StaticVerifier {
    accept: bool,
}

impl StaticVerifier {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl SignatureVerifier for StaticVerifier {
    fn verify(&self, _: &[u8], signature: &Signature, _: &Address) -> bool {
        self.accept && signature.is_well_formed()
    }
}
