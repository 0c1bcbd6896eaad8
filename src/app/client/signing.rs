//! Request signing
//!
//! Signed requests carry extra authentication headers computed right before
//! the request is prepared. The default [`NonceSigner`] attaches a fresh
//! random nonce the backend can echo back in its signature.

use crate::constants::{headers, operations};

use super::types::Headers;

/// Applies a signing transform to the headers of a signed request
pub trait RequestSigner: Send + Sync + 'static {
    fn sign(&self, headers: &mut Headers);
}

/// Attaches a random hex nonce as `x-nonce`
#[derive(Debug, Default, Clone)]
pub struct NonceSigner;

impl NonceSigner {
    /// Generate a new random nonce, hex encoded
    pub fn generate_nonce() -> String {
        (0..operations::NONCE_BYTES)
            .map(|_| format!("{:02x}", fastrand::u8(..)))
            .collect()
    }
}

impl RequestSigner for NonceSigner {
    fn sign(&self, map: &mut Headers) {
        map.insert(headers::NONCE.to_string(), Self::generate_nonce());
    }
}
