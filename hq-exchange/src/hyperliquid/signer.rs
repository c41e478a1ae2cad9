//! Request signing treated as an opaque capability (spec §3 "Signer"). The engine never
//! inspects a signature's contents; it only asks for one and forwards it on the wire.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Produces a signature over an arbitrary payload. `Send + Sync` so a connector can hold
/// one behind an `Arc` and share it across concurrent requests.
pub trait Signer: Send + Sync {
    /// Sign `payload` (the canonical JSON-serialized action plus nonce, per spec §4.5) and
    /// return the hex-encoded signature to place on the wire.
    fn sign(&self, payload: &[u8]) -> String;
}

/// HMAC-SHA256 signer keyed by an API secret. Hyperliquid's real wire protocol signs with
/// an EIP-712 wallet signature; this stands in for that opaque capability using the
/// symmetric-key primitives already in the dependency stack (spec treats signing as
/// pluggable and out of scope for its own internals).
pub struct HmacSigner {
    key: Vec<u8>,
}

impl HmacSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }
}

impl Signer for HmacSigner {
    fn sign(&self, payload: &[u8]) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_payload_and_key_produce_same_signature() {
        let signer = HmacSigner::new("secret");
        assert_eq!(signer.sign(b"payload"), signer.sign(b"payload"));
    }

    #[test]
    fn different_payloads_produce_different_signatures() {
        let signer = HmacSigner::new("secret");
        assert_ne!(signer.sign(b"a"), signer.sign(b"b"));
    }
}
