//! Recovery-id brute force for cloud signers that return a DER/P1363 `(R,
//! S)` pair with no recovery id attached (`spec.md` §4.2: "for `i ∈
//! {0,1,2,3}` attempt recovery and compare to the known public key").

use crate::Error;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};

/// Canonicalises `sig` to low-S, then finds the `RecoveryId` in `0..=3`
/// that recovers `expected_key` from `digest`. Fails `Internal` (mapped by
/// the caller) if none match.
pub fn find_recovery_id(
    sig: K256Signature,
    digest: &[u8; 32],
    expected_key: &VerifyingKey,
) -> Result<(K256Signature, RecoveryId), Error> {
    let sig = sig.normalize_s().unwrap_or(sig);

    for id in 0..4u8 {
        let Ok(recid) = RecoveryId::from_byte(id).ok_or(()) else {
            continue;
        };
        if let Ok(recovered) = VerifyingKey::recover_from_prehash(digest, &sig, recid) {
            if &recovered == expected_key {
                return Ok((sig, recid));
            }
        }
    }

    Err(Error::RecoveryIdNotFound)
}

/// Parses a DER-encoded ECDSA signature as returned by AWS KMS / Azure Key
/// Vault into the fixed-size `(R, S)` k256 representation.
pub fn from_der(der: &[u8]) -> Result<K256Signature, Error> {
    K256Signature::from_der(der).map_err(|e| Error::SigningFailed(format!("bad DER signature: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{signature::hazmat::PrehashSigner, SigningKey};

    #[test]
    fn finds_the_matching_recovery_id() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let verifying_key = *signing_key.verifying_key();
        let digest = [5u8; 32];
        let (sig, _recid): (K256Signature, RecoveryId) =
            signing_key.sign_prehash_recoverable(&digest).unwrap();

        let (_normalized, found) = find_recovery_id(sig, &digest, &verifying_key).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(&digest, &sig.normalize_s().unwrap_or(sig), found).unwrap();
        assert_eq!(recovered, verifying_key);
    }
}
