//! Content identifiers for delegations and derived entities.

use ipld_core::cid::{Cid, multihash::Multihash};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::AccessError;

/// [Multicodec code for DAG-CBOR](https://github.com/multiformats/multicodec/blob/master/table.csv)
const DAG_CBOR_CODE: u64 = 0x71;
/// Multihash code for SHA2-256
const SHA2_256_CODE: u64 = 0x12;
/// Multihash code for BLAKE3
const BLAKE3_CODE: u64 = 0x1e;

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, AccessError> {
    serde_ipld_dagcbor::to_vec(value).map_err(|error| AccessError::Encode(error.to_string()))
}

fn wrap(code: u64, digest: &[u8]) -> Result<Cid, AccessError> {
    let hash = Multihash::<64>::wrap(code, digest)
        .map_err(|error| AccessError::Encode(error.to_string()))?;
    Ok(Cid::new_v1(DAG_CBOR_CODE, hash))
}

/// CIDv1 of the DAG-CBOR encoding of `value`, hashed with SHA2-256.
///
/// This is how delegations are addressed.
pub fn to_dagcbor_cid<T: Serialize + ?Sized>(value: &T) -> Result<Cid, AccessError> {
    let bytes = encode(value)?;
    wrap(SHA2_256_CODE, &Sha256::digest(&bytes))
}

/// CIDv1 of the DAG-CBOR encoding of `value`, hashed with BLAKE3.
///
/// Used for synthetic entities (capabilities) that only exist inside the
/// fact index, so identical structures share one entity.
pub fn to_entity_cid<T: Serialize + ?Sized>(value: &T) -> Result<Cid, AccessError> {
    let bytes = encode(value)?;
    wrap(BLAKE3_CODE, blake3::hash(&bytes).as_bytes())
}
