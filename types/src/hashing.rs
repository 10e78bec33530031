use ethereum_types::H256;
use sha2::{Digest as _, Sha256};

#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let digest = Sha256::new()
        .chain_update(left)
        .chain_update(right)
        .finalize();

    H256::from_slice(digest.as_slice())
}

#[must_use]
pub fn uint_chunk(value: u64) -> H256 {
    let mut chunk = H256::zero();
    chunk[..size_of::<u64>()].copy_from_slice(&value.to_le_bytes());
    chunk
}

// Merkleizes a fixed number of 32 byte chunks, padding with zero chunks to the next power of 2.
#[must_use]
pub fn merkleize(chunks: &[H256]) -> H256 {
    let width = chunks.len().next_power_of_two();
    let mut layer = chunks.to_vec();

    layer.resize(width, H256::zero());

    while layer.len() > 1 {
        layer = layer
            .chunks_exact(2)
            .map(|pair| hash_256_256(pair[0], pair[1]))
            .collect();
    }

    layer.first().copied().unwrap_or_default()
}
