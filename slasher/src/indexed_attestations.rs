use anyhow::{Context as _, Result};
use database::Database;
use sha2::{Digest as _, Sha256};
use types::phase0::{
    containers::IndexedAttestation,
    primitives::{Epoch, H256},
};

use crate::error::{Error, Store};

const EPOCH_SIZE: usize = size_of::<Epoch>();
const H256_SIZE: usize = size_of::<H256>();
const INDEXED_ATTESTATION_KEY_LENGTH: usize = EPOCH_SIZE + 2 * H256_SIZE;

type IndexedAttestationKey = [u8; INDEXED_ATTESTATION_KEY_LENGTH];

// Attestations with the same data but different attesters are stored separately.
//
// TargetEpoch,AttestationDataRoot,AttestingIndicesRoot -> IndexedAttestation
pub struct IndexedAttestations {
    db: Database,
}

impl IndexedAttestations {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    fn key(attestation: &IndexedAttestation) -> IndexedAttestationKey {
        let mut key = [0; INDEXED_ATTESTATION_KEY_LENGTH];
        key[..EPOCH_SIZE].copy_from_slice(&attestation.data.target.epoch.to_be_bytes());
        key[EPOCH_SIZE..EPOCH_SIZE + H256_SIZE]
            .copy_from_slice(attestation.data.hash_tree_root().as_bytes());
        key[EPOCH_SIZE + H256_SIZE..]
            .copy_from_slice(attesting_indices_root(attestation).as_bytes());
        key
    }

    /// Stores an attestation under its target epoch. Storing the same attestation again is a no-op.
    pub fn index(&self, attestation: &IndexedAttestation) -> Result<()> {
        self.db
            .put(Self::key(attestation), bincode::serialize(attestation)?)
            .context(Error::StoreUnavailable {
                store: Store::AttestationIndex,
            })
    }

    /// Returns all stored attestations whose target epoch is `target_epoch`.
    pub fn attestations_for_epoch(&self, target_epoch: Epoch) -> Result<Vec<IndexedAttestation>> {
        self.db
            .prefix_iterator(target_epoch.to_be_bytes())
            .context(Error::StoreUnavailable {
                store: Store::AttestationIndex,
            })?
            .map(|result| {
                let (_, bytes) = result.context(Error::StoreUnavailable {
                    store: Store::AttestationIndex,
                })?;

                Ok(bincode::deserialize(&bytes)?)
            })
            .collect()
    }
}

fn attesting_indices_root(attestation: &IndexedAttestation) -> H256 {
    let mut hasher = Sha256::new();

    for validator_index in &attestation.attesting_indices {
        hasher.update(validator_index.to_le_bytes());
    }

    H256::from_slice(hasher.finalize().as_slice())
}
