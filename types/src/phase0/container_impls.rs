use std::collections::HashSet;

use crate::{
    hashing,
    phase0::{
        containers::{
            AttestationData, BeaconBlockHeader, Checkpoint, IndexedAttestation,
            SignedBeaconBlockHeader,
        },
        primitives::{SignatureBytes, H256},
    },
};

impl Checkpoint {
    #[must_use]
    pub fn hash_tree_root(self) -> H256 {
        hashing::merkleize(&[hashing::uint_chunk(self.epoch), self.root])
    }
}

impl AttestationData {
    /// The root identifying the vote. Two attestations with equal roots are the same vote.
    #[must_use]
    pub fn hash_tree_root(self) -> H256 {
        hashing::merkleize(&[
            hashing::uint_chunk(self.slot),
            hashing::uint_chunk(self.index),
            self.beacon_block_root,
            self.source.hash_tree_root(),
            self.target.hash_tree_root(),
        ])
    }
}

impl BeaconBlockHeader {
    #[must_use]
    pub fn hash_tree_root(self) -> H256 {
        hashing::merkleize(&[
            hashing::uint_chunk(self.slot),
            hashing::uint_chunk(self.proposer_index),
            self.parent_root,
            self.state_root,
            self.body_root,
        ])
    }

    #[inline]
    #[must_use]
    pub const fn with_signature(self, signature: SignatureBytes) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: self,
            signature,
        }
    }
}

impl IndexedAttestation {
    /// Checks whether `self` surrounds `other`.
    ///
    /// ```text
    /// s: source
    /// t: target
    ///
    /// a surrounds b if: s_a < s_b and t_b < t_a
    /// ```
    #[must_use]
    pub fn surrounds(&self, other: &Self) -> bool {
        self.data.source.epoch < other.data.source.epoch
            && other.data.target.epoch < self.data.target.epoch
    }

    /// Checks whether the attesting indices of `self` and `other` have at least one validator in
    /// common. The order of the indices does not matter.
    #[must_use]
    pub fn shares_attester_with(&self, other: &Self) -> bool {
        let other_indices = other.attesting_indices.iter().collect::<HashSet<_>>();

        self.attesting_indices
            .iter()
            .any(|validator_index| other_indices.contains(validator_index))
    }
}
