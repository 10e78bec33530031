use anyhow::{Context as _, Result};
use database::Database;
use types::phase0::{
    containers::{ProposerSlashing, SignedBeaconBlockHeader},
    primitives::{Slot, ValidatorIndex},
};

use crate::{
    error::{Error, Store},
    status::{ExplainedProposerSlashing, ProposerSlashingReason},
};

const VALIDATOR_INDEX_SIZE: usize = size_of::<ValidatorIndex>();
const SLOT_SIZE: usize = size_of::<Slot>();
const BLOCK_RECORD_KEY_LENGTH: usize = SLOT_SIZE + VALIDATOR_INDEX_SIZE;

type BlockRecordKey = [u8; BLOCK_RECORD_KEY_LENGTH];

// Slot,ValidatorIndex -> SignedBeaconBlockHeader
fn build_block_record_key(proposer_index: ValidatorIndex, slot: Slot) -> BlockRecordKey {
    let mut key = [0; BLOCK_RECORD_KEY_LENGTH];
    key[..SLOT_SIZE].copy_from_slice(&slot.to_be_bytes());
    key[SLOT_SIZE..].copy_from_slice(&proposer_index.to_be_bytes());
    key
}

pub struct Blocks {
    blocks_db: Database,
}

impl Blocks {
    #[must_use]
    pub const fn new(blocks_db: Database) -> Self {
        Self { blocks_db }
    }

    /// Compares `header` with the first header seen from the same proposer for the same slot.
    pub fn find_slashing(
        &self,
        header: &SignedBeaconBlockHeader,
    ) -> Result<Option<ExplainedProposerSlashing>> {
        let proposer_index = header.message.proposer_index;
        let slot = header.message.slot;

        let Some(existing) = self.find_block_record(proposer_index, slot)? else {
            return Ok(None);
        };

        if existing == *header {
            return Ok(None);
        }

        Ok(Some(ExplainedProposerSlashing {
            slashing: ProposerSlashing {
                signed_header_1: existing,
                signed_header_2: *header,
            },
            reason: ProposerSlashingReason::DoubleProposal,
        }))
    }

    /// Records `header` unless a header for the same proposer and slot is already stored.
    pub fn update(&self, header: &SignedBeaconBlockHeader) -> Result<()> {
        let key = build_block_record_key(header.message.proposer_index, header.message.slot);

        let exists = self.blocks_db.contains_key(key).context(Error::StoreUnavailable {
            store: Store::Blocks,
        })?;

        if exists {
            return Ok(());
        }

        self.blocks_db
            .put(key, bincode::serialize(header)?)
            .context(Error::StoreUnavailable {
                store: Store::Blocks,
            })
    }

    fn find_block_record(
        &self,
        proposer_index: ValidatorIndex,
        slot: Slot,
    ) -> Result<Option<SignedBeaconBlockHeader>> {
        let key = build_block_record_key(proposer_index, slot);

        let bytes = self.blocks_db.get(key).context(Error::StoreUnavailable {
            store: Store::Blocks,
        })?;

        if let Some(bytes) = bytes {
            return Ok(Some(bincode::deserialize(&bytes)?));
        }

        Ok(None)
    }
}
