use anyhow::Result;
use derive_more::Constructor;
use types::phase0::containers::IndexedAttestation;

use crate::{
    indexed_attestations::IndexedAttestations,
    status::{AttesterSlashingReason, ExplainedAttesterSlashing},
};

#[derive(Constructor)]
pub struct DoubleVoteDetector<'index> {
    indexed_attestations: &'index IndexedAttestations,
}

impl DoubleVoteDetector<'_> {
    /// Finds attestations for the same target epoch that share an attester with `attestation` but
    /// vote for different data.
    ///
    /// Every conflicting attestation yields its own slashing. An attestation never conflicts with
    /// itself, so `attestation` may already be indexed.
    pub fn detect_double_votes(
        &self,
        attestation: &IndexedAttestation,
    ) -> Result<Vec<ExplainedAttesterSlashing>> {
        let slashings = self
            .indexed_attestations
            .attestations_for_epoch(attestation.data.target.epoch)?
            .into_iter()
            .filter(|existing| {
                AttesterSlashingReason::between(existing, attestation)
                    == Some(AttesterSlashingReason::DoubleVote)
            })
            .map(|existing| {
                ExplainedAttesterSlashing::new(
                    existing,
                    attestation.clone(),
                    AttesterSlashingReason::DoubleVote,
                )
            })
            .collect();

        Ok(slashings)
    }
}
