use types::phase0::{
    containers::{AttesterSlashing, IndexedAttestation, ProposerSlashing},
    primitives::Epoch,
};

/// Outcome of checking one validator's attestation against its stored spans.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlashableOffense {
    None,
    DoubleVote {
        epoch: Epoch,
    },
    /// `slashable_epoch` is the target epoch of the conflicting attestation made earlier.
    SurroundVote {
        epoch: Epoch,
        slashable_epoch: Epoch,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProposerSlashingReason {
    DoubleProposal,
}

#[derive(PartialEq, Eq, Debug)]
pub struct ExplainedProposerSlashing {
    pub slashing: ProposerSlashing,
    pub reason: ProposerSlashingReason,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttesterSlashingReason {
    DoubleVote,
    Surrounding,
    Surrounded,
}

impl AttesterSlashingReason {
    /// Classifies the conflict between an attestation seen earlier and an incoming one.
    #[must_use]
    pub fn between(existing: &IndexedAttestation, incoming: &IndexedAttestation) -> Option<Self> {
        if !existing.shares_attester_with(incoming) {
            return None;
        }

        if existing.data.target.epoch == incoming.data.target.epoch {
            return (existing.data != incoming.data).then_some(Self::DoubleVote);
        }

        if incoming.surrounds(existing) {
            return Some(Self::Surrounding);
        }

        if existing.surrounds(incoming) {
            return Some(Self::Surrounded);
        }

        None
    }
}

#[derive(PartialEq, Eq, Debug)]
pub struct ExplainedAttesterSlashing {
    pub slashing: AttesterSlashing,
    pub reason: AttesterSlashingReason,
}

impl ExplainedAttesterSlashing {
    /// Builds evidence with the attestation seen earlier as `attestation_1`.
    #[must_use]
    pub fn new(
        existing: IndexedAttestation,
        incoming: IndexedAttestation,
        reason: AttesterSlashingReason,
    ) -> Self {
        Self {
            slashing: AttesterSlashing {
                attestation_1: existing,
                attestation_2: incoming,
            },
            reason,
        }
    }

    #[must_use]
    pub fn offense(&self) -> SlashableOffense {
        let AttesterSlashing {
            attestation_1,
            attestation_2,
        } = &self.slashing;

        let epoch = attestation_2.data.target.epoch;

        match self.reason {
            AttesterSlashingReason::DoubleVote => SlashableOffense::DoubleVote { epoch },
            AttesterSlashingReason::Surrounding | AttesterSlashingReason::Surrounded => {
                SlashableOffense::SurroundVote {
                    epoch,
                    slashable_epoch: attestation_1.data.target.epoch,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::phase0::{
        containers::{AttestationData, Checkpoint},
        primitives::{ValidatorIndex, H256},
    };

    use super::*;

    fn attestation(
        attesting_indices: &[ValidatorIndex],
        source: Epoch,
        target: Epoch,
        beacon_block_root: H256,
    ) -> IndexedAttestation {
        IndexedAttestation {
            attesting_indices: attesting_indices.to_vec(),
            data: AttestationData {
                beacon_block_root,
                source: Checkpoint {
                    epoch: source,
                    ..Checkpoint::default()
                },
                target: Checkpoint {
                    epoch: target,
                    ..Checkpoint::default()
                },
                ..AttestationData::default()
            },
            ..IndexedAttestation::default()
        }
    }

    #[test_case((&[1], 2, 6), (&[1], 3, 5) => Some(AttesterSlashingReason::Surrounded))]
    #[test_case((&[1], 3, 5), (&[1], 2, 6) => Some(AttesterSlashingReason::Surrounding))]
    #[test_case((&[1], 3, 5), (&[2], 2, 6) => None; "disjoint attesters")]
    #[test_case((&[1], 3, 5), (&[1], 4, 6) => None; "overlapping spans")]
    #[test_case((&[1], 3, 5), (&[1], 3, 5) => None; "identical votes")]
    fn test_between(
        existing: (&[ValidatorIndex], Epoch, Epoch),
        incoming: (&[ValidatorIndex], Epoch, Epoch),
    ) -> Option<AttesterSlashingReason> {
        let existing = attestation(existing.0, existing.1, existing.2, H256::zero());
        let incoming = attestation(incoming.0, incoming.1, incoming.2, H256::zero());

        AttesterSlashingReason::between(&existing, &incoming)
    }

    #[test]
    fn between_detects_double_vote_with_different_roots() {
        let existing = attestation(&[1, 2], 3, 5, H256::zero());
        let incoming = attestation(&[2, 3], 4, 5, H256::repeat_byte(1));

        assert_eq!(
            AttesterSlashingReason::between(&existing, &incoming),
            Some(AttesterSlashingReason::DoubleVote),
        );
    }

    #[test]
    fn offense_reports_target_of_earlier_attestation_as_slashable_epoch() {
        let existing = attestation(&[1], 2, 6, H256::zero());
        let incoming = attestation(&[1], 3, 5, H256::zero());

        let explained =
            ExplainedAttesterSlashing::new(existing, incoming, AttesterSlashingReason::Surrounded);

        assert_eq!(
            explained.offense(),
            SlashableOffense::SurroundVote {
                epoch: 5,
                slashable_epoch: 6,
            },
        );
    }
}
