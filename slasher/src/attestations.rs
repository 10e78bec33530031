use anyhow::{ensure, Result};
use database::Database;
use log::{debug, warn};
use types::phase0::{containers::IndexedAttestation, primitives::ValidatorIndex};

use crate::{
    double_votes::DoubleVoteDetector,
    error::Error,
    indexed_attestations::IndexedAttestations,
    slasher_config::SlasherConfig,
    span_detector::SpanDetector,
    spans::Spans,
    status::{AttesterSlashingReason, ExplainedAttesterSlashing, SlashableOffense},
};

pub struct Attestations {
    span_detector: SpanDetector,
    indexed_attestations: IndexedAttestations,
}

impl Attestations {
    #[must_use]
    pub const fn new(config: SlasherConfig, spans_db: Database, attestations_db: Database) -> Self {
        Self {
            span_detector: SpanDetector::new(config, Spans::new(spans_db)),
            indexed_attestations: IndexedAttestations::new(attestations_db),
        }
    }

    #[must_use]
    pub const fn spans(&self) -> &Spans {
        self.span_detector.spans()
    }

    #[must_use]
    pub const fn indexed_attestations(&self) -> &IndexedAttestations {
        &self.indexed_attestations
    }

    pub fn detect_attester_slashings(
        &self,
        attestation: &IndexedAttestation,
    ) -> Result<Vec<ExplainedAttesterSlashing>> {
        let mut slashings = vec![];
        self.collect_attester_slashings(attestation, &mut slashings)?;
        Ok(slashings)
    }

    /// Runs surround vote detection for every attester of `attestation` and double vote
    /// detection for the whole attestation.
    ///
    /// Slashings are pushed to `slashings` as soon as they are found and stay there even if
    /// detection fails for some attester. The first failure is returned after all attesters have
    /// been checked.
    pub fn collect_attester_slashings(
        &self,
        attestation: &IndexedAttestation,
        slashings: &mut Vec<ExplainedAttesterSlashing>,
    ) -> Result<()> {
        // Surround votes are proven with attestations from the index.
        // The attestation must be there before spans are updated.
        self.indexed_attestations.index(attestation)?;

        let mut errors = vec![];

        for validator_index in attestation.attesting_indices.iter().copied() {
            if let Err(error) = self.collect_surround_votes(validator_index, attestation, slashings)
            {
                errors.push(error);
            }
        }

        match DoubleVoteDetector::new(&self.indexed_attestations).detect_double_votes(attestation) {
            Ok(double_votes) => slashings.extend(double_votes),
            Err(error) => errors.push(error),
        }

        let mut errors = errors.into_iter();

        let Some(error) = errors.next() else {
            return Ok(());
        };

        for error in errors {
            warn!("attester slashing detection failed more than once: {error:?}");
        }

        Err(error)
    }

    fn collect_surround_votes(
        &self,
        validator_index: ValidatorIndex,
        attestation: &IndexedAttestation,
        slashings: &mut Vec<ExplainedAttesterSlashing>,
    ) -> Result<()> {
        let offense = self
            .span_detector
            .detect_slashing_for_validator(validator_index, attestation.data)?;

        let SlashableOffense::SurroundVote {
            slashable_epoch, ..
        } = offense
        else {
            return Ok(());
        };

        let mut witnessed = false;

        for existing in self
            .indexed_attestations
            .attestations_for_epoch(slashable_epoch)?
        {
            let Some(
                reason @ (AttesterSlashingReason::Surrounding | AttesterSlashingReason::Surrounded),
            ) = AttesterSlashingReason::between(&existing, attestation)
            else {
                continue;
            };

            witnessed = true;

            let slashing = ExplainedAttesterSlashing::new(existing, attestation.clone(), reason);

            // Attesters of the same attestation often share a witness.
            if !slashings.contains(&slashing) {
                slashings.push(slashing);
            }
        }

        ensure!(
            witnessed,
            Error::InconsistentProof {
                validator_index,
                slashable_epoch,
            },
        );

        debug!(
            "surround vote by validator {validator_index} proven with attestations \
             for epoch {slashable_epoch}",
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use types::phase0::{
        containers::{AttestationData, Checkpoint},
        primitives::{Epoch, H256},
    };

    use crate::spans::Span;

    use super::*;

    fn build_attestation(
        attesting_indices: &[ValidatorIndex],
        source: Epoch,
        target: Epoch,
    ) -> IndexedAttestation {
        IndexedAttestation {
            attesting_indices: attesting_indices.to_vec(),
            data: AttestationData {
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

    fn build_attestations() -> Attestations {
        Attestations::new(
            SlasherConfig::default(),
            Database::in_memory(),
            Database::in_memory(),
        )
    }

    //       S          T
    //                    S  T
    //   S     T
    // 1 2 3 4 5 6 7 8 9 10 11
    #[test]
    fn slasher_attestation_storage_test() -> Result<()> {
        let attestations = build_attestations();

        // valid attestation data
        let at_1 = build_attestation(&[1], 2, 5);
        let at_2 = build_attestation(&[1], 10, 11);
        let at_3 = build_attestation(&[1], 4, 9);

        // slashing violations
        let at_4 = build_attestation(&[1], 1, 6);
        let at_5 = build_attestation(&[1], 1, 5);
        let at_6 = build_attestation(&[1], 7, 8);

        assert!(attestations.detect_attester_slashings(&at_1)?.is_empty());
        assert!(attestations.detect_attester_slashings(&at_2)?.is_empty());
        assert!(attestations.detect_attester_slashings(&at_3)?.is_empty());

        // surrounds at_1
        assert_eq!(
            attestations.detect_attester_slashings(&at_4)?,
            [ExplainedAttesterSlashing::new(
                at_1.clone(),
                at_4,
                AttesterSlashingReason::Surrounding,
            )],
        );

        // double vote
        assert_eq!(
            attestations.detect_attester_slashings(&at_5)?,
            [ExplainedAttesterSlashing::new(
                at_1,
                at_5,
                AttesterSlashingReason::DoubleVote,
            )],
        );

        // is surrounded by at_3
        assert_eq!(
            attestations.detect_attester_slashings(&at_6)?,
            [ExplainedAttesterSlashing::new(
                at_3,
                at_6,
                AttesterSlashingReason::Surrounded,
            )],
        );

        Ok(())
    }

    #[test]
    fn surround_vote_is_reported_once_in_either_order() -> Result<()> {
        let outer = build_attestation(&[1], 2, 6);
        let inner = build_attestation(&[1], 3, 5);

        for (first, second) in [(&outer, &inner), (&inner, &outer)] {
            let attestations = build_attestations();

            assert!(attestations.detect_attester_slashings(first)?.is_empty());

            let slashings = attestations.detect_attester_slashings(second)?;

            assert_eq!(slashings.len(), 1);
            assert_eq!(&slashings[0].slashing.attestation_1, first);
            assert_eq!(&slashings[0].slashing.attestation_2, second);
        }

        Ok(())
    }

    #[test]
    fn witness_shared_by_attesters_is_reported_once() -> Result<()> {
        let attestations = build_attestations();

        let outer = build_attestation(&[1, 2, 3], 2, 6);
        let inner = build_attestation(&[1, 2, 3], 3, 5);

        assert!(attestations.detect_attester_slashings(&outer)?.is_empty());

        assert_eq!(
            attestations.detect_attester_slashings(&inner)?,
            [ExplainedAttesterSlashing::new(
                outer,
                inner,
                AttesterSlashingReason::Surrounded,
            )],
        );

        Ok(())
    }

    #[test]
    fn repeated_attestation_is_not_slashable() -> Result<()> {
        let attestations = build_attestations();

        let attestation = build_attestation(&[1, 2], 2, 6);

        assert!(attestations.detect_attester_slashings(&attestation)?.is_empty());

        let spans = attestations.spans().spans_of_validator(1)?;

        assert!(attestations.detect_attester_slashings(&attestation)?.is_empty());
        assert_eq!(attestations.spans().spans_of_validator(1)?, spans);

        Ok(())
    }

    #[test]
    fn double_vote_yields_exactly_one_slashing() -> Result<()> {
        let attestations = build_attestations();

        let mut existing = build_attestation(&[1, 2], 3, 5);
        let mut incoming = build_attestation(&[2, 3], 3, 5);

        existing.data.beacon_block_root = H256::repeat_byte(1);
        incoming.data.beacon_block_root = H256::repeat_byte(2);

        assert!(attestations.detect_attester_slashings(&existing)?.is_empty());

        assert_eq!(
            attestations.detect_attester_slashings(&incoming)?,
            [ExplainedAttesterSlashing::new(
                existing,
                incoming,
                AttesterSlashingReason::DoubleVote,
            )],
        );

        Ok(())
    }

    #[test]
    fn vote_conflicting_only_with_earlier_violation_is_slashable() -> Result<()> {
        let attestations = build_attestations();

        let inner = build_attestation(&[1], 3, 5);
        let outer = build_attestation(&[1], 2, 8);
        let late = build_attestation(&[1], 6, 7);

        assert!(attestations.detect_attester_slashings(&inner)?.is_empty());

        assert_eq!(
            attestations.detect_attester_slashings(&outer)?,
            [ExplainedAttesterSlashing::new(
                inner,
                outer.clone(),
                AttesterSlashingReason::Surrounding,
            )],
        );

        assert_eq!(
            attestations.detect_attester_slashings(&late)?,
            [ExplainedAttesterSlashing::new(
                outer,
                late,
                AttesterSlashingReason::Surrounded,
            )],
        );

        Ok(())
    }

    #[test]
    fn double_vote_of_unsorted_aggregates_is_slashable() -> Result<()> {
        let attestations = build_attestations();

        let mut existing = build_attestation(&[5, 1], 3, 5);
        let mut incoming = build_attestation(&[9, 5], 3, 5);

        existing.data.beacon_block_root = H256::repeat_byte(1);
        incoming.data.beacon_block_root = H256::repeat_byte(2);

        assert!(attestations.detect_attester_slashings(&existing)?.is_empty());

        assert_eq!(
            attestations.detect_attester_slashings(&incoming)?,
            [ExplainedAttesterSlashing::new(
                existing,
                incoming,
                AttesterSlashingReason::DoubleVote,
            )],
        );

        Ok(())
    }

    #[test]
    fn conflicting_votes_of_disjoint_attesters_are_not_slashable() -> Result<()> {
        let attestations = build_attestations();

        let mut double_vote = build_attestation(&[3, 4], 2, 6);
        double_vote.data.beacon_block_root = H256::repeat_byte(1);

        assert!(attestations
            .detect_attester_slashings(&build_attestation(&[1, 2], 2, 6))?
            .is_empty());

        assert!(attestations
            .detect_attester_slashings(&double_vote)?
            .is_empty());

        assert!(attestations
            .detect_attester_slashings(&build_attestation(&[5, 6], 3, 5))?
            .is_empty());

        Ok(())
    }

    #[test]
    fn surround_vote_without_indexed_witness_is_inconsistent() -> Result<()> {
        let attestations = build_attestations();

        // Spans of an attestation with source 2 and target 6 that never reached the index.
        let span = Span {
            min_span: 0,
            max_span: 3,
        };

        attestations.spans().update(1, [(3, span)], 6)?;

        let error = attestations
            .detect_attester_slashings(&build_attestation(&[1], 3, 5))
            .expect_err("surround vote cannot be proven without the surrounding attestation");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::InconsistentProof {
                validator_index: 1,
                slashable_epoch: 6,
            }),
        ));

        Ok(())
    }

    #[test]
    fn slashings_found_before_failure_are_kept() -> Result<()> {
        let attestations = build_attestations();

        let outer = build_attestation(&[1], 2, 6);

        attestations.detect_attester_slashings(&outer)?;

        let span = Span {
            min_span: 0,
            max_span: 7,
        };

        attestations.spans().update(2, [(3, span)], 10)?;

        let inner = build_attestation(&[1, 2], 3, 5);
        let mut slashings = vec![];

        let result = attestations.collect_attester_slashings(&inner, &mut slashings);

        assert!(matches!(
            result.expect_err("validator 2 has no witness").downcast_ref(),
            Some(Error::InconsistentProof {
                validator_index: 2,
                slashable_epoch: 10,
            }),
        ));

        assert_eq!(
            slashings,
            [ExplainedAttesterSlashing::new(
                outer,
                inner,
                AttesterSlashingReason::Surrounded,
            )],
        );

        Ok(())
    }

    #[test]
    fn concurrent_detection_for_disjoint_validators_matches_sequential() -> Result<()> {
        let votes = [(2, 6), (3, 5), (4, 9), (1, 3), (8, 10), (7, 12)];
        let validator_indices = 0..8;

        let sequential = build_attestations();

        for validator_index in validator_indices.clone() {
            for (source, target) in votes {
                let attestation = build_attestation(&[validator_index], source, target);
                sequential.detect_attester_slashings(&attestation)?;
            }
        }

        let concurrent = build_attestations();

        std::thread::scope(|scope| -> Result<()> {
            let handles = validator_indices
                .clone()
                .map(|validator_index| {
                    let concurrent = &concurrent;

                    scope.spawn(move || -> Result<()> {
                        for (source, target) in votes {
                            let attestation =
                                build_attestation(&[validator_index], source, target);
                            concurrent.detect_attester_slashings(&attestation)?;
                        }

                        Ok(())
                    })
                })
                .collect::<Vec<_>>();

            for handle in handles {
                handle.join().expect("detection thread should not panic")?;
            }

            Ok(())
        })?;

        for validator_index in validator_indices {
            assert_eq!(
                concurrent.spans().spans_of_validator(validator_index)?,
                sequential.spans().spans_of_validator(validator_index)?,
            );

            assert_eq!(
                concurrent.spans().latest_attested_epoch(validator_index)?,
                sequential.spans().latest_attested_epoch(validator_index)?,
            );
        }

        Ok(())
    }
}
