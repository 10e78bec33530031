use anyhow::{ensure, Result};
use log::debug;
use types::phase0::{
    containers::AttestationData,
    primitives::{Epoch, ValidatorIndex},
};

use crate::{
    error::Error,
    slasher_config::SlasherConfig,
    spans::{Span, Spans},
    status::SlashableOffense,
};

pub struct SpanDetector {
    config: SlasherConfig,
    spans: Spans,
}

impl SpanDetector {
    #[must_use]
    pub const fn new(config: SlasherConfig, spans: Spans) -> Self {
        Self { config, spans }
    }

    #[must_use]
    pub const fn spans(&self) -> &Spans {
        &self.spans
    }

    /// Checks an attestation of one validator against the spans of its earlier attestations and
    /// records it in the spans.
    ///
    /// The attestation is recorded even when it conflicts with an earlier one. Later attestations
    /// that conflict only with it are then still detected.
    ///
    /// Detection and update are not atomic with respect to other calls for the same validator.
    /// Attestations of a single validator must be processed one at a time.
    pub fn detect_slashing_for_validator(
        &self,
        validator_index: ValidatorIndex,
        data: AttestationData,
    ) -> Result<SlashableOffense> {
        let source = data.source.epoch;
        let target = data.target.epoch;

        ensure!(
            source <= target,
            Error::InvalidAttestation {
                source_epoch: source,
                target_epoch: target,
            },
        );

        let distance = target - source;

        ensure!(
            distance <= self.config.history_length,
            Error::SpanTooLong {
                distance,
                maximum: self.config.history_length,
            },
        );

        let offense = self.find_surround_vote(validator_index, source, target)?;

        self.update_spans(validator_index, source, target)?;

        Ok(offense)
    }

    fn find_surround_vote(
        &self,
        validator_index: ValidatorIndex,
        source: Epoch,
        target: Epoch,
    ) -> Result<SlashableOffense> {
        if self.spans.latest_attested_epoch(validator_index)?.is_none() {
            debug!(
                "first attestation by validator {validator_index} \
                 (source: {source}, target: {target})",
            );

            return Ok(SlashableOffense::None);
        }

        let distance = u16::try_from(target - source)?;

        let Span { min_span, max_span } = self
            .spans
            .get(validator_index, source)?
            .unwrap_or_default();

        // The new attestation surrounds an earlier one that targets `source + min_span`.
        if min_span != 0 && min_span < distance {
            let slashable_epoch = source + Epoch::from(min_span);

            debug!(
                "validator {validator_index} made a surrounding vote \
                 (source: {source}, target: {target}, slashable epoch: {slashable_epoch})",
            );

            return Ok(SlashableOffense::SurroundVote {
                epoch: target,
                slashable_epoch,
            });
        }

        // The new attestation is surrounded by an earlier one that targets `source + max_span`.
        if max_span > distance {
            let slashable_epoch = source + Epoch::from(max_span);

            debug!(
                "validator {validator_index} made a surrounded vote \
                 (source: {source}, target: {target}, slashable epoch: {slashable_epoch})",
            );

            return Ok(SlashableOffense::SurroundVote {
                epoch: target,
                slashable_epoch,
            });
        }

        Ok(SlashableOffense::None)
    }

    fn update_spans(
        &self,
        validator_index: ValidatorIndex,
        source: Epoch,
        target: Epoch,
    ) -> Result<()> {
        let mut updates = vec![];

        // Min spans are only kept for `min_span_lookback` epochs before the source and for epochs
        // within `history_length` of the target. The latter keeps every stored distance in `u16`.
        let lowest_epoch = source
            .saturating_sub(self.config.min_span_lookback)
            .max(target.saturating_sub(self.config.history_length));

        for epoch in (lowest_epoch..source).rev() {
            let mut span = self.spans.get(validator_index, epoch)?.unwrap_or_default();
            let min_span = u16::try_from(target - epoch)?;

            // Earlier epochs within its lookback are bounded by the attestation that stopped here.
            if span.min_span != 0 && span.min_span <= min_span {
                break;
            }

            span.min_span = min_span;
            updates.push((epoch, span));
        }

        for epoch in source + 1..target {
            let mut span = self.spans.get(validator_index, epoch)?.unwrap_or_default();
            let max_span = u16::try_from(target - epoch)?;

            if span.max_span >= max_span {
                break;
            }

            span.max_span = max_span;
            updates.push((epoch, span));
        }

        self.spans.update(validator_index, updates, target)
    }
}
