use std::sync::Arc;

use anyhow::Result;
use database::Database;
use futures::channel::mpsc::UnboundedSender;
use log::{debug, info, warn};
use types::phase0::containers::{IndexedAttestation, SignedBeaconBlockHeader};

use crate::{
    attestations::Attestations,
    blocks::Blocks,
    error::FeedKind,
    feed::{StopSignal, Subscription},
    messages::SlashingEvidence,
    metrics::Metrics,
    status::ExplainedProposerSlashing,
    SlasherConfig,
};

pub struct Databases {
    pub spans_db: Database,
    pub attestations_db: Database,
    pub blocks_db: Database,
}

impl Databases {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            spans_db: Database::in_memory(),
            attestations_db: Database::in_memory(),
            blocks_db: Database::in_memory(),
        }
    }
}

pub struct Slasher {
    attestations: Attestations,
    blocks: Blocks,
    metrics: Option<Arc<Metrics>>,
    slashing_tx: UnboundedSender<SlashingEvidence>,
}

impl Slasher {
    pub fn new(
        config: SlasherConfig,
        databases: Databases,
        metrics: Option<Arc<Metrics>>,
        slashing_tx: UnboundedSender<SlashingEvidence>,
    ) -> Result<Self> {
        config.validate()?;

        let Databases {
            spans_db,
            attestations_db,
            blocks_db,
        } = databases;

        Ok(Self {
            attestations: Attestations::new(config, spans_db, attestations_db),
            blocks: Blocks::new(blocks_db),
            metrics,
            slashing_tx,
        })
    }

    /// Listens to both feeds until `stop` fires or one of the listeners fails.
    ///
    /// The listeners run as separate tasks. A failure of one does not stop the other.
    pub async fn run(
        self,
        blocks: Subscription<SignedBeaconBlockHeader>,
        attestations: Subscription<IndexedAttestation>,
        stop: StopSignal,
    ) -> Result<()> {
        let slasher = Arc::new(self);

        let block_listener = tokio::spawn(
            Arc::clone(&slasher).listen_to_blocks(blocks, stop.clone()),
        );

        let attestation_listener =
            tokio::spawn(slasher.listen_to_attestations(attestations, stop));

        let block_result = block_listener.await?;
        let attestation_result = attestation_listener.await?;

        block_result.and(attestation_result)
    }

    pub async fn listen_to_blocks(
        self: Arc<Self>,
        subscription: Subscription<SignedBeaconBlockHeader>,
        stop: StopSignal,
    ) -> Result<()> {
        subscription
            .listen(FeedKind::Blocks, stop, |header| self.process_block(&header))
            .await
    }

    pub async fn listen_to_attestations(
        self: Arc<Self>,
        subscription: Subscription<IndexedAttestation>,
        stop: StopSignal,
    ) -> Result<()> {
        subscription
            .listen(FeedKind::Attestations, stop, |attestation| {
                self.process_attestation(&attestation);
            })
            .await
    }

    /// Runs detection for one attestation and sends every slashing found to the sink.
    ///
    /// Failures are logged. Slashings found before a failure are still sent.
    pub fn process_attestation(&self, attestation: &IndexedAttestation) {
        let data = attestation.data;

        debug!(
            "processing attestation record (attesters: {:?}, slot: {}, source: {}, target: {})",
            attestation.attesting_indices, data.slot, data.source.epoch, data.target.epoch,
        );

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.processed_attestations.inc();
            metrics.set_latest_span_distance(data.target.epoch.saturating_sub(data.source.epoch));
        }

        let mut slashings = vec![];

        let result = self
            .attestations
            .collect_attester_slashings(attestation, &mut slashings);

        for explained_attester_slashing in slashings {
            info!(
                "attester slashing constructed ({:?}): {explained_attester_slashing:?}",
                explained_attester_slashing.offense(),
            );

            if let Some(metrics) = self.metrics.as_ref() {
                metrics.attester_slashings.inc();
            }

            SlashingEvidence::AttesterSlashing(explained_attester_slashing.slashing)
                .send(&self.slashing_tx);
        }

        if let Err(error) = result {
            if let Some(metrics) = self.metrics.as_ref() {
                metrics.detection_errors.inc();
            }

            warn!(
                "slashing detection failed for attestation \
                 (attesters: {:?}, source: {}, target: {}): {error:?}",
                attestation.attesting_indices, data.source.epoch, data.target.epoch,
            );
        }
    }

    pub fn process_block(&self, header: &SignedBeaconBlockHeader) {
        debug!(
            "processing block record (slot: {}, proposer: {}, state_root: {:?})",
            header.message.slot, header.message.proposer_index, header.message.state_root,
        );

        if let Some(metrics) = self.metrics.as_ref() {
            metrics.processed_blocks.inc();
        }

        match self.check_block(header) {
            Ok(Some(explained_proposer_slashing)) => {
                info!("proposer slashing constructed: {explained_proposer_slashing:?}");

                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.proposer_slashings.inc();
                }

                SlashingEvidence::ProposerSlashing(explained_proposer_slashing.slashing)
                    .send(&self.slashing_tx);
            }
            Ok(None) => {}
            Err(error) => {
                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.detection_errors.inc();
                }

                warn!(
                    "double proposal detection failed for block header \
                     (slot: {}, proposer: {}): {error:?}",
                    header.message.slot, header.message.proposer_index,
                );
            }
        }
    }

    fn check_block(
        &self,
        header: &SignedBeaconBlockHeader,
    ) -> Result<Option<ExplainedProposerSlashing>> {
        if let Some(slashing) = self.blocks.find_slashing(header)? {
            return Ok(Some(slashing));
        }

        self.blocks.update(header)?;

        Ok(None)
    }
}
