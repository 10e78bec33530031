use anyhow::Result;
use log::warn;
use prometheus::{IntCounter, IntGauge, Registry};

#[derive(Debug)]
pub struct Metrics {
    pub processed_attestations: IntCounter,
    pub processed_blocks: IntCounter,
    pub attester_slashings: IntCounter,
    pub proposer_slashings: IntCounter,
    pub detection_errors: IntCounter,
    pub latest_span_distance: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            processed_attestations: IntCounter::new(
                "SLASHER_PROCESSED_ATTESTATIONS",
                "Number of indexed attestations run through slashing detection",
            )?,
            processed_blocks: IntCounter::new(
                "SLASHER_PROCESSED_BLOCKS",
                "Number of block headers run through double proposal detection",
            )?,
            attester_slashings: IntCounter::new(
                "SLASHER_ATTESTER_SLASHINGS",
                "Number of attester slashings constructed",
            )?,
            proposer_slashings: IntCounter::new(
                "SLASHER_PROPOSER_SLASHINGS",
                "Number of proposer slashings constructed",
            )?,
            detection_errors: IntCounter::new(
                "SLASHER_DETECTION_ERRORS",
                "Number of attestations or blocks for which detection failed",
            )?,
            latest_span_distance: IntGauge::new(
                "SLASHER_LATEST_SPAN_DISTANCE",
                "Distance between target and source epochs of the latest processed attestation",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.processed_attestations.clone()))?;
        registry.register(Box::new(self.processed_blocks.clone()))?;
        registry.register(Box::new(self.attester_slashings.clone()))?;
        registry.register(Box::new(self.proposer_slashings.clone()))?;
        registry.register(Box::new(self.detection_errors.clone()))?;
        registry.register(Box::new(self.latest_span_distance.clone()))?;

        Ok(())
    }

    pub fn set_latest_span_distance(&self, distance: u64) {
        match i64::try_from(distance) {
            Ok(distance) => self.latest_span_distance.set(distance),
            Err(error) => warn!("unable to record span distance {distance}: {error}"),
        }
    }
}
