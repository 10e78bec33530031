use derive_more::Display;
use thiserror::Error;
use types::phase0::primitives::{Epoch, ValidatorIndex};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum Store {
    #[display("span")]
    Spans,
    #[display("attestation index")]
    AttestationIndex,
    #[display("block")]
    Blocks,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum FeedKind {
    #[display("block")]
    Blocks,
    #[display("attestation")]
    Attestations,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{store} store is unavailable")]
    StoreUnavailable { store: Store },
    #[error(
        "surround vote by validator {validator_index} is provable at epoch {slashable_epoch} \
         but no attestation for that epoch is indexed"
    )]
    InconsistentProof {
        validator_index: ValidatorIndex,
        slashable_epoch: Epoch,
    },
    #[error("attestation target epoch {target_epoch} precedes its source epoch {source_epoch}")]
    InvalidAttestation {
        source_epoch: Epoch,
        target_epoch: Epoch,
    },
    #[error("attestation span of {distance} epochs exceeds the history length of {maximum}")]
    SpanTooLong { distance: u64, maximum: u64 },
    #[error("history length must be between 1 and {maximum} (configured: {history_length})")]
    InvalidHistoryLength { history_length: u64, maximum: u64 },
    #[error("min span lookback must be at least 1 (configured: {min_span_lookback})")]
    InvalidMinSpanLookback { min_span_lookback: u64 },
    #[error("{feed} feed closed")]
    FeedClosed { feed: FeedKind },
    #[error("{feed} feed failed: {reason}")]
    FeedFailed { feed: FeedKind, reason: String },
}
