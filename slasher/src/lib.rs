//! Detection of slashable offenses in a stream of attestations and block headers.
//!
//! Attestations are checked for surround votes with min-max spans and for double votes with an
//! index of earlier attestations. Block headers are checked for double proposals.

pub use crate::{
    attestations::Attestations,
    blocks::Blocks,
    double_votes::DoubleVoteDetector,
    error::{Error, FeedKind, Store},
    feed::{channel, stop_signal, Feed, StopSignal, Stopper, Subscription},
    indexed_attestations::IndexedAttestations,
    messages::SlashingEvidence,
    metrics::Metrics,
    slasher::{Databases, Slasher},
    slasher_config::SlasherConfig,
    span_detector::SpanDetector,
    spans::{Span, Spans},
    status::{
        AttesterSlashingReason, ExplainedAttesterSlashing, ExplainedProposerSlashing,
        ProposerSlashingReason, SlashableOffense,
    },
};

mod attestations;
mod blocks;
mod double_votes;
mod error;
mod feed;
mod indexed_attestations;
mod messages;
mod metrics;
mod slasher;
mod slasher_config;
mod span_detector;
mod spans;
mod status;
