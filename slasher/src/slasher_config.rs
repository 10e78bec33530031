use anyhow::{ensure, Result};
use derivative::Derivative;

use crate::error::Error;

#[derive(Clone, Copy, Debug, Derivative)]
#[derivative(Default)]
pub struct SlasherConfig {
    /// Maximum distance between the source and target epochs of an attestation. Min spans are not
    /// written for epochs further than this before the target. Defaults to the weak subjectivity
    /// period.
    #[derivative(Default(value = "54000"))]
    pub history_length: u64,
    /// How many epochs before the source of an attestation its min spans are written to.
    /// Surrounding votes are detected when their source lies within this window of the source of
    /// the attestation they surround.
    #[derivative(Default(value = "128"))]
    pub min_span_lookback: u64,
}

impl SlasherConfig {
    // Spans are stored as 16 bit integers. Every span is bounded by `history_length`.
    pub fn validate(self) -> Result<()> {
        let maximum = u16::MAX.into();

        ensure!(
            (1..=maximum).contains(&self.history_length),
            Error::InvalidHistoryLength {
                history_length: self.history_length,
                maximum,
            },
        );

        ensure!(
            self.min_span_lookback > 0,
            Error::InvalidMinSpanLookback {
                min_span_lookback: self.min_span_lookback,
            },
        );

        Ok(())
    }
}
