use anyhow::{Context as _, Result};
use database::Database;
use serde::{Deserialize, Serialize};
use types::phase0::primitives::{Epoch, ValidatorIndex};

use crate::error::{Error, Store};

const VALIDATOR_INDEX_SIZE: usize = size_of::<ValidatorIndex>();
const EPOCH_SIZE: usize = size_of::<Epoch>();
const SPAN_KEY_LENGTH: usize = VALIDATOR_INDEX_SIZE + EPOCH_SIZE;

type HistoryKey = [u8; VALIDATOR_INDEX_SIZE];
type SpanKey = [u8; SPAN_KEY_LENGTH];

// Both kinds of keys start with the big-endian validator index.
// The history key is a strict prefix of every span key of the same validator.
//
// ValidatorIndex -> latest attested Epoch
fn history_key(validator_index: ValidatorIndex) -> HistoryKey {
    validator_index.to_be_bytes()
}

// ValidatorIndex,Epoch -> Span
fn span_key(validator_index: ValidatorIndex, epoch: Epoch) -> SpanKey {
    let mut key = [0; SPAN_KEY_LENGTH];
    key[..VALIDATOR_INDEX_SIZE].copy_from_slice(&validator_index.to_be_bytes());
    key[VALIDATOR_INDEX_SIZE..].copy_from_slice(&epoch.to_be_bytes());
    key
}

fn epoch_from_span_key(key: &[u8]) -> Option<Epoch> {
    let bytes = key.get(VALIDATOR_INDEX_SIZE..SPAN_KEY_LENGTH)?.try_into().ok()?;
    Some(Epoch::from_be_bytes(bytes))
}

/// Distances from an epoch to the targets of a validator's attestations.
///
/// `min_span` is the smallest `target - epoch` over attestations with `source > epoch`.
/// `max_span` is the largest `target - epoch` over attestations with `source < epoch < target`.
/// Zero means no such attestation has been seen.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct Span {
    pub min_span: u16,
    pub max_span: u16,
}

pub struct Spans {
    spans_db: Database,
}

impl Spans {
    #[must_use]
    pub const fn new(spans_db: Database) -> Self {
        Self { spans_db }
    }

    pub fn get(&self, validator_index: ValidatorIndex, epoch: Epoch) -> Result<Option<Span>> {
        self.spans_db
            .get(span_key(validator_index, epoch))
            .context(Error::StoreUnavailable {
                store: Store::Spans,
            })?
            .map(|bytes| bincode::deserialize(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    pub fn set(&self, validator_index: ValidatorIndex, epoch: Epoch, span: Span) -> Result<()> {
        self.spans_db
            .put(span_key(validator_index, epoch), bincode::serialize(&span)?)
            .context(Error::StoreUnavailable {
                store: Store::Spans,
            })
    }

    pub fn latest_attested_epoch(&self, validator_index: ValidatorIndex) -> Result<Option<Epoch>> {
        self.spans_db
            .get(history_key(validator_index))
            .context(Error::StoreUnavailable {
                store: Store::Spans,
            })?
            .map(|bytes| bincode::deserialize(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    /// Writes updated spans of one validator together with its attestation history.
    ///
    /// All writes land in a single transaction. Readers never see spans without the matching
    /// history.
    pub fn update(
        &self,
        validator_index: ValidatorIndex,
        spans: impl IntoIterator<Item = (Epoch, Span)>,
        attested_epoch: Epoch,
    ) -> Result<()> {
        let previous_epoch = self.latest_attested_epoch(validator_index)?;
        let latest_epoch = previous_epoch.map_or(attested_epoch, |epoch| epoch.max(attested_epoch));

        let mut pairs = spans
            .into_iter()
            .map(|(epoch, span)| {
                let key = span_key(validator_index, epoch).to_vec();
                let value = bincode::serialize(&span)?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>>>()?;

        if pairs.is_empty() && previous_epoch == Some(latest_epoch) {
            return Ok(());
        }

        pairs.push((
            history_key(validator_index).to_vec(),
            bincode::serialize(&latest_epoch)?,
        ));

        self.spans_db
            .put_batch(pairs)
            .context(Error::StoreUnavailable {
                store: Store::Spans,
            })
    }

    /// Returns every stored span of a validator in ascending epoch order.
    pub fn spans_of_validator(&self, validator_index: ValidatorIndex) -> Result<Vec<(Epoch, Span)>> {
        self.spans_db
            .prefix_iterator(history_key(validator_index))
            .context(Error::StoreUnavailable {
                store: Store::Spans,
            })?
            .filter_map(|result| {
                result
                    .map(|(key, value)| {
                        let epoch = epoch_from_span_key(&key)?;
                        Some((epoch, value))
                    })
                    .transpose()
            })
            .map(|result| {
                let (epoch, value) = result?;
                Ok((epoch, bincode::deserialize(&value)?))
            })
            .collect()
    }
}
