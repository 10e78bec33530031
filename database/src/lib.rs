use core::ops::{Bound, RangeFrom};
use std::{
    borrow::Cow,
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use bytesize::ByteSize;
use im::OrdMap;
use itertools::Either;
use libmdbx::{DatabaseFlags, Environment, Geometry, WriteFlags};
use log::info;
use snap::raw::{Decoder, Encoder};
use tap::Pipe as _;
use thiserror::Error;

const GROWTH_STEP: ByteSize = ByteSize::mib(256);
const MAX_NAMED_DATABASES: usize = 10;

/// Ordered key-value storage with byte keys.
///
/// Keys are compared lexicographically, so fixed-width big-endian integers in keys sort
/// numerically. Every write goes through a single transaction and is atomic for all pairs it
/// contains. Nothing in this crate deletes data.
pub struct Database(DatabaseKind);

impl Database {
    pub fn persistent(name: &str, directory: impl AsRef<Path>, max_size: ByteSize) -> Result<Self> {
        let directory = directory.as_ref();

        directory.to_str().ok_or(Error)?;

        fs_err::create_dir_all(directory)?;

        let environment = Environment::builder()
            .set_max_dbs(MAX_NAMED_DATABASES)
            .set_geometry(Geometry {
                size: Some(..usize::try_from(max_size.as_u64())?),
                growth_step: Some(isize::try_from(GROWTH_STEP.as_u64())?),
                shrink_threshold: None,
                page_size: None,
            })
            .open(directory)?;

        let transaction = environment.begin_rw_txn()?;
        transaction.create_db(Some(name), DatabaseFlags::default())?;
        transaction.commit()?;

        info!("opened database {name} in {}", directory.display());

        Ok(Self(DatabaseKind::Persistent {
            database_name: name.to_owned(),
            environment,
        }))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self(DatabaseKind::InMemory {
            map: Mutex::default(),
        })
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        let contains_key = match self.kind() {
            DatabaseKind::Persistent {
                database_name,
                environment,
            } => {
                let transaction = environment.begin_ro_txn()?;
                let database = transaction.open_db(Some(database_name))?;
                transaction
                    .get::<()>(database.dbi(), key.as_ref())?
                    .is_some()
            }
            DatabaseKind::InMemory { map } => map
                .lock()
                .expect("in-memory database mutex is poisoned")
                .contains_key(key.as_ref()),
        };

        Ok(contains_key)
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        match self.kind() {
            DatabaseKind::Persistent {
                database_name,
                environment,
            } => {
                let transaction = environment.begin_ro_txn()?;
                let database = transaction.open_db(Some(database_name))?;

                transaction
                    .get::<Cow<_>>(database.dbi(), key.as_ref())?
                    .map(|compressed| decompress(&compressed))
            }
            DatabaseKind::InMemory { map } => map
                .lock()
                .expect("in-memory database mutex is poisoned")
                .get(key.as_ref())
                .map(|compressed| decompress(compressed)),
        }
        .transpose()
    }

    /// Iterates over all pairs with keys greater than or equal to `range.start` in ascending order.
    ///
    /// The iterator sees the database as it was when the method was called.
    #[expect(clippy::type_complexity)]
    pub fn iterator_ascending(
        &self,
        range: RangeFrom<impl AsRef<[u8]>>,
    ) -> Result<impl Iterator<Item = Result<(Cow<[u8]>, Vec<u8>)>>> {
        let start = range.start.as_ref();

        match self.kind() {
            DatabaseKind::Persistent {
                database_name,
                environment,
            } => {
                let transaction = environment.begin_ro_txn()?;
                let database = transaction.open_db(Some(database_name))?;

                let mut cursor = transaction.cursor(&database)?;

                cursor
                    .set_range(start)
                    .transpose()
                    .into_iter()
                    .chain(core::iter::from_fn(move || cursor.next().transpose()))
                    .map(|result| decompress_pair(result?))
                    .pipe(Either::Left)
            }
            DatabaseKind::InMemory { map } => {
                let map = map.lock().expect("in-memory database mutex is poisoned");

                map.range::<_, [u8]>((Bound::Included(start), Bound::Unbounded))
                    .map(|(key, value)| Ok((Cow::Owned(key.to_vec()), decompress(value)?)))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .pipe(Either::Right)
            }
        }
        .pipe(Ok)
    }

    /// Iterates over all pairs whose keys start with `prefix` in ascending order.
    #[expect(clippy::type_complexity)]
    pub fn prefix_iterator(
        &self,
        prefix: impl AsRef<[u8]>,
    ) -> Result<impl Iterator<Item = Result<(Cow<[u8]>, Vec<u8>)>>> {
        let prefix = prefix.as_ref().to_vec();

        let iterator = self
            .iterator_ascending(prefix.clone()..)?
            .take_while(move |result| {
                result
                    .as_ref()
                    .map_or(true, |(key, _)| key.starts_with(&prefix))
            });

        Ok(iterator)
    }

    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.put_batch(core::iter::once((key, value)))
    }

    pub fn put_batch(
        &self,
        pairs: impl IntoIterator<Item = (impl AsRef<[u8]>, impl AsRef<[u8]>)>,
    ) -> Result<()> {
        match self.kind() {
            DatabaseKind::Persistent {
                database_name,
                environment,
            } => {
                let transaction = environment.begin_rw_txn()?;
                let database = transaction.open_db(Some(database_name))?;

                for (key, value) in pairs {
                    let compressed = compress(value.as_ref())?;
                    transaction.put(
                        database.dbi(),
                        key.as_ref(),
                        compressed,
                        WriteFlags::default(),
                    )?;
                }

                transaction.commit()?;
            }
            DatabaseKind::InMemory { map } => {
                // Build the new map first so that a failed compression leaves the old one intact.
                let mut map = map.lock().expect("in-memory database mutex is poisoned");
                let mut new_map = map.clone();

                for (key, value) in pairs {
                    let key = key.as_ref().into();
                    let compressed = compress(value.as_ref())?.into();
                    new_map.insert(key, compressed);
                }

                *map = new_map;
            }
        }

        Ok(())
    }

    const fn kind(&self) -> &DatabaseKind {
        &self.0
    }
}

enum DatabaseKind {
    Persistent {
        database_name: String,
        environment: Environment,
    },
    InMemory {
        // `OrdMap` clones its elements when cloned itself.
        // `Arc<[u8]>` makes that cheap where `Vec<u8>` would copy every key and value.
        map: Mutex<InMemoryMap>,
    },
}

#[derive(Debug, Error)]
#[error("database directory path should be a valid Unicode string")]
struct Error;

type InMemoryMap = OrdMap<Arc<[u8]>, Arc<[u8]>>;

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    Encoder::new().compress_vec(data).map_err(Into::into)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    Decoder::new().decompress_vec(data).map_err(Into::into)
}

fn decompress_pair<K>((key, compressed_value): (K, Cow<[u8]>)) -> Result<(K, Vec<u8>)> {
    let value = decompress(&compressed_value)?;
    Ok((key, value))
}
