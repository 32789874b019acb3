//! RocksDB-backed key-value store.
//!
//! Persists the auction module's state in a RocksDB instance with a single
//! dedicated column family:
//!
//! - `"state"`: maps raw keeper keys to raw values.
//!
//! Write failures are logged and dropped, mirroring the in-memory store's
//! infallible interface; the keeper treats the store as always available.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};

use super::KvStore;

/// Configuration for [`RocksDbKvStore`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if they
    /// do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/auction-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// Storage-level error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("rocksdb: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("missing column family {0:?}")]
    MissingColumnFamily(&'static str),
}

/// RocksDB-backed implementation of [`KvStore`].
pub struct RocksDbKvStore {
    db: DB,
}

impl RocksDbKvStore {
    /// Opens (or creates) a RocksDB-backed store at the configured path.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new("state", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self { db })
    }

    fn cf_state(&self) -> Result<Arc<BoundColumnFamily<'_>>, StorageError> {
        self.db
            .cf_handle("state")
            .ok_or(StorageError::MissingColumnFamily("state"))
    }
}

impl KvStore for RocksDbKvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let cf = self.cf_state().ok()?;
        match self.db.get_cf(&cf, key) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(err = %e, "rocksdb get failed");
                None
            }
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        match self.cf_state() {
            Ok(cf) => {
                if let Err(e) = self.db.put_cf(&cf, key, value) {
                    tracing::error!(err = %e, "rocksdb put failed");
                }
            }
            Err(e) => tracing::error!(err = %e, "rocksdb put failed"),
        }
    }

    fn delete(&mut self, key: &[u8]) {
        match self.cf_state() {
            Ok(cf) => {
                if let Err(e) = self.db.delete_cf(&cf, key) {
                    tracing::error!(err = %e, "rocksdb delete failed");
                }
            }
            Err(e) => tracing::error!(err = %e, "rocksdb delete failed"),
        }
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let Ok(cf) = self.cf_state() else {
            return Vec::new();
        };

        let mode = IteratorMode::From(prefix, Direction::Forward);
        let mut hits = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            match item {
                Ok((key, value)) => {
                    if !key.starts_with(prefix) {
                        break;
                    }
                    hits.push((key.to_vec(), value.to_vec()));
                }
                Err(e) => {
                    tracing::error!(err = %e, "rocksdb iteration failed");
                    break;
                }
            }
        }
        hits
    }
}
