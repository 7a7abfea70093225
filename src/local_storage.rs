//! Key-value backends the lesson store persists through.
//!
//! [`KeyValueStorage`] is the seam between the store and where bytes end up.
//! [`LmdbStorage`] is the durable backend: one LMDB environment directory
//! (`<name>.lmdb`) holding a single unnamed database of string keys to UTF-8
//! values. [`MemoryStorage`] keeps everything in process memory and serves as
//! session-scoped storage and as a test double; it can be given a byte
//! capacity to simulate a full store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::app_response::AppResponse;

/// String key-value storage with local-storage semantics.
///
/// A `set_item` either stores the whole value or fails; a full store must be
/// reported as [`AppResponse::QuotaExceeded`].
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse>;

    /// Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), AppResponse>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for &T {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), AppResponse> {
        (**self).remove_item(key)
    }
}

pub struct LmdbStorage {
    env: Environment,
    db: Database,
}

impl LmdbStorage {
    /// Opens (or creates) the environment at `<name>.lmdb`.
    ///
    /// `map_size` bounds the environment; writes beyond it fail with
    /// [`AppResponse::QuotaExceeded`].
    pub fn init(name: String, map_size: usize) -> Result<Self, AppResponse> {
        let lmdb_dir = format!("{name}.lmdb");
        let path = Path::new(&lmdb_dir);

        if !path.exists() {
            info!("Creating storage directory at: {}", lmdb_dir);
            std::fs::create_dir_all(path)?;
        }

        let env = Environment::new()
            .set_map_size(map_size)
            .set_max_dbs(1)
            .open(path)?;
        let db = env.create_db(None, DatabaseFlags::empty())?;

        debug!("LMDB environment ready at {} (map size {} bytes)", lmdb_dir, map_size);
        Ok(Self { env, db })
    }

    /// Flushes buffered writes to disk.
    pub fn sync(&self) -> Result<(), AppResponse> {
        self.env.sync(true)?;
        Ok(())
    }
}

impl KeyValueStorage for LmdbStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(String::from_utf8(bytes.to_vec()).map_err(|e| {
                AppResponse::SerializationError(format!("Invalid UTF-8 under key '{key}': {e}"))
            })?),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.abort();
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        if let Err(e) = txn.put(self.db, &key, &value, WriteFlags::empty()) {
            warn!("Write to '{}' rejected: {}", key, e);
            txn.abort();
            return Err(e.into());
        }
        txn.commit()?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) => {}
            Err(lmdb::Error::NotFound) => {
                txn.abort();
                return Ok(());
            }
            Err(e) => {
                txn.abort();
                return Err(e.into());
            }
        }
        txn.commit()?;
        Ok(())
    }
}

/// In-process storage, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that refuses writes once keys plus values would exceed
    /// `capacity_bytes`.
    pub fn with_capacity_limit(capacity_bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    /// Bytes currently held, counting keys and values.
    pub fn used_bytes(&self) -> usize {
        self.items()
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppResponse> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        let mut items = self.items();

        if let Some(capacity) = self.capacity_bytes {
            let others: usize = items
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > capacity {
                return Err(AppResponse::quota_exceeded());
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppResponse> {
        self.items().remove(key);
        Ok(())
    }
}
