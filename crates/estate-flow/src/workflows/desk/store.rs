//! Persistence of listing records across restarts.
//!
//! The desk saves a listing's whole record after every committed change, so
//! a store only needs whole-record writes and a bulk load at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::record::ListingRecord;
use crate::workflows::listing::ListingId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("listing storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode listing '{listing}': {source}")]
    Encode {
        listing: ListingId,
        #[source]
        source: serde_json::Error,
    },
    #[error("corrupt listing snapshot {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage behind the listing desk's state.
pub trait ListingStore: Send + Sync {
    /// Replace the stored copy of `record`.
    fn save(&self, record: &ListingRecord) -> Result<(), StoreError>;

    /// Every stored record, ordered by listing ID.
    fn load(&self) -> Result<Vec<ListingRecord>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryListingStore {
    records: Mutex<BTreeMap<ListingId, ListingRecord>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ListingStore for InMemoryListingStore {
    fn save(&self, record: &ListingRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .expect("listing store poisoned")
            .insert(record.listing.id.clone(), record.clone());
        Ok(())
    }

    fn load(&self) -> Result<Vec<ListingRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .expect("listing store poisoned")
            .values()
            .cloned()
            .collect())
    }
}

/// One pretty-printed JSON snapshot per listing, `<dir>/<listing-id>.json`.
/// Snapshots are written to a `.tmp` sibling and renamed into place.
#[derive(Debug)]
pub struct JsonFileListingStore {
    dir: PathBuf,
}

impl JsonFileListingStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, id: &ListingId) -> PathBuf {
        self.dir.join(format!("{}.json", id.0))
    }
}

impl ListingStore for JsonFileListingStore {
    fn save(&self, record: &ListingRecord) -> Result<(), StoreError> {
        let id = &record.listing.id;
        let json = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Encode {
            listing: id.clone(),
            source,
        })?;

        let path = self.snapshot_path(id);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<ListingRecord>, StoreError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let bytes = fs::read(&path)?;
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode { path, source })
            })
            .collect()
    }
}
