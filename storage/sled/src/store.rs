use std::path::PathBuf;

use async_trait::async_trait;
use segmerge_core::error::StorageError;
use segmerge_core::storage::MergeStorage;
use segmerge_proto::EquivalenceSnapshot;
use tokio::task;
use tracing::debug;

use crate::error::SledStoreError;

const TREE_NAME: &str = "merges";
const MAIN_TO_OTHERS_KEY: &str = "main_to_others";
const OTHER_TO_MAIN_KEY: &str = "other_to_main";
const ORDERING_KEY: &str = "merge_ordering";

/// Local persistent backend: one sled tree, three fixed keys, JSON values.
/// The application-local analog of the remote key-value backend.
#[derive(Clone)]
pub struct SledMergeStore {
    pub db: sled::Db,
    tree: sled::Tree,
}

impl SledMergeStore {
    pub fn with_homedir_folder(folder_name: &str) -> anyhow::Result<Self> {
        let dir = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?.join(folder_name);

        Self::with_path(dir)
    }

    pub fn with_path(path: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&path)?;
        let dbpath = path.join("sled");
        let db = sled::open(&dbpath)?;
        Self::with_db(db)
    }

    pub fn new() -> anyhow::Result<Self> { Self::with_homedir_folder(".segmerge") }

    pub fn new_test() -> anyhow::Result<Self> {
        let db = sled::Config::new().temporary(true).flush_every_ms(None).open()?;
        Self::with_db(db)
    }

    fn with_db(db: sled::Db) -> anyhow::Result<Self> {
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    fn store_blocking(&self, snapshot: EquivalenceSnapshot) -> Result<(), SledStoreError> {
        self.tree.insert(MAIN_TO_OTHERS_KEY, serde_json::to_vec(&snapshot.main_to_others)?)?;
        self.tree.insert(OTHER_TO_MAIN_KEY, serde_json::to_vec(&snapshot.other_to_main)?)?;
        self.tree.insert(ORDERING_KEY, serde_json::to_vec(&snapshot.ordering)?)?;
        self.tree.flush()?;
        debug!(groups = snapshot.main_to_others.len(), "stored merge state");
        Ok(())
    }

    fn restore_blocking(&self) -> Result<EquivalenceSnapshot, SledStoreError> {
        // a key that was never written restores as its empty form
        let main_to_others = match self.tree.get(MAIN_TO_OTHERS_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Default::default(),
        };
        let other_to_main = match self.tree.get(OTHER_TO_MAIN_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Default::default(),
        };
        let ordering = match self.tree.get(ORDERING_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };
        Ok(EquivalenceSnapshot { main_to_others, other_to_main, ordering })
    }
}

#[async_trait]
impl MergeStorage for SledMergeStore {
    // sled operations are not async; run them on the blocking pool
    async fn store(&self, snapshot: &EquivalenceSnapshot) -> Result<(), StorageError> {
        let me = self.clone();
        let snapshot = snapshot.clone();
        task::spawn_blocking(move || me.store_blocking(snapshot)).await.map_err(SledStoreError::Join)??;
        Ok(())
    }

    async fn restore(&self) -> Result<EquivalenceSnapshot, StorageError> {
        let me = self.clone();
        let snapshot = task::spawn_blocking(move || me.restore_blocking()).await.map_err(SledStoreError::Join)??;
        Ok(snapshot)
    }
}
