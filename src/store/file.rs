use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{Result, TimevaultError};
use crate::store::records::{self, ChangeFeed, Records};
use crate::store::{ChangeKind, VaultChange, VaultStore};
use crate::vault::{OwnerId, RevealStamps, Vault, VaultId};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout of the store file.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    vaults: Vec<Vault>,
}

/// Durable store: one MessagePack file shared by every process that opens it.
///
/// Writes hold an exclusive lock on a sidecar `.lock` file while they reread
/// the records, check ownership and stamps, and write the result back, so
/// handles in different processes never overwrite each other's changes. Reads
/// take the file as last renamed into place.
///
/// Change notifications reach subscribers in the same process only.
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    feed: ChangeFeed,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    /// A file that cannot be decoded is rejected here.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = load_records(&path)?;
        info!(path = %path.display(), vaults = records.len(), "store opened");
        Ok(Self {
            lock_path: path.with_extension("lock"),
            path,
            feed: ChangeFeed::default(),
        })
    }

    fn snapshot(&self) -> Result<Records> {
        Ok(load_records(&self.path)?
            .into_iter()
            .map(|v| (v.id, v))
            .collect())
    }

    /// Run `operation` on the current records under the exclusive lock and
    /// persist the result. Nothing is written when `operation` fails.
    fn with_exclusive<T>(&self, operation: impl FnOnce(&mut Records) -> Result<T>) -> Result<T> {
        let lock_file = self.lock()?;
        let mut vaults = self.snapshot()?;
        let result = operation(&mut vaults)?;
        save_records(&self.path, &vaults)?;
        drop(lock_file);
        Ok(result)
    }

    fn lock(&self) -> Result<File> {
        let unavailable = |e: std::io::Error| {
            warn!(path = %self.lock_path.display(), error = %e, "store lock failed");
            TimevaultError::StoreUnavailable(format!("{}: {}", self.lock_path.display(), e))
        };
        if let Some(dir) = self.lock_path.parent() {
            fs::create_dir_all(dir).map_err(unavailable)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(unavailable)?;
        FileExt::lock_exclusive(&lock_file).map_err(unavailable)?;
        Ok(lock_file)
    }
}

fn load_records(path: &Path) -> Result<Vec<Vault>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path)
        .map_err(|e| TimevaultError::StoreUnavailable(format!("{}: {}", path.display(), e)))?;
    let file: StoreFile =
        rmp_serde::from_slice(&bytes).map_err(|e| TimevaultError::Serialization(e.to_string()))?;
    if file.version != FORMAT_VERSION {
        return Err(TimevaultError::Serialization(format!(
            "unsupported store format version {}",
            file.version
        )));
    }
    Ok(file.vaults)
}

/// Write to a temp file, then rename over the real one.
fn save_records(path: &Path, vaults: &Records) -> Result<()> {
    let mut records: Vec<Vault> = vaults.values().cloned().collect();
    records.sort_by_key(|v| v.id);
    let file = StoreFile {
        version: FORMAT_VERSION,
        vaults: records,
    };
    let bytes =
        rmp_serde::to_vec_named(&file).map_err(|e| TimevaultError::Serialization(e.to_string()))?;

    let unavailable = |e: std::io::Error| {
        warn!(path = %path.display(), error = %e, "store write failed");
        TimevaultError::StoreUnavailable(format!("{}: {}", path.display(), e))
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(unavailable)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &bytes).map_err(unavailable)?;
    fs::rename(&tmp_path, path).map_err(unavailable)?;
    Ok(())
}

#[async_trait]
impl VaultStore for FileStore {
    async fn create(&self, owner: &OwnerId, vault: Vault) -> Result<Vault> {
        let stored = self.with_exclusive(|vaults| records::insert(vaults, owner, vault))?;
        self.feed.notify(owner, stored.id, ChangeKind::Created);
        debug!(vault_id = %stored.id, "file store: created");
        Ok(stored)
    }

    async fn get(&self, owner: &OwnerId, id: VaultId) -> Result<Vault> {
        records::owned(&self.snapshot()?, owner, id).cloned()
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Vault>> {
        Ok(records::list(&self.snapshot()?, owner))
    }

    async fn conditional_update(
        &self,
        owner: &OwnerId,
        id: VaultId,
        expected: RevealStamps,
        next: RevealStamps,
    ) -> Result<Vault> {
        let updated = self.with_exclusive(|vaults| {
            records::compare_and_set(vaults, owner, id, expected, next)
        })?;
        self.feed.notify(owner, id, ChangeKind::Updated);
        debug!(vault_id = %id, revision = updated.revision, "file store: updated");
        Ok(updated)
    }

    async fn delete(&self, owner: &OwnerId, id: VaultId) -> Result<()> {
        self.with_exclusive(|vaults| records::remove(vaults, owner, id))?;
        self.feed.notify(owner, id, ChangeKind::Deleted);
        debug!(vault_id = %id, "file store: deleted");
        Ok(())
    }

    fn subscribe(&self, owner: &OwnerId) -> broadcast::Receiver<VaultChange> {
        self.feed.subscribe(owner)
    }
}
