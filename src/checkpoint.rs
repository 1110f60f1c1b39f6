//! Checkpoint persistence across a fast tier and a durable tier.
//!
//! The last synced [`Position`] is written to Redis (fast) and to a local
//! file (durable). On startup the fast tier is consulted first; any miss,
//! outage or undecodable value falls through to the file, and if that fails
//! too replication starts from [`Position::bootstrap`].
//!
//! Neither [`CheckpointStore::save`] nor [`CheckpointStore::load`] ever
//! returns an error: tier failures are logged and the worst case is a
//! restart from the beginning of the available log.
//!
//! # Example
//!
//! ```rust,no_run
//! use binlog_relay::binlog::Position;
//! use binlog_relay::checkpoint::{CheckpointStore, FileTier};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = CheckpointStore::new(None, Box::new(FileTier::new("binlog_position.json")));
//!
//!     let start = store.load().await;
//!     println!("Resuming from {}", start);
//!
//!     store.save(&Position::new("bin.000003", 157)).await;
//! }
//! ```

use async_trait::async_trait;
use redis::AsyncCommands;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::backend::RedisBackend;
use crate::binlog::Position;
use crate::config::Config;
use crate::Result;

/// One storage tier for the checkpoint position.
#[async_trait]
pub trait PositionTier: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Reads the stored position. `Ok(None)` means nothing has been stored.
    async fn read(&self) -> Result<Option<Position>>;

    async fn write(&self, position: &Position) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Fast tier: the encoded position under a fixed Redis key.
pub struct RedisTier {
    backend: RedisBackend,
    key: String,
}

impl RedisTier {
    pub fn new(backend: RedisBackend, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }
}

#[async_trait]
impl PositionTier for RedisTier {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn read(&self) -> Result<Option<Position>> {
        let mut conn = self.backend.connection().await?;
        let data: Option<String> = conn.get(&self.key).await?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, position: &Position) -> Result<()> {
        let data = serde_json::to_string(position)?;
        let mut conn = self.backend.connection().await?;
        conn.set::<_, _, ()>(&self.key, data).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.backend.connection().await?;
        conn.del::<_, ()>(&self.key).await?;
        Ok(())
    }
}

/// Durable tier: the encoded position as the full content of a file.
///
/// Writes go to a temporary sibling, are synced, then renamed over the
/// target so the file is never observed half written.
pub struct FileTier {
    file_path: PathBuf,
}

impl FileTier {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

#[async_trait]
impl PositionTier for FileTier {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self) -> Result<Option<Position>> {
        match fs::read_to_string(&self.file_path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, position: &Position) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.file_path.with_extension("tmp");
        let json = serde_json::to_vec(position)?;
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.file_path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Owns persistence of the last synced position.
///
/// There is a single writer (the log-source callback path) and `load` runs
/// once before that writer starts.
pub struct CheckpointStore {
    fast: Option<Box<dyn PositionTier>>,
    durable: Box<dyn PositionTier>,
    last_saved: Mutex<Option<Position>>,
}

impl CheckpointStore {
    pub fn new(fast: Option<Box<dyn PositionTier>>, durable: Box<dyn PositionTier>) -> Self {
        Self {
            fast,
            durable,
            last_saved: Mutex::new(None),
        }
    }

    /// Redis fast tier plus file durable tier, as described by `config`.
    pub fn from_config(config: &Config, backend: &RedisBackend) -> Self {
        Self::new(
            Some(Box::new(RedisTier::new(backend.clone(), &config.checkpoint.redis_key))),
            Box::new(FileTier::new(&config.checkpoint.file_path)),
        )
    }

    /// Writes `position` to both tiers, each best-effort and independent of
    /// the other.
    ///
    /// A position behind the last saved one within the same log file is
    /// ignored.
    pub async fn save(&self, position: &Position) {
        let mut last_saved = self.last_saved.lock().await;
        if let Some(last) = last_saved.as_ref() {
            if last.name == position.name && position.pos < last.pos {
                debug!(last = %last, position = %position, "Ignoring backwards checkpoint");
                return;
            }
        }

        if let Some(fast) = &self.fast {
            match fast.write(position).await {
                Ok(()) => trace!(tier = fast.name(), position = %position, "Saved position"),
                Err(e) => error!(tier = fast.name(), error = %e, "Error saving position"),
            }
        }

        match self.durable.write(position).await {
            Ok(()) => trace!(tier = self.durable.name(), position = %position, "Saved position"),
            Err(e) => error!(tier = self.durable.name(), error = %e, "Error saving position"),
        }

        *last_saved = Some(position.clone());
    }

    /// Returns the position to resume from.
    pub async fn load(&self) -> Position {
        if let Some(fast) = &self.fast {
            match fast.read().await {
                Ok(Some(position)) => {
                    info!(tier = fast.name(), position = %position, "Loaded position");
                    return self.remember(position).await;
                }
                Ok(None) => warn!(tier = fast.name(), "No position stored, falling back"),
                Err(e) => {
                    warn!(tier = fast.name(), error = %e, "Position unavailable, falling back")
                }
            }
        }

        match self.durable.read().await {
            Ok(Some(position)) => {
                info!(tier = self.durable.name(), position = %position, "Loaded position");
                self.remember(position).await
            }
            Ok(None) => {
                warn!("No saved position found, starting from scratch");
                Position::bootstrap()
            }
            Err(e) => {
                error!(tier = self.durable.name(), error = %e, "Error loading position");
                Position::bootstrap()
            }
        }
    }

    /// Removes the stored position from both tiers.
    pub async fn delete(&self) -> Result<()> {
        if let Some(fast) = &self.fast {
            if let Err(e) = fast.clear().await {
                warn!(tier = fast.name(), error = %e, "Error clearing position");
            }
        }
        self.durable.clear().await?;
        *self.last_saved.lock().await = None;
        info!("Deleted checkpoint");
        Ok(())
    }

    async fn remember(&self, position: Position) -> Position {
        *self.last_saved.lock().await = Some(position.clone());
        position
    }
}
