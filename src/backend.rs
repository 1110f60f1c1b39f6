//! Lazily established Redis connection shared by the fast checkpoint tier
//! and the delivery queue.
//!
//! A failed connect is remembered for `retry_interval`; callers asking for a
//! connection inside that window get an immediate [`Error::Connection`]
//! instead of waiting on another connect attempt. Once established, the
//! [`ConnectionManager`] reconnects on its own.

use redis::aio::ConnectionManager;
use redis::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{Error, Result};

const CONNECT_BACKOFF_BASE: u64 = 2;
const CONNECT_BACKOFF_FACTOR_MS: u64 = 100;
const CONNECT_RETRIES: usize = 1;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct ConnectionState {
    manager: Option<ConnectionManager>,
    last_failure: Option<Instant>,
}

#[derive(Clone)]
pub struct RedisBackend {
    client: Client,
    retry_interval: Duration,
    connect_timeout: Duration,
    state: Arc<Mutex<ConnectionState>>,
}

impl RedisBackend {
    /// Parses `url` without touching the network.
    pub fn open(url: &str, retry_interval: Duration) -> Result<Self> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            retry_interval,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: Arc::new(Mutex::new(ConnectionState::default())),
        })
    }

    /// Same server, separate connection. Used by consumers that issue
    /// blocking commands.
    pub fn dedicated(&self) -> Self {
        Self {
            client: self.client.clone(),
            retry_interval: self.retry_interval,
            connect_timeout: self.connect_timeout,
            state: Arc::new(Mutex::new(ConnectionState::default())),
        }
    }

    /// Upper bound on a single connect attempt. Callers wait at most this
    /// long for an unreachable server.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Returns a handle to the shared connection, connecting first if needed.
    pub async fn connection(&self) -> Result<ConnectionManager> {
        let mut state = self.state.lock().await;
        if let Some(manager) = state.manager.as_ref() {
            return Ok(manager.clone());
        }

        if let Some(failed_at) = state.last_failure {
            if failed_at.elapsed() < self.retry_interval {
                return Err(Error::Connection("Redis unavailable".to_string()));
            }
        }

        let connect = ConnectionManager::new_with_backoff(
            self.client.clone(),
            CONNECT_BACKOFF_BASE,
            CONNECT_BACKOFF_FACTOR_MS,
            CONNECT_RETRIES,
        );
        let outcome = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(manager)) => Ok(manager),
            Ok(Err(e)) => Err(Error::Redis(e)),
            Err(_) => Err(Error::Connection(format!(
                "Redis connect timed out after {:?}",
                self.connect_timeout
            ))),
        };

        match outcome {
            Ok(manager) => {
                info!("Connected to Redis");
                state.last_failure = None;
                state.manager = Some(manager.clone());
                Ok(manager)
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis");
                state.last_failure = Some(Instant::now());
                Err(e)
            }
        }
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
