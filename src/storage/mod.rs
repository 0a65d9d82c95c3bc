//! Durable key-value storage over SQLite.
//!
//! All database work happens on one dedicated worker thread; callers send
//! closures over a channel and await the reply, so the async side never
//! blocks on disk. The splits history and the outline document each live
//! under a well-known key.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

/// Key the latest canonical history snapshot is stored under.
const HISTORY_STATE_KEY: &str = "lastTimeStampHistoryState";

/// Key the outline document text is stored under.
const OUTLINE_DOC_KEY: &str = "lastShowDoc";

type StorageTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StorageCommand {
    Execute(StorageTask),
    Shutdown,
}

struct StorageInner {
    sender: mpsc::Sender<StorageCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StorageInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StorageCommand::Shutdown) {
                error!("Failed to send shutdown to storage thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join storage thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
    db_path: Arc<PathBuf>,
}

impl Storage {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create storage directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StorageCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("splitlog-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Storage initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StorageCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        StorageCommand::Shutdown => break,
                    }
                }

                info!("Storage thread shutting down");
            })
            .with_context(|| "failed to spawn storage worker thread")?;

        ready_rx
            .recv()
            .context("storage worker exited before signaling readiness")??;

        info!("Storage initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(StorageInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StorageCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Storage caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to storage thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("storage thread terminated unexpectedly"))?
    }

    async fn set_value(&self, key: &'static str, value: String, updated_at: DateTime<Utc>) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO app_state (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, updated_at.to_rfc3339()],
            )
            .with_context(|| format!("failed to write {key}"))?;
            Ok(())
        })
        .await
    }

    async fn get_value(&self, key: &'static str) -> Result<Option<String>> {
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read {key}"))
        })
        .await
    }

    /// Persist the latest canonical history snapshot so the next session can
    /// resume from it.
    pub async fn save_history_state(&self, state: &str, updated_at: DateTime<Utc>) -> Result<()> {
        self.set_value(HISTORY_STATE_KEY, state.to_string(), updated_at)
            .await
    }

    pub async fn load_history_state(&self) -> Result<Option<String>> {
        self.get_value(HISTORY_STATE_KEY).await
    }

    /// Persist the outline document text.
    pub async fn save_outline_doc(&self, text: &str, updated_at: DateTime<Utc>) -> Result<()> {
        self.set_value(OUTLINE_DOC_KEY, text.to_string(), updated_at)
            .await
    }

    pub async fn load_outline_doc(&self) -> Result<Option<String>> {
        self.get_value(OUTLINE_DOC_KEY).await
    }
}
