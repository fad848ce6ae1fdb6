//! Durable sighting store.
//!
//! A dedicated OS thread owns the rusqlite `Connection` and drains an mpsc
//! command queue, so writes are FIFO and the async scan loop never touches
//! SQLite directly. FIFO ordering is what preserves per-digest write order
//! without any further coordination.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, ErrorCode};
use tokio::sync::oneshot;
use tokio::time::Duration;

mod migrations;

use crate::models::Sighting;
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    // Queued-but-not-yet-applied writes, for the shutdown abandoned count.
    pending: Arc<AtomicUsize>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn is_duplicate(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

const INSERT_SIGHTING_SQL: &str = "INSERT INTO sightings
     (seen_at, digest, address, address_kind, is_connectable, local_name,
      tx_power, service_uuids, manufacturer_data, rssi)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

/// Append one sighting. `Ok(false)` means the `(seen_at, digest)` pair
/// already exists, which is expected and benign.
fn insert_sighting_row(conn: &Connection, record: &Sighting) -> Result<bool> {
    let result = conn.execute(
        INSERT_SIGHTING_SQL,
        params![
            record.seen_at.to_rfc3339(),
            record.digest,
            record.address,
            record.address_kind.as_str(),
            record.is_connectable,
            record.local_name,
            record.tx_power,
            record.service_uuids,
            record.manufacturer_data,
            record.rssi,
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(err) if is_duplicate(&err) => Ok(false),
        Err(err) => Err(anyhow::Error::new(err).context("failed to insert sighting")),
    }
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    /// Open (or create) the store and run migrations. This is the only
    /// load-bearing startup step: failure here is fatal to the process,
    /// since the scanner has no purpose without durable output.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("footfall-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                // WAL so the statistics tooling can read while we write.
                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
                pending: Arc::new(AtomicUsize::new(0)),
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

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Fire-and-forget append, the scan loop's write path. Queues the write
    /// and returns immediately so a slow disk never stalls event intake.
    /// Duplicate `(seen_at, digest)` rows are dropped at debug level; any
    /// other write failure is logged and that one record is lost.
    pub fn record_sighting(&self, record: Sighting) {
        let pending = Arc::clone(&self.inner.pending);
        pending.fetch_add(1, Ordering::SeqCst);

        let command = DbCommand::Execute(Box::new(move |conn| {
            match insert_sighting_row(conn, &record) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        "duplicate sighting ({}, {}) dropped",
                        record.seen_at.to_rfc3339(),
                        record.digest
                    );
                }
                Err(err) => {
                    warn!("failed to persist sighting {}: {err:?}", record.digest);
                }
            }
            pending.fetch_sub(1, Ordering::SeqCst);
        }));

        if self.inner.sender.send(command).is_err() {
            self.inner.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("database thread gone; sighting dropped");
        }
    }

    /// Awaited insert. Returns whether a row actually landed (`false` for
    /// the benign duplicate case).
    pub async fn insert_sighting(&self, record: &Sighting) -> Result<bool> {
        let record = record.clone();
        self.execute(move |conn| insert_sighting_row(conn, &record))
            .await
    }

    pub async fn count_sightings(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM sightings", [], |row| row.get(0))
                .context("failed to count sightings")?;
            Ok(count as u64)
        })
        .await
    }

    pub async fn latest_sighting_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.execute(|conn| {
            let latest: Option<String> = conn
                .query_row("SELECT MAX(seen_at) FROM sightings", [], |row| row.get(0))
                .context("failed to read latest sighting")?;
            latest
                .map(|value| {
                    DateTime::parse_from_rfc3339(&value)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
                })
                .transpose()
        })
        .await
    }

    /// Drain queued writes and stop the worker thread, waiting at most
    /// `grace`. Writes still queued when the grace period expires are
    /// abandoned with a logged count.
    pub async fn close(&self, grace: Duration) {
        let handle = {
            let mut guard = match self.inner.worker.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take()
        };

        let Some(handle) = handle else {
            return;
        };

        // Shutdown lands behind every queued write, so a successful join
        // implies a full drain.
        if self.inner.sender.send(DbCommand::Shutdown).is_err() {
            error!("Failed to send shutdown to DB thread");
            return;
        }

        let join = tokio::task::spawn_blocking(move || handle.join());
        match tokio::time::timeout(grace, join).await {
            Ok(Ok(Ok(()))) => info!("Database closed cleanly"),
            Ok(Ok(Err(join_err))) => error!("Failed to join DB thread: {join_err:?}"),
            Ok(Err(err)) => error!("DB join task failed: {err}"),
            Err(_) => {
                let abandoned = self.inner.pending.load(Ordering::SeqCst);
                warn!(
                    "database drain exceeded {}s grace period; abandoning {} queued write(s)",
                    grace.as_secs(),
                    abandoned
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressKind, Advertisement, Sighting};

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("footfall-db-{}.sqlite3", uuid::Uuid::new_v4()))
    }

    fn sighting(seen_at: &str, digest: &str) -> Sighting {
        let adv = Advertisement {
            address: "AA:BB:CC:DD:EE:FF".into(),
            address_kind: AddressKind::Public,
            is_connectable: true,
            local_name: Some("iPhone".into()),
            tx_power: None,
            service_uuids: vec!["180f".into()],
            manufacturer_data: Some(vec![0x4c, 0x00]),
            rssi: -58,
            source_id: "peer-1".into(),
        };
        Sighting::from_advertisement(seen_at.parse().unwrap(), digest.into(), &adv)
    }

    #[tokio::test]
    async fn insert_and_count() {
        let path = temp_db();
        let db = Database::new(path.clone()).unwrap();

        assert!(db
            .insert_sighting(&sighting("2026-08-26T10:00:00Z", "d1"))
            .await
            .unwrap());
        assert_eq!(db.count_sightings().await.unwrap(), 1);

        db.close(Duration::from_secs(5)).await;
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn duplicate_pair_is_benign_and_leaves_one_row() {
        let path = temp_db();
        let db = Database::new(path.clone()).unwrap();

        let record = sighting("2026-08-26T10:00:00Z", "d1");
        assert!(db.insert_sighting(&record).await.unwrap());
        assert!(!db.insert_sighting(&record).await.unwrap());
        assert_eq!(db.count_sightings().await.unwrap(), 1);

        db.close(Duration::from_secs(5)).await;
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn same_digest_different_timestamp_is_a_new_row() {
        let path = temp_db();
        let db = Database::new(path.clone()).unwrap();

        assert!(db
            .insert_sighting(&sighting("2026-08-26T10:00:00Z", "d1"))
            .await
            .unwrap());
        assert!(db
            .insert_sighting(&sighting("2026-08-26T10:30:00Z", "d1"))
            .await
            .unwrap());
        assert_eq!(db.count_sightings().await.unwrap(), 2);

        db.close(Duration::from_secs(5)).await;
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn schema_survives_reopen() {
        let path = temp_db();
        {
            let db = Database::new(path.clone()).unwrap();
            db.insert_sighting(&sighting("2026-08-26T10:00:00Z", "d1"))
                .await
                .unwrap();
            db.close(Duration::from_secs(5)).await;
        }

        let db = Database::new(path.clone()).unwrap();
        assert_eq!(db.count_sightings().await.unwrap(), 1);
        assert_eq!(
            db.latest_sighting_at().await.unwrap().unwrap(),
            "2026-08-26T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        db.close(Duration::from_secs(5)).await;
        std::fs::remove_file(path).ok();
    }
}
