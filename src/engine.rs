//! Engine Module
//!
//! The single-writer actor that owns the record store.
//!
//! ## Responsibilities
//! - Load the snapshot on startup
//! - Serialize every read and write through one worker thread
//! - Rewrite the snapshot after every write, before acknowledging it
//! - Drain queued requests on shutdown

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::config::{Config, DumpStrategy};
use crate::error::{Result, SnapError};
use crate::persist;
use crate::store::{ReadQuery, RecordStore, Records, WriteBatch};

/// Message sent to the worker. Each carries its own one-shot reply channel.
enum Request {
    Read {
        query: ReadQuery,
        reply: Sender<Result<Records>>,
    },
    Write {
        batch: WriteBatch,
        reply: Sender<()>,
    },
}

/// Handle to the storage engine
///
/// ## Concurrency Model: Single-Writer Actor
///
/// - One worker thread owns the `RecordStore` by value. Nothing else can
///   reach it, so no lock guards it.
/// - Callers (any number of threads, typically one per HTTP connection)
///   push `Request`s into one bounded mailbox and block on a reply channel.
/// - The worker handles exactly one request at a time:
///   dequeue → apply or read → (dump) → reply → dequeue next.
///   A reader therefore sees either the state before a batch or after it,
///   never a mix.
/// - Order is the mailbox's FIFO order; reads and writes share one queue, so
///   neither kind can starve the other.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Mailbox producer side; `None` once shut down
    sender: Option<Sender<Request>>,

    /// Worker thread; `None` once joined
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    const WORKER_THREAD_NAME: &'static str = "snapkv-engine";

    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Load the snapshot (empty if missing or invalid)
    /// 2. Spawn the worker thread that owns the loaded state
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Load previous state
        let records = persist::load(&config.database_path);
        let store = RecordStore::from_records(records);

        // Step 2: Start the worker
        let (sender, inbox) = channel::bounded(config.mailbox_capacity.max(1));
        let worker = Worker {
            store,
            database_path: config.database_path.clone(),
            dump_strategy: config.dump_strategy,
            inbox,
        };

        let handle = thread::Builder::new()
            .name(Self::WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())?;

        tracing::debug!(
            "Engine worker started (snapshot: {}, mailbox: {})",
            config.database_path.display(),
            config.mailbox_capacity
        );

        Ok(Self {
            config,
            sender: Some(sender),
            worker: Some(handle),
        })
    }

    /// Open with a snapshot path (convenience method)
    ///
    /// Uses default config with the specified database file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().database_path(path).build();
        Self::open(config)
    }

    /// Merge a batch into the store.
    ///
    /// Returns once the batch is applied and the snapshot rewrite has been
    /// attempted. A failed rewrite is logged by the worker, not returned.
    pub fn submit_write(&self, batch: WriteBatch) -> Result<()> {
        let (reply, ack) = channel::bounded(1);
        self.send(Request::Write { batch, reply })?;
        self.wait(&ack)
    }

    /// Read from the store.
    ///
    /// The returned mapping is a copy; mutating it never affects the engine.
    pub fn submit_read(&self, query: ReadQuery) -> Result<Records> {
        let (reply, result) = channel::bounded(1);
        self.send(Request::Read { query, reply })?;
        self.wait(&result)?
    }

    /// Copy of the whole store
    pub fn snapshot(&self) -> Result<Records> {
        self.submit_read(ReadQuery::All)
    }

    /// Value for `key`; absent keys read as the empty string
    pub fn get(&self, key: &str) -> Result<String> {
        let mut records = self.submit_read(ReadQuery::Key(key.to_string()))?;
        Ok(records.remove(key).unwrap_or_default())
    }

    /// Write a single key-value pair
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.submit_write(WriteBatch::from([(key.to_string(), value.to_string())]))
    }

    /// Close the engine gracefully
    ///
    /// Stops accepting requests, lets the worker finish everything already
    /// queued (including the last dump), then joins it.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        // Dropping the only sender disconnects the mailbox once it is empty
        self.sender.take();

        if let Some(handle) = self.worker.take() {
            handle.join().map_err(|_| SnapError::EngineClosed)?;
            tracing::debug!("Engine worker stopped");
        }

        Ok(())
    }

    fn send(&self, request: Request) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(SnapError::EngineClosed)?;

        match self.config.request_timeout {
            Some(timeout) => sender.send_timeout(request, timeout).map_err(|e| match e {
                SendTimeoutError::Timeout(_) => timeout_error(timeout),
                SendTimeoutError::Disconnected(_) => SnapError::EngineClosed,
            }),
            None => sender.send(request).map_err(|_| SnapError::EngineClosed),
        }
    }

    fn wait<T>(&self, reply: &Receiver<T>) -> Result<T> {
        match self.config.request_timeout {
            Some(timeout) => reply.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => timeout_error(timeout),
                RecvTimeoutError::Disconnected => SnapError::EngineClosed,
            }),
            None => reply.recv().map_err(|_| SnapError::EngineClosed),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the snapshot file path
    pub fn database_path(&self) -> &Path {
        &self.config.database_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Engine shutdown failed: {}", e);
        }
    }
}

fn timeout_error(timeout: Duration) -> SnapError {
    SnapError::Timeout(timeout.as_millis() as u64)
}

/// State owned by the worker thread
struct Worker {
    store: RecordStore,
    database_path: PathBuf,
    dump_strategy: DumpStrategy,
    inbox: Receiver<Request>,
}

impl Worker {
    /// Process requests until every sender is gone and the mailbox is empty
    fn run(mut self) {
        while let Ok(request) = self.inbox.recv() {
            self.handle(request);
        }
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Read { query, reply } => {
                let result = self.store.read(&query);
                if reply.send(result).is_err() {
                    tracing::debug!("Reader gave up before reply ({:?})", query);
                }
            }
            Request::Write { batch, reply } => {
                let batch_len = batch.len();
                self.store.apply(batch);

                tracing::debug!(
                    "dump database to {} ({} keys written, {} total)",
                    self.database_path.display(),
                    batch_len,
                    self.store.len()
                );
                if let Err(e) = persist::dump(&self.database_path, self.store.records(), self.dump_strategy) {
                    tracing::warn!(
                        "Failed to dump database to {}: {}",
                        self.database_path.display(),
                        e
                    );
                }

                if reply.send(()).is_err() {
                    tracing::debug!("Writer gave up before acknowledgment");
                }
            }
        }
    }
}
