//! Connection Module
//!
//! Public API over one data file, plus the advisory lock protocol.
//!
//! ## Transaction Envelope
//! ```text
//!   begin(target)                      mutating call (no block open)
//!     │                                  │
//!     ▼                                  ▼
//!   acquire lock row  ──(exclusive store, short)──  acquire lock row
//!     │                                  │
//!     ▼                                  ▼
//!   open shared session                open shared session
//!     │                                  │
//!   CRUD calls (lock reused)           one CRUD call
//!     │                                  │
//!     ▼                                  ▼
//!   end(): commit + release            commit (or discard on error) + release
//! ```
//!
//! Lock rows live in the hidden table `locks_table` of the private database
//! `txn_db`, inside the data file itself. Every connection holds at most one
//! lock row at a time; nested calls that fall inside it reuse it.

mod lock;

pub use lock::{short_id, ConnectionLock, LockLevel, LockTarget};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{FlatError, Result};
use crate::functions;
use crate::schema::{DatabaseDef, Field, Record, StoreLocation, TableDef, Value};
use crate::store::{LineStore, PollTiming};

/// Private database holding the lock table
pub const TXN_DB: &str = "txn_db";

/// Hidden table holding one row per active lock
pub const LOCKS_TABLE: &str = "locks_table";

/// Per-connection transaction state
#[derive(Default)]
struct Session {
    /// Shared (non-exclusive) store of the running transaction
    store: Option<LineStore>,
    /// An explicit `begin` is open
    block: bool,
    closed: bool,
}

/// A connection to one data file
///
/// Any number of connections (in this or other processes) may be open on the
/// same file. Calls on one connection are serialized.
pub struct Connection {
    config: Config,
    location: StoreLocation,
    timing: PollTiming,
    id: String,
    session: Mutex<Session>,
}

impl Connection {
    /// Open a connection, initializing the data file if it is empty
    ///
    /// On open:
    /// 1. Create the data file if missing
    /// 2. Check (or write) the store header
    /// 3. Ensure the private lock database and table exist
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let location = config.location();
        let timing = PollTiming::from_config(&config);

        let mut store = LineStore::open(&location, timing, true)?;
        let prepared = prepare_store(&mut store);
        finish(store, prepared)?;

        let connection = Self {
            config,
            location,
            timing,
            id: short_id(),
            session: Mutex::new(Session::default()),
        };
        info!(
            path = %connection.location.path().display(),
            connection = %connection.id,
            "connection opened"
        );
        Ok(connection)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `source:requester:id`, the owner recorded in lock rows
    pub fn signature(&self) -> String {
        format!("{}:{}:{}", self.config.source, self.config.requester, self.id)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Block Transactions
    // =========================================================================

    /// Lock a database and keep one session open until [`Connection::end`]
    pub fn begin(&self, db_name: &str) -> Result<()> {
        self.begin_block(LockTarget::database(db_name))
    }

    /// Lock a table and keep one session open until [`Connection::end`]
    pub fn begin_table(&self, db_name: &str, table_name: &str) -> Result<()> {
        self.begin_block(LockTarget::table(db_name, table_name))
    }

    /// Lock a record and keep one session open until [`Connection::end`]
    pub fn begin_record(&self, db_name: &str, table_name: &str, key: impl Into<Value>) -> Result<()> {
        self.begin_block(LockTarget::record(db_name, table_name, &key.into()))
    }

    /// Commit the open block and release this connection's locks
    pub fn end(&self) -> Result<()> {
        let mut session = self.session.lock();
        session.block = false;
        self.txn_end(&mut session, true)
    }

    /// True while a block opened by `begin*` is running
    pub fn in_block(&self) -> bool {
        self.session.lock().block
    }

    // =========================================================================
    // Store
    // =========================================================================

    pub fn read_store_location(&self) -> Result<StoreLocation> {
        self.read(functions::read_store_location)
    }

    // =========================================================================
    // Databases
    // =========================================================================

    pub fn create_database(&self, db_name: &str, description: &str) -> Result<()> {
        ensure_public(db_name)?;
        let db = DatabaseDef::new(db_name).with_description(description);
        self.transact(LockTarget::database(db_name), |store| {
            functions::create_database(store, &db)
        })
    }

    pub fn read_all_databases(&self) -> Result<Vec<DatabaseDef>> {
        self.read(|store| Ok(functions::read_all_databases(store)))
    }

    pub fn read_database(&self, db_name: &str) -> Result<DatabaseDef> {
        self.read(|store| functions::read_database(store, db_name))
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub fn create_table(&self, db_name: &str, table: &TableDef) -> Result<()> {
        ensure_public(db_name)?;
        self.transact(LockTarget::table(db_name, &table.name), |store| {
            functions::create_table(store, db_name, table)
        })
    }

    pub fn read_all_tables(&self, db_name: &str) -> Result<Vec<TableDef>> {
        self.read(|store| functions::read_all_tables(store, db_name))
    }

    pub fn read_table(&self, db_name: &str, table_name: &str) -> Result<TableDef> {
        self.read(|store| functions::read_table(store, db_name, table_name))
    }

    // =========================================================================
    // Records
    // =========================================================================

    pub fn insert_record(
        &self,
        db_name: &str,
        table_name: &str,
        key: impl Into<Value>,
        fields: Record,
    ) -> Result<()> {
        ensure_public(db_name)?;
        let key = key.into();
        self.transact(LockTarget::record(db_name, table_name, &key), |store| {
            functions::insert_record(store, db_name, table_name, &key, fields)
        })
    }

    pub fn read_all_records(&self, db_name: &str, table_name: &str) -> Result<Vec<Record>> {
        self.read(|store| functions::read_all_records(store, db_name, table_name))
    }

    pub fn read_record(&self, db_name: &str, table_name: &str, key: impl Into<Value>) -> Result<Record> {
        let key = key.into();
        self.read(|store| functions::read_record(store, db_name, table_name, &key))
    }

    pub fn update_record(
        &self,
        db_name: &str,
        table_name: &str,
        key: impl Into<Value>,
        changes: Record,
    ) -> Result<()> {
        ensure_public(db_name)?;
        let key = key.into();
        self.transact(LockTarget::record(db_name, table_name, &key), |store| {
            functions::update_record(store, db_name, table_name, &key, changes)
        })
    }

    pub fn drop_record(&self, db_name: &str, table_name: &str, key: impl Into<Value>) -> Result<()> {
        ensure_public(db_name)?;
        let key = key.into();
        self.transact(LockTarget::record(db_name, table_name, &key), |store| {
            functions::drop_record(store, db_name, table_name, &key)
        })
    }

    /// Drop every record of a table under a table lock
    pub fn drop_records(&self, db_name: &str, table_name: &str) -> Result<usize> {
        ensure_public(db_name)?;
        self.transact(LockTarget::table(db_name, table_name), |store| {
            functions::drop_records(store, db_name, table_name)
        })
    }

    // =========================================================================
    // Locks
    // =========================================================================

    /// Every registered lock row, from every connection
    pub fn read_locks(&self) -> Result<Vec<ConnectionLock>> {
        let store = LineStore::open(&self.location, self.timing, false)?;
        let locks = read_lock_rows(&store);
        finish(store, locks)
    }

    /// Remove every lock row regardless of owner
    ///
    /// For recovery after a process died while holding locks.
    pub fn purge_locks(&self) -> Result<usize> {
        let mut store = LineStore::open(&self.location, self.timing, true)?;
        let purged = functions::drop_records(&mut store, TXN_DB, LOCKS_TABLE);
        let purged = finish(store, purged)?;
        warn!(purged, "purged lock rows");
        Ok(purged)
    }

    /// Discard any open block and release this connection's locks
    pub fn close(self) -> Result<()> {
        let pending = {
            let mut session = self.session.lock();
            session.closed = true;
            session.block = false;
            session.store.take()
        };
        if let Some(store) = pending {
            discard_pending(store)?;
        }
        self.release_locks()
    }

    // =========================================================================
    // Internal: Transactions
    // =========================================================================

    fn begin_block(&self, target: LockTarget) -> Result<()> {
        if let Some(db_name) = &target.database {
            ensure_public(db_name)?;
        }

        let mut session = self.session.lock();
        let was_block = session.block;
        let begun = self.txn_begin(&mut session, target);
        match begun {
            Ok(()) => {
                session.block = true;
                Ok(())
            }
            Err(e) => {
                if !was_block {
                    if let Err(release) = self.release_locks() {
                        warn!(error = %release, "lock release after failed begin failed");
                    }
                }
                Err(e)
            }
        }
    }

    /// Run one mutating call inside the envelope
    ///
    /// Outside a block the session is committed (or discarded on error) and
    /// the locks released before returning.
    fn transact<T>(&self, target: LockTarget, op: impl FnOnce(&mut LineStore) -> Result<T>) -> Result<T> {
        let mut session = self.session.lock();

        let outcome = self
            .txn_begin(&mut session, target)
            .and_then(|()| active_store(&mut session).and_then(op));
        let ended = self.txn_end(&mut session, outcome.is_ok());

        match (outcome, ended) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
        }
    }

    fn txn_begin(&self, session: &mut Session, target: LockTarget) -> Result<()> {
        debug!(connection = %self.id, target = %target, block = session.block, "txn begin");
        self.acquire_lock(target)?;

        if session.store.is_none() {
            session.store = Some(LineStore::open(&self.location, self.timing, false)?);
        }
        Ok(())
    }

    fn txn_end(&self, session: &mut Session, commit: bool) -> Result<()> {
        if session.block {
            return Ok(());
        }
        debug!(connection = %self.id, commit, "txn end");

        let finished = match session.store.take() {
            Some(store) if commit => store.commit(),
            Some(store) => store.discard(),
            None => Ok(()),
        };
        let released = self.release_locks();
        finished.and(released)
    }

    /// Read through the open block session, or a fresh shared session
    fn read<T>(&self, op: impl FnOnce(&LineStore) -> Result<T>) -> Result<T> {
        {
            let session = self.session.lock();
            if let Some(store) = &session.store {
                return op(store);
            }
        }
        let store = LineStore::open(&self.location, self.timing, false)?;
        let result = op(&store);
        finish(store, result)
    }

    // =========================================================================
    // Internal: Lock Rows
    // =========================================================================

    fn acquire_lock(&self, target: LockTarget) -> Result<()> {
        let requested = ConnectionLock::new(
            self.config.source.as_str(),
            self.config.requester.as_str(),
            self.id.as_str(),
            target,
        );

        let mut store = LineStore::open(&self.location, self.timing, true)?;
        let registered = self.register_lock(&mut store, &requested);
        finish(store, registered)
    }

    fn register_lock(&self, store: &mut LineStore, requested: &ConnectionLock) -> Result<()> {
        let signature = self.signature();
        let mut reused: Option<ConnectionLock> = None;

        for existing in read_lock_rows(store)? {
            if requested.is_restricted_by(&existing) {
                if existing.belongs_to(&signature) && existing.level() <= requested.level() {
                    reused = Some(existing);
                    continue;
                }
                warn!(requested = %requested, existing = %existing, "access restricted");
                return Err(FlatError::AccessRestricted {
                    requested: Box::new(requested.clone()),
                    existing: Box::new(existing),
                });
            }
            if existing.belongs_to(&signature) {
                warn!(requested = %requested, existing = %existing, "access restricted by own lock");
                return Err(FlatError::AccessRestrictedByExistingLock {
                    requested: Box::new(requested.clone()),
                    existing: Box::new(existing),
                });
            }
        }

        match reused {
            Some(lock) => {
                debug!(lock = %lock, "reuse lock");
                Ok(())
            }
            None => {
                debug!(lock = %requested, "+lock row");
                functions::insert_record(
                    store,
                    TXN_DB,
                    LOCKS_TABLE,
                    &Value::from(&requested.id),
                    requested.to_record(),
                )
            }
        }
    }

    fn release_locks(&self) -> Result<()> {
        let signature = self.signature();
        let mut store = LineStore::open(&self.location, self.timing, true)?;

        let released = read_lock_rows(&store).and_then(|locks| {
            for lock in locks.iter().filter(|lock| lock.belongs_to(&signature)) {
                debug!(lock = %lock, "-lock row");
                functions::drop_record(&mut store, TXN_DB, LOCKS_TABLE, &Value::from(&lock.id))?;
            }
            Ok(())
        });
        finish(store, released)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        if session.closed {
            return;
        }
        session.block = false;
        if let Some(store) = session.store.take() {
            if let Err(e) = discard_pending(store) {
                error!(connection = %self.id, error = %e, "failed to discard open session");
            }
        }
        if let Err(e) = self.release_locks() {
            error!(connection = %self.id, error = %e, "failed to release locks on drop");
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Table definition of the lock rows
pub fn locks_table() -> TableDef {
    TableDef::new(LOCKS_TABLE)
        .with_description("Locks Table")
        .hidden(true)
        .with_fields([
            Field::uuid(ConnectionLock::ID),
            Field::text(ConnectionLock::SOURCE),
            Field::text(ConnectionLock::REQUESTER),
            Field::uuid(ConnectionLock::CONNECTION),
            Field::text(ConnectionLock::DATABASE),
            Field::text(ConnectionLock::TABLE),
            Field::text(ConnectionLock::RECORD_KEY),
        ])
}

/// Header check plus private lock database setup, in one exclusive session
fn prepare_store(store: &mut LineStore) -> Result<()> {
    functions::create_store(store)?;

    match functions::read_database(store, TXN_DB) {
        Ok(_) => {}
        Err(e) if e.is_integrity() => {
            let db = DatabaseDef::new(TXN_DB).with_description("Internal DB");
            functions::create_database(store, &db)?;
        }
        Err(e) => return Err(e),
    }

    match functions::read_table(store, TXN_DB, LOCKS_TABLE) {
        Ok(_) => Ok(()),
        Err(e) if e.is_integrity() => functions::create_table(store, TXN_DB, &locks_table()),
        Err(e) => Err(e),
    }
}

fn read_lock_rows(store: &LineStore) -> Result<Vec<ConnectionLock>> {
    let rows = functions::read_all_records(store, TXN_DB, LOCKS_TABLE).map_err(|e| {
        if e.is_integrity() {
            FlatError::Integrity("Transaction database has not been configured.".to_string())
        } else {
            e
        }
    })?;
    rows.iter().map(ConnectionLock::from_record).collect()
}

fn ensure_public(db_name: &str) -> Result<()> {
    if db_name == TXN_DB {
        return Err(FlatError::Integrity("Can not access private database.".to_string()));
    }
    Ok(())
}

fn active_store(session: &mut Session) -> Result<&mut LineStore> {
    session
        .store
        .as_mut()
        .ok_or_else(|| FlatError::Integrity("No active transaction.".to_string()))
}

/// Commit on success, discard on failure
fn finish<T>(store: LineStore, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => store.commit().map(|()| value),
        Err(e) => {
            if let Err(discard) = store.discard() {
                warn!(error = %discard, "discard after failure failed");
            }
            Err(e)
        }
    }
}

fn discard_pending(store: LineStore) -> Result<()> {
    if store.is_modified() {
        warn!(path = %store.location().path().display(), "discarding uncommitted block transaction");
    }
    store.discard()
}
