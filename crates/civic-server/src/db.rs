//! Async access to the synchronous store.
//!
//! Requests run their store work as one closure on the blocking pool, each
//! on a connection leased from a small pool.  With WAL enabled, readers do
//! not wait on each other or on a writer; writers serialize on SQLite's
//! write lock through their `IMMEDIATE` transactions and the busy timeout.
//!
//! An in-memory database exists only inside its one connection, so a pool
//! built around one holds exactly that connection.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use civic_store::Database;

use crate::error::ServerError;

#[derive(Clone)]
pub struct Db(Arc<Pool>);

struct Pool {
    /// Where new connections come from; `None` for an in-memory database.
    path: Option<PathBuf>,
    max: usize,
    state: Mutex<PoolState>,
    returned: Condvar,
}

struct PoolState {
    idle: Vec<Database>,
    open: usize,
}

impl Db {
    /// Open the database at `path`, running migrations on the first
    /// connection.  Further connections are opened on demand, up to
    /// `max_connections`.
    pub fn open(path: &Path, max_connections: usize) -> Result<Self, civic_store::StoreError> {
        Ok(Self::new(Database::open_at(path)?, max_connections))
    }

    pub fn new(db: Database, max_connections: usize) -> Self {
        let path = db.path();
        let max = if path.is_some() {
            max_connections.max(1)
        } else {
            1
        };
        Self(Arc::new(Pool {
            path,
            max,
            state: Mutex::new(PoolState {
                idle: vec![db],
                open: 1,
            }),
            returned: Condvar::new(),
        }))
    }

    /// Run `f` against the database on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.0.clone();
        tokio::task::spawn_blocking(move || {
            let db = pool.checkout()?;
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(&db)));
            pool.checkin(db);
            result.unwrap_or_else(|payload| panic::resume_unwind(payload))
        })
        .await
        .map_err(|e| ServerError::Dependency(format!("blocking task failed: {e}")))?
    }
}

impl Pool {
    /// Take an idle connection, open a new one if below the cap, or wait
    /// for one to come back.
    fn checkout(&self) -> Result<Database, ServerError> {
        let mut state = self.lock()?;
        loop {
            if let Some(db) = state.idle.pop() {
                return Ok(db);
            }

            if let Some(path) = self.path.as_deref().filter(|_| state.open < self.max) {
                state.open += 1;
                let open = state.open;
                drop(state);
                return match Database::open_at(path) {
                    Ok(db) => {
                        tracing::debug!(open, "opened pooled connection");
                        Ok(db)
                    }
                    Err(e) => {
                        self.lock()?.open -= 1;
                        self.returned.notify_one();
                        Err(ServerError::Dependency(format!(
                            "failed to open database connection: {e}"
                        )))
                    }
                };
            }

            state = self
                .returned
                .wait(state)
                .map_err(|_| ServerError::Dependency("database pool poisoned".into()))?;
        }
    }

    fn checkin(&self, db: Database) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.idle.push(db);
        drop(state);
        self.returned.notify_one();
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>, ServerError> {
        self.state
            .lock()
            .map_err(|_| ServerError::Dependency("database pool poisoned".into()))
    }
}
