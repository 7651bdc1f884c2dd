use async_trait::async_trait;
use rusqlite::{params, Connection, Row, Transaction, NO_PARAMS};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::RecordStore;
use crate::{Config, EnvVar, Error, ErrorKind, Port, PortProtocol, PullPolicy, Result, ResultExt, Workload};

static SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workload (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    namespace       TEXT NOT NULL,
    image           TEXT NOT NULL,
    replicas        INTEGER NOT NULL,
    cpu_max         REAL NOT NULL,
    memory_max      REAL NOT NULL,
    pull_policy     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS workload_namespace_name_index ON workload (namespace, name);
CREATE TABLE IF NOT EXISTS workload_port (
    workload_id     INTEGER NOT NULL,
    position        INTEGER NOT NULL,
    container_port  INTEGER NOT NULL,
    protocol        TEXT NOT NULL,
    PRIMARY KEY (workload_id, position)
);
CREATE TABLE IF NOT EXISTS workload_env (
    workload_id     INTEGER NOT NULL,
    position        INTEGER NOT NULL,
    env_key         TEXT NOT NULL,
    env_value       TEXT NOT NULL,
    PRIMARY KEY (workload_id, position)
);";

static SELECT_WORKLOAD: &str =
    "SELECT id, name, namespace, image, replicas, cpu_max, memory_max, pull_policy FROM workload";

/// Number of rows each table holds for one workload
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OwnedRows {
    pub workload: i64,
    pub ports: i64,
    pub env: i64,
}

impl OwnedRows {
    pub fn is_empty(&self) -> bool {
        self.workload == 0 && self.ports == 0 && self.env == 0
    }
}

/// Record store backed by sqlite
///
/// Three tables keyed by workload identity: `workload`, `workload_port`, `workload_env`.
/// Every call runs on the blocking pool against a single shared connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the database file from config and make sure the tables exist
    pub async fn open(conf: &Config) -> Result<Self> {
        info!("Opening record store {}", conf.database);
        let conn = Connection::open(&conf.database)
            .chain_err(|| ErrorKind::StoreError(format!("open {}", conf.database)))?;
        Self::setup(conn, conf.timeout()).await
    }

    /// A throwaway database, mostly for tests
    pub async fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().chain_err(|| ErrorKind::StoreError("open in-memory database".into()))?;
        Self::setup(conn, Config::default().timeout()).await
    }

    async fn setup(conn: Connection, timeout: Duration) -> Result<Self> {
        conn.busy_timeout(timeout)
            .chain_err(|| ErrorKind::StoreError("set busy timeout".into()))?;
        let store = SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_tables().await?;
        Ok(store)
    }

    /// Create the three tables if they are missing
    pub async fn init_tables(&self) -> Result<()> {
        self.execute_batch(SCHEMA).await
    }

    /// Run raw sql against the store
    pub async fn execute_batch(&self, sql: &'static str) -> Result<()> {
        self.blocking("execute batch", move |conn| {
            conn.execute_batch(sql)
                .chain_err(|| ErrorKind::StoreError("execute batch".into()))
        })
        .await
    }

    /// Count the rows held for a workload across all three tables
    pub async fn owned_rows(&self, id: i64) -> Result<OwnedRows> {
        self.blocking("count rows", move |conn| {
            let count = |sql: &str| -> Result<i64> {
                conn.query_row(sql, params![id], |row| row.get(0))
                    .chain_err(|| ErrorKind::StoreError(format!("count rows for workload {}", id)))
            };
            Ok(OwnedRows {
                workload: count("SELECT COUNT(*) FROM workload WHERE id = ?1")?,
                ports: count("SELECT COUNT(*) FROM workload_port WHERE workload_id = ?1")?,
                env: count("SELECT COUNT(*) FROM workload_env WHERE workload_id = ?1")?,
            })
        })
        .await
    }

    // run sqlite work on the blocking pool
    //
    // A panic inside `f` drops any open transaction, which rolls it back,
    // and surfaces here as a StoreError. The connection stays usable after that,
    // so a lock poisoned by the panic is taken over rather than refused.
    async fn blocking<T, F>(&self, op: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        let res = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Recovering sqlite connection after a panicked call");
                poisoned.into_inner()
            });
            f(&mut *guard)
        })
        .await;
        res.chain_err(|| ErrorKind::StoreError(format!("{} did not complete", op)))?
    }
}

fn row_to_workload(row: &Row<'_>) -> rusqlite::Result<Workload> {
    let cpu: f64 = row.get(5)?;
    let mem: f64 = row.get(6)?;
    let pp: String = row.get(7)?;
    Ok(Workload {
        id: row.get(0)?,
        name: row.get(1)?,
        namespace: row.get(2)?,
        image: row.get(3)?,
        replicas: row.get(4)?,
        cpu_max: cpu as f32,
        memory_max: mem as f32,
        pull_policy: PullPolicy::from_str_lossy(&pp),
        ports: vec![],
        env: vec![],
    })
}

fn load_ports(conn: &Connection, id: i64) -> rusqlite::Result<Vec<Port>> {
    let mut stmt = conn.prepare(
        "SELECT container_port, protocol FROM workload_port WHERE workload_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        let proto: String = row.get(1)?;
        Ok(Port::new(row.get(0)?, PortProtocol::from_str_lossy(&proto)))
    })?;
    let ports = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ports)
}

fn load_env(conn: &Connection, id: i64) -> rusqlite::Result<Vec<EnvVar>> {
    let mut stmt =
        conn.prepare("SELECT env_key, env_value FROM workload_env WHERE workload_id = ?1 ORDER BY position")?;
    let rows = stmt.query_map(params![id], |row| {
        Ok(EnvVar {
            key: row.get(0)?,
            value: row.get(1)?,
        })
    })?;
    let env = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(env)
}

// preload the owned rows of a workload
fn fill_owned(conn: &Connection, wl: &mut Workload) -> Result<()> {
    wl.ports = load_ports(conn, wl.id)
        .chain_err(|| ErrorKind::StoreError(format!("load ports of workload {}", wl.id)))?;
    wl.env = load_env(conn, wl.id)
        .chain_err(|| ErrorKind::StoreError(format!("load env of workload {}", wl.id)))?;
    Ok(())
}

fn insert_owned(tx: &Transaction<'_>, wl: &Workload, id: i64) -> rusqlite::Result<()> {
    for (i, p) in wl.ports.iter().enumerate() {
        tx.execute(
            "INSERT INTO workload_port (workload_id, position, container_port, protocol) VALUES (?1, ?2, ?3, ?4)",
            params![id, i as i64, p.container_port, p.protocol.as_str()],
        )?;
    }
    for (i, e) in wl.env.iter().enumerate() {
        tx.execute(
            "INSERT INTO workload_env (workload_id, position, env_key, env_value) VALUES (?1, ?2, ?3, ?4)",
            params![id, i as i64, e.key, e.value],
        )?;
    }
    Ok(())
}

fn find_row(conn: &Connection, id: i64) -> Result<Workload> {
    let sql = format!("{} WHERE id = ?1", SELECT_WORKLOAD);
    let mut wl = match conn.query_row(&sql, params![id], row_to_workload) {
        Ok(wl) => wl,
        Err(rusqlite::Error::QueryReturnedNoRows) => bail!(ErrorKind::NotFound(format!("workload {}", id))),
        Err(e) => return Err(e).chain_err(|| ErrorKind::StoreError(format!("find workload {}", id))),
    };
    fill_owned(conn, &mut wl)?;
    Ok(wl)
}

fn insert_row(conn: &mut Connection, wl: &Workload) -> rusqlite::Result<i64> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO workload (name, namespace, image, replicas, cpu_max, memory_max, pull_policy)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            wl.name,
            wl.namespace,
            wl.image,
            wl.replicas,
            f64::from(wl.cpu_max),
            f64::from(wl.memory_max),
            wl.pull_policy.as_str()
        ],
    )?;
    let id = tx.last_insert_rowid();
    insert_owned(&tx, wl, id)?;
    tx.commit()?;
    Ok(id)
}

// Ok(false) when there is no such workload
fn update_row(conn: &mut Connection, wl: &Workload) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;
    let changed = tx.execute(
        "UPDATE workload SET name = ?2, namespace = ?3, image = ?4, replicas = ?5,
         cpu_max = ?6, memory_max = ?7, pull_policy = ?8 WHERE id = ?1",
        params![
            wl.id,
            wl.name,
            wl.namespace,
            wl.image,
            wl.replicas,
            f64::from(wl.cpu_max),
            f64::from(wl.memory_max),
            wl.pull_policy.as_str()
        ],
    )?;
    if changed == 0 {
        return Ok(false); // tx rolls back on drop
    }
    tx.execute("DELETE FROM workload_port WHERE workload_id = ?1", params![wl.id])?;
    tx.execute("DELETE FROM workload_env WHERE workload_id = ?1", params![wl.id])?;
    insert_owned(&tx, wl, wl.id)?;
    tx.commit()?;
    Ok(true)
}

/// The error for a delete statement that failed
///
/// Normally the statement's own error. A rollback that failed as well is fatal
/// and takes its place, with the rollback error as the cause.
fn failed_delete(id: i64, table: &str, cause: rusqlite::Error, rolled_back: rusqlite::Result<()>) -> Error {
    match rolled_back {
        Ok(()) => Error::with_chain(cause, ErrorKind::StoreError(format!("delete workload {} from {}", id, table))),
        Err(rbe) => {
            error!("Rollback of workload {} delete failed: {}", id, rbe);
            let op = format!("rollback of workload {} delete after '{}'", id, cause);
            Error::with_chain(rbe, ErrorKind::StoreError(op))
        }
    }
}

/// Remove a workload and its owned rows in one transaction
///
/// The first failing statement rolls back everything issued before it and
/// its error is returned. A rollback that itself fails is returned instead.
fn delete_rows(conn: &mut Connection, id: i64) -> Result<()> {
    let tx = conn
        .transaction()
        .chain_err(|| ErrorKind::StoreError(format!("begin delete of workload {}", id)))?;
    let statements = [
        ("workload", "DELETE FROM workload WHERE id = ?1"),
        ("workload_env", "DELETE FROM workload_env WHERE workload_id = ?1"),
        ("workload_port", "DELETE FROM workload_port WHERE workload_id = ?1"),
    ];
    for (table, sql) in statements.iter() {
        let res = tx.execute(sql, params![id]);
        match res {
            Ok(0) if *table == "workload" => {
                drop(tx);
                bail!(ErrorKind::NotFound(format!("workload {}", id)));
            }
            Ok(n) => trace!("Deleted {} rows of workload {} from {}", n, id, table),
            Err(e) => {
                warn!("Deleting workload {} from {} failed - rolling back", id, table);
                let rolled_back = tx.rollback();
                return Err(failed_delete(id, table, e, rolled_back));
            }
        }
    }
    tx.commit()
        .chain_err(|| ErrorKind::StoreError(format!("commit delete of workload {}", id)))
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find_by_id(&self, id: i64) -> Result<Workload> {
        self.blocking("find", move |conn| find_row(conn, id)).await
    }

    async fn create(&self, wl: &Workload) -> Result<i64> {
        let wl = wl.clone();
        let id = self
            .blocking("create", move |conn| {
                insert_row(conn, &wl).chain_err(|| ErrorKind::StoreError(format!("create workload {}", wl.name)))
            })
            .await?;
        debug!("Stored workload with id {}", id);
        Ok(id)
    }

    async fn update(&self, wl: &Workload) -> Result<()> {
        let wl = wl.clone();
        self.blocking("update", move |conn| {
            let found = update_row(conn, &wl)
                .chain_err(|| ErrorKind::StoreError(format!("update workload {}", wl.id)))?;
            if !found {
                bail!(ErrorKind::NotFound(format!("workload {}", wl.id)));
            }
            Ok(())
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.blocking("delete", move |conn| delete_rows(conn, id)).await
    }

    async fn find_all(&self) -> Result<Vec<Workload>> {
        self.blocking("find all", move |conn| {
            let mut wls = {
                let sql = format!("{} ORDER BY id", SELECT_WORKLOAD);
                let mut stmt = conn
                    .prepare(&sql)
                    .chain_err(|| ErrorKind::StoreError("list workloads".into()))?;
                let rows = stmt
                    .query_map(NO_PARAMS, row_to_workload)
                    .chain_err(|| ErrorKind::StoreError("list workloads".into()))?;
                let res = rows
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .chain_err(|| ErrorKind::StoreError("list workloads".into()))?;
                res
            };
            for wl in &mut wls {
                fill_owned(conn, wl)?;
            }
            Ok(wls)
        })
        .await
    }
}
