//! In-memory record store for testing.
//!
//! Single process, no durability, with injectable faults per operation.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

use super::{RecordStore, StoreOp};
use crate::{Error, ErrorKind, Result, Workload};

fn poisoned<T>(_: PoisonError<T>) -> Error {
    ErrorKind::StoreError("memory store lock poisoned".into()).into()
}

#[derive(Default)]
struct Records {
    last_id: i64,
    workloads: BTreeMap<i64, Workload>,
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
    faults: Mutex<BTreeSet<StoreOp>>,
    calls: Mutex<Vec<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of this kind fail with a `StoreError`
    pub fn fail_on(&self, op: StoreOp) -> Result<()> {
        self.faults.lock().map_err(poisoned)?.insert(op);
        Ok(())
    }

    pub fn heal(&self, op: StoreOp) -> Result<()> {
        self.faults.lock().map_err(poisoned)?.remove(&op);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.records.lock().map_err(poisoned)?.workloads.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Result<Vec<StoreOp>> {
        Ok(self.calls.lock().map_err(poisoned)?.clone())
    }

    fn enter(&self, op: StoreOp) -> Result<()> {
        self.calls.lock().map_err(poisoned)?.push(op);
        if self.faults.lock().map_err(poisoned)?.contains(&op) {
            warn!("Injected {:?} fault", op);
            bail!(ErrorKind::StoreError(format!("{:?}: simulated fault", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Workload> {
        self.enter(StoreOp::Find)?;
        let recs = self.records.lock().map_err(poisoned)?;
        match recs.workloads.get(&id) {
            Some(wl) => Ok(wl.clone()),
            None => bail!(ErrorKind::NotFound(format!("workload {}", id))),
        }
    }

    async fn create(&self, wl: &Workload) -> Result<i64> {
        self.enter(StoreOp::Create)?;
        let mut recs = self.records.lock().map_err(poisoned)?;
        recs.last_id += 1;
        let id = recs.last_id;
        let mut stored = wl.clone();
        stored.id = id;
        recs.workloads.insert(id, stored);
        Ok(id)
    }

    async fn update(&self, wl: &Workload) -> Result<()> {
        self.enter(StoreOp::Update)?;
        let mut recs = self.records.lock().map_err(poisoned)?;
        match recs.workloads.get_mut(&wl.id) {
            Some(existing) => {
                *existing = wl.clone();
                Ok(())
            }
            None => bail!(ErrorKind::NotFound(format!("workload {}", wl.id))),
        }
    }

    // the map holds a workload with its ports and env, so one remove is atomic
    async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.enter(StoreOp::Delete)?;
        let mut recs = self.records.lock().map_err(poisoned)?;
        match recs.workloads.remove(&id) {
            Some(_) => Ok(()),
            None => bail!(ErrorKind::NotFound(format!("workload {}", id))),
        }
    }

    async fn find_all(&self) -> Result<Vec<Workload>> {
        self.enter(StoreOp::FindAll)?;
        let recs = self.records.lock().map_err(poisoned)?;
        Ok(recs.workloads.values().cloned().collect())
    }
}
