use crate::kubeapi::Gateway;
use crate::service::Reconciler;
use crate::store::RecordStore;
use crate::{AllWorkload, Response, Result, WorkloadId, WorkloadInfo};

/// Request handler in front of a `Reconciler`
///
/// Turns request messages into reconciler calls and results into response messages.
/// Errors are logged here and passed on untouched.
pub struct WorkloadHandler<G, S> {
    rec: Reconciler<G, S>,
}

fn logged<T>(what: &str, res: Result<T>) -> Result<T> {
    if let Err(e) = &res {
        error!("{} failed: {}", what, e);
    }
    res
}

/// Read one workload straight from a record store
///
/// Reads never involve kubernetes, so they do not need a gateway.
pub async fn workload_info<S: RecordStore>(store: &S, req: WorkloadId) -> Result<WorkloadInfo> {
    let wl = logged(&format!("find {}", req.id), store.find_by_id(req.id).await)?;
    Ok(wl.into())
}

/// Read every workload straight from a record store
pub async fn all_workload<S: RecordStore>(store: &S) -> Result<AllWorkload> {
    let wls = logged("find all", store.find_all().await)?;
    Ok(AllWorkload {
        workloads: wls.into_iter().map(WorkloadInfo::from).collect(),
    })
}

impl<G: Gateway, S: RecordStore> WorkloadHandler<G, S> {
    pub fn new(rec: Reconciler<G, S>) -> Self {
        WorkloadHandler { rec }
    }

    pub fn reconciler(&self) -> &Reconciler<G, S> {
        &self.rec
    }

    pub async fn add_workload(&self, req: WorkloadInfo) -> Result<Response> {
        let name = format!("add {}/{}", req.namespace, req.name);
        let id = logged(&name, self.rec.add(req).await)?;
        Ok(Response {
            msg: format!("created workload {}", id),
            id: Some(id),
        })
    }

    pub async fn update_workload(&self, req: WorkloadInfo) -> Result<Response> {
        let name = format!("update {}/{}", req.namespace, req.name);
        let id = req.id;
        logged(&name, self.rec.update(req).await)?;
        Ok(Response {
            msg: "updated workload".into(),
            id,
        })
    }

    pub async fn delete_workload(&self, req: WorkloadId) -> Result<Response> {
        logged(&format!("delete {}", req.id), self.rec.delete(req.id).await)?;
        Ok(Response {
            msg: format!("deleted workload {}", req.id),
            id: Some(req.id),
        })
    }

    pub async fn find_workload_by_id(&self, req: WorkloadId) -> Result<WorkloadInfo> {
        workload_info(self.rec.store(), req).await
    }

    pub async fn find_all_workload(&self) -> Result<AllWorkload> {
        all_workload(self.rec.store()).await
    }
}
