//! Aggregate service façade for the volume crate.
//!
//! `OvirtVolumeService` owns the engine handle, the attachment reconciler
//! and the volume manager, and knows which VM this host runs in.

use crate::api::OvirtApi;
use crate::client::ResourceClient;
use crate::error::OvirtResult;
use crate::reconciler::{AttachmentReconciler, DeviceResolver};
use crate::retry::PollPolicy;
use crate::session::OvirtSession;
use crate::token_store::TokenStore;
use crate::types::{AttachmentState, ConnectionConfig, Disk, VolumeSpec};
use crate::volume::{DiskRequest, VolumeManager};
use std::sync::Arc;

pub struct OvirtVolumeService<A: OvirtApi = ResourceClient> {
    api: Arc<A>,
    reconciler: AttachmentReconciler<A>,
    volumes: VolumeManager<A>,
    vm_name: String,
}

impl OvirtVolumeService<ResourceClient> {
    /// Service talking to a real engine. No request is sent until the
    /// first operation.
    pub fn connect(
        config: ConnectionConfig,
        store: Arc<dyn TokenStore>,
        vm_name: &str,
    ) -> OvirtResult<Self> {
        let session = OvirtSession::new(config, store)?;
        Ok(Self::with_api(Arc::new(ResourceClient::new(session)), vm_name))
    }
}

impl<A: OvirtApi> OvirtVolumeService<A> {
    pub fn with_api(api: Arc<A>, vm_name: &str) -> Self {
        Self {
            reconciler: AttachmentReconciler::new(api.clone()),
            volumes: VolumeManager::new(api.clone()),
            api,
            vm_name: vm_name.to_string(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn DeviceResolver>) -> Self {
        self.reconciler = self.reconciler.with_resolver(resolver);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.reconciler = self.reconciler.with_poll_policy(poll);
        self
    }

    /// VM this host runs in.
    pub fn vm_name(&self) -> &str {
        &self.vm_name
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    // ── Attachments ─────────────────────────────────────────────────

    pub async fn attach(&self, spec: &VolumeSpec, node: &str) -> OvirtResult<String> {
        self.api.ensure_authenticated().await?;
        self.reconciler.attach(spec, node).await
    }

    pub async fn detach(&self, volume_name: &str, node: &str) -> OvirtResult<()> {
        self.api.ensure_authenticated().await?;
        self.reconciler.detach(volume_name, node).await
    }

    pub async fn is_attached(&self, spec: &VolumeSpec, node: &str) -> OvirtResult<bool> {
        self.api.ensure_authenticated().await?;
        self.reconciler.is_attached(spec, node).await
    }

    /// Wait for `device_path` to become active on this host's VM.
    pub async fn wait_for_attach(&self, device_path: &str) -> OvirtResult<String> {
        self.api.ensure_authenticated().await?;
        self.reconciler.wait_for_attach(device_path, &self.vm_name).await
    }

    /// Engine name of the volume attached to this host's VM.
    pub async fn volume_name(&self, spec: &VolumeSpec) -> OvirtResult<String> {
        self.api.ensure_authenticated().await?;
        self.reconciler.volume_name_for(spec, &self.vm_name).await
    }

    pub async fn state(&self, spec: &VolumeSpec, node: &str) -> OvirtResult<AttachmentState> {
        self.api.ensure_authenticated().await?;
        self.reconciler.observe(spec, node).await
    }

    // ── Volumes ─────────────────────────────────────────────────────

    pub async fn create_volume(&self, req: &DiskRequest) -> OvirtResult<Disk> {
        self.api.ensure_authenticated().await?;
        self.volumes.create_volume(req).await
    }

    pub async fn create_unattached_disk(&self, req: &DiskRequest) -> OvirtResult<Disk> {
        self.api.ensure_authenticated().await?;
        self.volumes.create_unattached_disk(req).await
    }

    pub async fn delete_volume(&self, id: &str) -> OvirtResult<()> {
        self.api.ensure_authenticated().await?;
        self.volumes.delete_volume(id).await
    }

    pub async fn delete_disk(&self, id: &str) -> OvirtResult<()> {
        self.api.ensure_authenticated().await?;
        self.volumes.delete_disk(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedEngine;
    use crate::token_store::MemoryTokenStore;

    struct Identity;

    #[async_trait::async_trait]
    impl DeviceResolver for Identity {
        async fn resolve(&self, device_path: &str) -> OvirtResult<String> {
            Ok(device_path.to_string())
        }
    }

    #[tokio::test]
    async fn uses_configured_vm_for_host_local_calls() {
        let engine = Arc::new(SimulatedEngine::new());
        engine.add_vm("worker-1").await;
        let svc = OvirtVolumeService::with_api(engine.clone(), "worker-1")
            .with_resolver(Arc::new(Identity))
            .with_poll_policy(PollPolicy::immediate(1));
        let spec = VolumeSpec::new("vol1", "data1");

        let path = svc.attach(&spec, "worker-1").await.unwrap();
        assert_eq!(svc.volume_name(&spec).await.unwrap(), "vol1");
        assert_eq!(svc.wait_for_attach(&path).await.unwrap(), path);
        assert_eq!(svc.state(&spec, "worker-1").await.unwrap(), AttachmentState::Active);

        svc.detach("vol1", "worker-1").await.unwrap();
        assert!(!svc.is_attached(&spec, "worker-1").await.unwrap());
    }

    #[tokio::test]
    async fn volume_round_trip() {
        let engine = Arc::new(SimulatedEngine::new());
        engine.add_storage_domain("nfs1", "nfs").await;
        let svc = OvirtVolumeService::with_api(engine.clone(), "worker-1");

        let disk = svc
            .create_volume(&DiskRequest::new("pvc-1", "nfs1", 1 << 30))
            .await
            .unwrap();
        svc.delete_volume(&disk.id).await.unwrap();
        assert!(engine.disks().await.is_empty());
    }

    #[test]
    fn connect_validates_url() {
        let cfg = ConnectionConfig { url: String::new(), ..Default::default() };
        let store = Arc::new(MemoryTokenStore::new());
        assert!(OvirtVolumeService::<ResourceClient>::connect(cfg, store, "vm").is_err());
    }
}
