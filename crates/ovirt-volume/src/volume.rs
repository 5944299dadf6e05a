//! Creation and removal of unattached disks.

use crate::api::OvirtApi;
use crate::error::{OvirtError, OvirtResult};
use crate::provisioning::default_disk_params_by;
use crate::types::{Disk, StorageDomains};
use std::sync::Arc;

/// Parameters for a new disk.
#[derive(Debug, Clone)]
pub struct DiskRequest {
    pub name: String,
    pub storage_domain: String,
    pub size_bytes: u64,
    pub read_only: bool,
    pub thin: bool,
}

impl DiskRequest {
    pub fn new(name: &str, storage_domain: &str, size_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            storage_domain: storage_domain.to_string(),
            size_bytes,
            read_only: false,
            thin: true,
        }
    }
}

pub struct VolumeManager<A: OvirtApi> {
    api: Arc<A>,
}

impl<A: OvirtApi> VolumeManager<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// POST a new disk. Thin requests look up the domain to pick the format.
    pub async fn create_unattached_disk(&self, req: &DiskRequest) -> OvirtResult<Disk> {
        let storage_type = if req.thin {
            self.api
                .get_storage_domain(&req.storage_domain)
                .await?
                .ok_or_else(|| OvirtError::storage_domain_not_found(&req.storage_domain))?
                .storage_type()
                .to_string()
        } else {
            String::new()
        };
        let (format, sparse) = default_disk_params_by(&storage_type, req.thin);

        let disk = Disk {
            name: req.name.clone(),
            provisioned_size: Some(req.size_bytes),
            format: Some(format),
            sparse: Some(sparse),
            read_only: Some(req.read_only),
            storage_domains: StorageDomains::named(&req.storage_domain),
            ..Default::default()
        };
        self.api.create_unattached_disk(&disk).await
    }

    /// Create the disk unless one with the same name exists.
    pub async fn create_volume(&self, req: &DiskRequest) -> OvirtResult<Disk> {
        if let Some(existing) = self.api.get_disk_by_name(&req.name).await?.into_iter().next() {
            log::info!("volume {} already exists as disk {}", req.name, existing.id);
            return Ok(existing);
        }
        self.create_unattached_disk(req).await
    }

    /// Delete the disk; an already missing disk counts as deleted.
    pub async fn delete_volume(&self, id: &str) -> OvirtResult<()> {
        match self.api.get_disk(id).await {
            Ok(_) => self.delete_disk(id).await,
            Err(e) if e.is_not_found() => {
                log::info!("disk {id} is already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete_disk(&self, id: &str) -> OvirtResult<()> {
        self.api.delete_disk(id).await
    }
}
