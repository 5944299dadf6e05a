//! In-memory engine for tests and offline use.
//!
//! Mirrors the engine's observable behaviour: ids are allocated on create,
//! attachment ids equal disk ids, lookups by id answer `NotFound`, and
//! attachments can be made to activate only after a number of reads.

use crate::api::OvirtApi;
use crate::error::{OvirtError, OvirtResult};
use crate::types::{Disk, DiskAttachment, StorageDetails, StorageDomain, Vm};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct EngineState {
    vms: Vec<Vm>,
    disks: Vec<Disk>,
    storage_domains: Vec<StorageDomain>,
    /// vm id -> attachments
    attachments: HashMap<String, Vec<DiskAttachment>>,
    /// attachment id -> reads left before it turns active
    pending_activation: HashMap<String, u32>,
    activation_delay: u32,
    injected: HashMap<String, OvirtError>,
    calls: HashMap<String, u32>,
}

impl EngineState {
    /// Count the call and return an injected failure, if any.
    fn enter(&mut self, op: &str) -> OvirtResult<()> {
        *self.calls.entry(op.to_string()).or_default() += 1;
        match self.injected.remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn vm_exists(&self, vm_id: &str) -> bool {
        self.vms.iter().any(|v| v.id == vm_id)
    }
}

/// A fully in-memory engine.
#[derive(Default)]
pub struct SimulatedEngine {
    state: Mutex<EngineState>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_vm(&self, name: &str) -> Vm {
        let vm = Vm {
            id: new_id(),
            name: name.to_string(),
            status: "up".to_string(),
            ..Default::default()
        };
        self.state.lock().await.vms.push(vm.clone());
        vm
    }

    pub async fn add_storage_domain(&self, name: &str, storage_type: &str) {
        self.state.lock().await.storage_domains.push(StorageDomain {
            name: name.to_string(),
            storage: Some(StorageDetails { storage_type: storage_type.to_string() }),
        });
    }

    pub async fn add_disk(&self, name: &str, size: u64) -> Disk {
        let disk = Disk {
            id: new_id(),
            name: name.to_string(),
            provisioned_size: Some(size),
            status: Some("ok".to_string()),
            ..Default::default()
        };
        self.state.lock().await.disks.push(disk.clone());
        disk
    }

    /// New attachments stay inactive for this many `get_attachment` reads.
    pub async fn set_activation_delay(&self, reads: u32) {
        self.state.lock().await.activation_delay = reads;
    }

    pub async fn set_attachment_active(&self, vm_id: &str, attachment_id: &str, active: bool) {
        let mut state = self.state.lock().await;
        state.pending_activation.remove(attachment_id);
        if let Some(a) = state
            .attachments
            .get_mut(vm_id)
            .and_then(|list| list.iter_mut().find(|a| a.id == attachment_id))
        {
            a.active = active;
        }
    }

    /// Fail the next call of `op` (an [`OvirtApi`] method name) with `err`.
    pub async fn fail_next(&self, op: &str, err: OvirtError) {
        self.state.lock().await.injected.insert(op.to_string(), err);
    }

    pub async fn call_count(&self, op: &str) -> u32 {
        self.state.lock().await.calls.get(op).copied().unwrap_or(0)
    }

    pub async fn disks(&self) -> Vec<Disk> {
        self.state.lock().await.disks.clone()
    }

    pub async fn attachments(&self, vm_id: &str) -> Vec<DiskAttachment> {
        self.state
            .lock()
            .await
            .attachments
            .get(vm_id)
            .cloned()
            .unwrap_or_default()
    }

    fn materialize_disk(disk: &Disk) -> Disk {
        Disk {
            id: new_id(),
            status: Some("ok".to_string()),
            actual_size: Some(0),
            ..disk.clone()
        }
    }
}

#[async_trait::async_trait]
impl OvirtApi for SimulatedEngine {
    async fn get_vm(&self, name: &str) -> OvirtResult<Option<Vm>> {
        let mut state = self.state.lock().await;
        state.enter("get_vm")?;
        Ok(state.vms.iter().find(|v| v.name == name).cloned())
    }

    async fn get_disk_by_name(&self, name: &str) -> OvirtResult<Vec<Disk>> {
        let mut state = self.state.lock().await;
        state.enter("get_disk_by_name")?;
        Ok(state.disks.iter().filter(|d| d.name == name).cloned().collect())
    }

    async fn get_disk(&self, id: &str) -> OvirtResult<Disk> {
        let mut state = self.state.lock().await;
        state.enter("get_disk")?;
        state
            .disks
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| OvirtError::not_found(format!("disks/{id}")))
    }

    async fn create_unattached_disk(&self, disk: &Disk) -> OvirtResult<Disk> {
        let mut state = self.state.lock().await;
        state.enter("create_unattached_disk")?;
        let created = Self::materialize_disk(disk);
        state.disks.push(created.clone());
        Ok(created)
    }

    async fn delete_disk(&self, id: &str) -> OvirtResult<()> {
        let mut state = self.state.lock().await;
        state.enter("delete_disk")?;
        let before = state.disks.len();
        state.disks.retain(|d| d.id != id);
        if state.disks.len() == before {
            return Err(OvirtError::not_found(format!("disks/{id}")));
        }
        Ok(())
    }

    async fn get_storage_domain(&self, name: &str) -> OvirtResult<Option<StorageDomain>> {
        let mut state = self.state.lock().await;
        state.enter("get_storage_domain")?;
        Ok(state.storage_domains.iter().find(|s| s.name == name).cloned())
    }

    async fn create_attachment(
        &self,
        vm_id: &str,
        attachment: &DiskAttachment,
    ) -> OvirtResult<DiskAttachment> {
        let mut state = self.state.lock().await;
        state.enter("create_attachment")?;
        if !state.vm_exists(vm_id) {
            return Err(OvirtError::not_found(format!("vms/{vm_id}/diskattachments")));
        }

        let disk_id = if attachment.disk.id.is_empty() {
            let created = Self::materialize_disk(&attachment.disk);
            let id = created.id.clone();
            state.disks.push(created);
            id
        } else if state.disks.iter().any(|d| d.id == attachment.disk.id) {
            attachment.disk.id.clone()
        } else {
            return Err(OvirtError::not_found(format!("disks/{}", attachment.disk.id)));
        };

        let list = state.attachments.entry(vm_id.to_string()).or_default();
        if list.iter().any(|a| a.id == disk_id) {
            return Err(OvirtError::api(409, format!("Disk {disk_id} is already attached")));
        }

        let delay = state.activation_delay;
        let created = DiskAttachment {
            id: disk_id.clone(),
            interface: Some(attachment.interface.clone().unwrap_or_default()),
            active: delay == 0,
            read_only: attachment.read_only,
            bootable: attachment.bootable,
            pass_discard: attachment.pass_discard,
            disk: Disk::reference(&disk_id),
        };
        state
            .attachments
            .entry(vm_id.to_string())
            .or_default()
            .push(created.clone());
        if delay > 0 {
            state.pending_activation.insert(disk_id, delay);
        }
        Ok(created)
    }

    async fn get_attachment(&self, vm_id: &str, attachment_id: &str) -> OvirtResult<DiskAttachment> {
        let mut state = self.state.lock().await;
        state.enter("get_attachment")?;

        let activate = match state.pending_activation.get_mut(attachment_id) {
            Some(left) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
            None => false,
        };
        if activate {
            state.pending_activation.remove(attachment_id);
        }

        let found = state
            .attachments
            .get_mut(vm_id)
            .and_then(|list| list.iter_mut().find(|a| a.id == attachment_id))
            .ok_or_else(|| {
                OvirtError::not_found(format!("vms/{vm_id}/diskattachments/{attachment_id}"))
            })?;
        if activate {
            found.active = true;
        }
        Ok(found.clone())
    }

    async fn list_attachments(&self, vm_id: &str) -> OvirtResult<Vec<DiskAttachment>> {
        let mut state = self.state.lock().await;
        state.enter("list_attachments")?;
        if !state.vm_exists(vm_id) {
            return Err(OvirtError::not_found(format!("vms/{vm_id}/diskattachments")));
        }
        Ok(state.attachments.get(vm_id).cloned().unwrap_or_default())
    }

    async fn delete_attachment(&self, vm_id: &str, attachment_id: &str) -> OvirtResult<()> {
        let mut state = self.state.lock().await;
        state.enter("delete_attachment")?;
        let list = state.attachments.entry(vm_id.to_string()).or_default();
        let before = list.len();
        list.retain(|a| a.id != attachment_id);
        if list.len() == before {
            return Err(OvirtError::not_found(format!(
                "vms/{vm_id}/diskattachments/{attachment_id}"
            )));
        }
        state.pending_activation.remove(attachment_id);
        Ok(())
    }
}
