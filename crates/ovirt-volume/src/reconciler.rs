//! Drives a volume's disk and its VM attachment toward the requested state.
//!
//! Every operation re-reads engine state before acting, so repeating a call
//! after a partial failure never creates a second disk or attachment.
//! Activation of a new attachment is asynchronous on the engine side;
//! [`AttachmentReconciler::wait_for_attach`] polls it with a bounded budget.

use crate::api::OvirtApi;
use crate::device;
use crate::error::{OvirtError, OvirtResult};
use crate::provisioning::default_disk_params_by;
use crate::retry::{poll_until, PollPolicy};
use crate::types::{
    to_engine_disk_name, AttachmentState, Disk, DiskAttachment, StorageDomains, Vm, VolumeSpec,
};
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Device resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Maps a `/dev/disk/by-id` link to the device node it points at.
#[async_trait::async_trait]
pub trait DeviceResolver: Send + Sync {
    async fn resolve(&self, device_path: &str) -> OvirtResult<String>;
}

/// Follows symlinks on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalizeResolver;

#[async_trait::async_trait]
impl DeviceResolver for CanonicalizeResolver {
    async fn resolve(&self, device_path: &str) -> OvirtResult<String> {
        let real = tokio::fs::canonicalize(device_path).await.map_err(|e| {
            OvirtError::io(format!("Cannot resolve device {device_path}: {e}"))
        })?;
        Ok(real.to_string_lossy().into_owned())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Reconciler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AttachmentReconciler<A: OvirtApi> {
    api: Arc<A>,
    resolver: Arc<dyn DeviceResolver>,
    poll: PollPolicy,
}

impl<A: OvirtApi> AttachmentReconciler<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            resolver: Arc::new(CanonicalizeResolver),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn DeviceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    async fn resolve_vm(&self, node: &str) -> OvirtResult<Vm> {
        if node.trim().is_empty() {
            return Err(OvirtError::config(format!("Invalid node name '{node}'")));
        }
        match self.api.get_vm(node).await? {
            Some(vm) if !vm.id.is_empty() => {
                log::debug!("node {node} is VM {} [{}]", vm.id, vm.addresses().join(", "));
                Ok(vm)
            }
            _ => Err(OvirtError::node_not_found(node)),
        }
    }

    async fn find_disk(&self, engine_name: &str) -> OvirtResult<Option<Disk>> {
        // An empty name search matches every disk
        if engine_name.trim().is_empty() {
            return Err(OvirtError::config(format!("Invalid volume name '{engine_name}'")));
        }
        Ok(self.api.get_disk_by_name(engine_name).await?.into_iter().next())
    }

    /// Current lifecycle state of `spec` on `node`.
    pub async fn observe(&self, spec: &VolumeSpec, node: &str) -> OvirtResult<AttachmentState> {
        let vm = self.resolve_vm(node).await?;
        let Some(disk) = self.find_disk(&spec.engine_disk_name()).await? else {
            return Ok(AttachmentState::Absent);
        };
        match self.api.get_attachment(&vm.id, &disk.id).await {
            Ok(a) if a.active => Ok(AttachmentState::Active),
            Ok(_) => Ok(AttachmentState::Attaching),
            Err(e) if e.is_not_found() => Ok(AttachmentState::Unattached),
            Err(e) => Err(e),
        }
    }

    /// Make sure the volume exists and is attached to `node`; returns the
    /// guest device path.
    pub async fn attach(&self, spec: &VolumeSpec, node: &str) -> OvirtResult<String> {
        let vm = self.resolve_vm(node).await?;
        let name = spec.engine_disk_name();
        let interface = spec.interface.clone().unwrap_or_default();

        let request = match self.find_disk(&name).await? {
            None => {
                log::info!("disk {name} does not exist, creating it attached to {node}");
                DiskAttachment {
                    interface: Some(interface.clone()),
                    active: true,
                    read_only: spec.is_read_only(),
                    disk: self.new_disk_payload(spec, &name).await?,
                    ..Default::default()
                }
            }
            Some(disk) => match self.api.get_attachment(&vm.id, &disk.id).await {
                Ok(existing) => {
                    log::debug!("disk {name} is already attached to {node}");
                    return device::device_path_for(&existing);
                }
                Err(e) if e.is_not_found() => {
                    log::info!("attaching existing disk {name} ({}) to {node}", disk.id);
                    DiskAttachment {
                        interface: Some(interface.clone()),
                        active: true,
                        read_only: spec.is_read_only(),
                        disk: Disk::reference(&disk.id),
                        ..Default::default()
                    }
                }
                Err(e) => return Err(e),
            },
        };

        let mut created = self.api.create_attachment(&vm.id, &request).await?;
        if created.interface.is_none() {
            created.interface = Some(interface);
        }
        device::device_path_for(&created)
    }

    async fn new_disk_payload(&self, spec: &VolumeSpec, name: &str) -> OvirtResult<Disk> {
        if spec.storage_domain.is_empty() {
            return Err(OvirtError::config(format!(
                "No storage domain given to create volume {name}"
            )));
        }
        let thin = spec.thin_provisioning.unwrap_or(false);
        let storage_type = if thin {
            self.api
                .get_storage_domain(&spec.storage_domain)
                .await?
                .ok_or_else(|| OvirtError::storage_domain_not_found(&spec.storage_domain))?
                .storage_type()
                .to_string()
        } else {
            String::new()
        };
        let (format, sparse) = default_disk_params_by(&storage_type, thin);

        Ok(Disk {
            name: name.to_string(),
            provisioned_size: Some(spec.size_bytes()?),
            format: Some(format),
            sparse: Some(sparse),
            storage_domains: StorageDomains::named(&spec.storage_domain),
            ..Default::default()
        })
    }

    /// Whether the volume's disk has an attachment on `node`.
    pub async fn is_attached(&self, spec: &VolumeSpec, node: &str) -> OvirtResult<bool> {
        let vm = self.resolve_vm(node).await?;
        let name = spec.engine_disk_name();
        let disk = self
            .find_disk(&name)
            .await?
            .ok_or_else(|| OvirtError::disk_not_found(&name))?;
        match self.api.get_attachment(&vm.id, &disk.id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Wait until the attachment behind `device_path` on `vm_name` is active
    /// and return the device node the link resolves to.
    pub async fn wait_for_attach(&self, device_path: &str, vm_name: &str) -> OvirtResult<String> {
        let fragment = device::extract_device_id(device_path);
        if fragment.is_empty() {
            return Err(OvirtError::attachment_not_found(format!(
                "Cannot derive a disk id from device path {device_path}"
            )));
        }

        let vm = self.resolve_vm(vm_name).await?;
        let attachment = self
            .api
            .list_attachments(&vm.id)
            .await?
            .into_iter()
            .find(|a| a.disk_id().starts_with(&fragment))
            .ok_or_else(|| {
                OvirtError::attachment_not_found(format!(
                    "No attachment on VM {vm_name} matches device {device_path}"
                ))
            })?;

        let api = &self.api;
        let vm_id = vm.id.as_str();
        let attachment_id = attachment.id.clone();
        let attachment_id = attachment_id.as_str();
        let outcome = poll_until(
            &self.poll,
            attachment,
            move || api.get_attachment(vm_id, attachment_id),
            |a| a.active,
        )
        .await?;

        if !outcome.is_ready() {
            return Err(OvirtError::attachment_not_active(format!(
                "Attachment {attachment_id} on VM {vm_name} is still inactive after {} checks",
                self.poll.attempts
            )));
        }

        let active = outcome.into_inner();
        log::info!("attachment {} on {vm_name} is active ({})", active.id, active.interface_str());
        self.resolver.resolve(device_path).await
    }

    /// Remove the volume's attachment from `node`. The disk is kept.
    pub async fn detach(&self, volume_name: &str, node: &str) -> OvirtResult<()> {
        if volume_name.trim().is_empty() {
            return Err(OvirtError::config(format!("Invalid volume name '{volume_name}'")));
        }
        let vm = self.resolve_vm(node).await?;
        let name = to_engine_disk_name(volume_name);
        let disk = self
            .find_disk(&name)
            .await?
            .ok_or_else(|| OvirtError::disk_not_found(&name))?;
        log::info!("detaching disk {name} ({}) from {node}", disk.id);
        self.api.delete_attachment(&vm.id, &disk.id).await
    }

    /// Cluster-wide name of a volume attached to `vm_name`: the engine disk
    /// name, which `detach` accepts back.
    pub async fn volume_name_for(&self, spec: &VolumeSpec, vm_name: &str) -> OvirtResult<String> {
        let vm = self.resolve_vm(vm_name).await?;
        let name = spec.engine_disk_name();
        let disk = self
            .find_disk(&name)
            .await?
            .ok_or_else(|| OvirtError::disk_not_found(&name))?;
        match self.api.get_attachment(&vm.id, &disk.id).await {
            Ok(_) => Ok(name),
            Err(e) if e.is_not_found() => Err(OvirtError::attachment_not_found(format!(
                "Disk {name} is not attached to VM {vm_name}"
            ))),
            Err(e) => Err(e),
        }
    }
}
