//! [`OvirtApi`] over the engine REST API.

use crate::api::{search_query, OvirtApi};
use crate::client::ResourceClient;
use crate::error::OvirtResult;
use crate::types::{
    Disk, DiskAttachment, DiskAttachmentList, DiskList, StorageDomain, StorageDomainList, Vm,
    VmList,
};

#[async_trait::async_trait]
impl OvirtApi for ResourceClient {
    async fn ensure_authenticated(&self) -> OvirtResult<()> {
        ResourceClient::ensure_authenticated(self).await
    }

    async fn get_vm(&self, name: &str) -> OvirtResult<Option<Vm>> {
        let list: VmList = self.get_json(&search_query("vms", "name", name)).await?;
        Ok(list.vm.into_iter().next())
    }

    async fn get_disk_by_name(&self, name: &str) -> OvirtResult<Vec<Disk>> {
        let list: DiskList = self.get_json(&search_query("disks", "name", name)).await?;
        Ok(list.disk)
    }

    async fn get_disk(&self, id: &str) -> OvirtResult<Disk> {
        self.get_json(&format!("disks/{id}")).await
    }

    async fn create_unattached_disk(&self, disk: &Disk) -> OvirtResult<Disk> {
        log::info!("creating disk {}", disk.name);
        self.post_json("disks", disk).await
    }

    async fn delete_disk(&self, id: &str) -> OvirtResult<()> {
        log::info!("deleting disk {id}");
        self.delete(&format!("disks/{id}")).await?;
        Ok(())
    }

    async fn get_storage_domain(&self, name: &str) -> OvirtResult<Option<StorageDomain>> {
        let list: StorageDomainList = self
            .get_json(&search_query("storagedomains", "name", name))
            .await?;
        Ok(list.into_domains().next())
    }

    async fn create_attachment(
        &self,
        vm_id: &str,
        attachment: &DiskAttachment,
    ) -> OvirtResult<DiskAttachment> {
        self.post_json(&format!("vms/{vm_id}/diskattachments"), attachment)
            .await
    }

    async fn get_attachment(&self, vm_id: &str, attachment_id: &str) -> OvirtResult<DiskAttachment> {
        self.get_json(&format!("vms/{vm_id}/diskattachments/{attachment_id}"))
            .await
    }

    async fn list_attachments(&self, vm_id: &str) -> OvirtResult<Vec<DiskAttachment>> {
        let list: DiskAttachmentList = self
            .get_json(&format!("vms/{vm_id}/diskattachments"))
            .await?;
        Ok(list.disk_attachment)
    }

    async fn delete_attachment(&self, vm_id: &str, attachment_id: &str) -> OvirtResult<()> {
        self.delete(&format!("vms/{vm_id}/diskattachments/{attachment_id}"))
            .await?;
        Ok(())
    }
}
