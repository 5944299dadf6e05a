//! Engine capabilities used by the reconciler and volume manager.

use crate::error::OvirtResult;
use crate::types::{Disk, DiskAttachment, StorageDomain, Vm};

/// Typed operations against the engine.
///
/// Lookups that address a resource by id surface a 404 as
/// `OvirtErrorKind::NotFound`; searches return empty results instead.
#[async_trait::async_trait]
pub trait OvirtApi: Send + Sync {
    /// Obtain or revalidate credentials before a batch of calls.
    async fn ensure_authenticated(&self) -> OvirtResult<()> {
        Ok(())
    }

    /// First VM named `name`, if any.
    async fn get_vm(&self, name: &str) -> OvirtResult<Option<Vm>>;

    /// All disks named `name`.
    async fn get_disk_by_name(&self, name: &str) -> OvirtResult<Vec<Disk>>;

    async fn get_disk(&self, id: &str) -> OvirtResult<Disk>;

    /// POST `disks`; the engine allocates the id.
    async fn create_unattached_disk(&self, disk: &Disk) -> OvirtResult<Disk>;

    async fn delete_disk(&self, id: &str) -> OvirtResult<()>;

    async fn get_storage_domain(&self, name: &str) -> OvirtResult<Option<StorageDomain>>;

    /// POST `vms/{vm}/diskattachments`. Creates the disk too when the
    /// payload carries no disk id.
    async fn create_attachment(
        &self,
        vm_id: &str,
        attachment: &DiskAttachment,
    ) -> OvirtResult<DiskAttachment>;

    async fn get_attachment(&self, vm_id: &str, attachment_id: &str) -> OvirtResult<DiskAttachment>;

    async fn list_attachments(&self, vm_id: &str) -> OvirtResult<Vec<DiskAttachment>>;

    async fn delete_attachment(&self, vm_id: &str, attachment_id: &str) -> OvirtResult<()>;
}

/// Encode a `search=` expression for a query string.
pub fn search_query(collection: &str, field: &str, value: &str) -> String {
    let expr = format!("{field}={value}");
    let encoded: String = url::form_urlencoded::byte_serialize(expr.as_bytes()).collect();
    format!("{collection}?search={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_values_are_encoded() {
        assert_eq!(search_query("vms", "name", "host1"), "vms?search=name%3Dhost1");
        assert_eq!(
            search_query("disks", "name", "pvc a&b"),
            "disks?search=name%3Dpvc+a%26b"
        );
    }
}
