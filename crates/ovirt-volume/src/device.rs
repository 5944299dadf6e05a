//! Guest device naming for attached disks.
//!
//! QEMU exposes the first characters of the disk id as the device serial,
//! and udev publishes it under `/dev/disk/by-id/`.

use crate::error::{OvirtError, OvirtResult};
use crate::types::DiskAttachment;

pub const BY_ID_DIR: &str = "/dev/disk/by-id";
pub const VIRTIO_PREFIX: &str = "virtio-";
pub const SCSI_PREFIX: &str = "scsi-0QEMU_QEMU_HARDDISK_";

/// Length of the serial QEMU reports for a disk.
pub const SHORT_ID_LEN: usize = 16;

/// First [`SHORT_ID_LEN`] characters of a disk id, or the whole id if shorter.
pub fn device_short_id(disk_id: &str) -> String {
    disk_id.chars().take(SHORT_ID_LEN).collect()
}

/// `/dev/disk/by-id` path for a short id on the given bus.
pub fn device_path(short_id: &str, interface: &str) -> OvirtResult<String> {
    match interface {
        "virtio" => Ok(format!("{BY_ID_DIR}/{VIRTIO_PREFIX}{short_id}")),
        "virtio_scsi" | "virtio_iscsi" => Ok(format!("{BY_ID_DIR}/{SCSI_PREFIX}{short_id}")),
        other => Err(OvirtError::unsupported_device(other)),
    }
}

pub fn device_path_for(attachment: &DiskAttachment) -> OvirtResult<String> {
    device_path(
        &device_short_id(attachment.disk_id()),
        attachment.interface_str(),
    )
}

/// Recover the short id from a device path; `""` when the name is unknown.
pub fn extract_device_id(path: &str) -> String {
    let name = path
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or("");

    if name.starts_with("scsi") {
        name.strip_prefix(SCSI_PREFIX).unwrap_or(name).to_string()
    } else if name.starts_with("virtio") {
        name.strip_prefix(VIRTIO_PREFIX).unwrap_or(name).to_string()
    } else {
        String::new()
    }
}
