//! Disk format defaults by storage backing.

use crate::types::{is_block_storage_type, DiskFormat};

/// `(format, sparse)` for a new disk on a domain of `storage_type`.
///
/// Thick disks are always raw and preallocated. Thin disks are sparse, and
/// block domains need qcow to be sparse at all.
pub fn default_disk_params_by(storage_type: &str, thin: bool) -> (DiskFormat, bool) {
    if !thin {
        return (DiskFormat::Raw, false);
    }
    if is_block_storage_type(storage_type) {
        (DiskFormat::Cow, true)
    } else {
        (DiskFormat::Raw, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thick_is_raw_preallocated() {
        for t in ["iscsi", "fc", "nfs", ""] {
            assert_eq!(default_disk_params_by(t, false), (DiskFormat::Raw, false));
        }
    }

    #[test]
    fn thin_on_block_is_cow() {
        assert_eq!(default_disk_params_by("iscsi", true), (DiskFormat::Cow, true));
        assert_eq!(default_disk_params_by("fc", true), (DiskFormat::Cow, true));
    }

    #[test]
    fn thin_on_file_is_sparse_raw() {
        assert_eq!(default_disk_params_by("nfs", true), (DiskFormat::Raw, true));
        assert_eq!(default_disk_params_by("glusterfs", true), (DiskFormat::Raw, true));
    }
}
