use flexdriver_lib::cli::Command;
use flexdriver_lib::handle;
use flexdriver_lib::response::FlexStatus;
use ovirt_volume::reconciler::DeviceResolver;
use ovirt_volume::retry::PollPolicy;
use ovirt_volume::simulated::SimulatedEngine;
use ovirt_volume::{OvirtErrorKind, OvirtResult, OvirtVolumeService};
use std::sync::Arc;

struct Identity;

#[async_trait::async_trait]
impl DeviceResolver for Identity {
    async fn resolve(&self, device_path: &str) -> OvirtResult<String> {
        Ok(device_path.to_string())
    }
}

async fn service() -> (Arc<SimulatedEngine>, OvirtVolumeService<SimulatedEngine>) {
    let engine = Arc::new(SimulatedEngine::new());
    engine.add_vm("worker-1").await;
    engine.add_storage_domain("data1", "nfs").await;
    let svc = OvirtVolumeService::with_api(engine.clone(), "worker-1")
        .with_resolver(Arc::new(Identity))
        .with_poll_policy(PollPolicy::immediate(3));
    (engine, svc)
}

const OPTIONS: &str = r#"{
    "kubernetes.io/fsType": "ext4",
    "kubernetes.io/readwrite": "rw",
    "ovirtStorageDomain": "data1",
    "ovirtVolumeName": "pvc~0001",
    "ovirtVolumeSize": "1G"
}"#;

#[tokio::test]
async fn init_reports_capabilities() {
    let (_, svc) = service().await;
    let r = handle(&svc, &Command::Init).await.unwrap();
    assert_eq!(r.status, FlexStatus::Success);
    assert!(r.capabilities.unwrap().attach);
}

#[tokio::test]
async fn attach_wait_and_lookup_flow() {
    let (engine, svc) = service().await;

    let attached = handle(
        &svc,
        &Command::Attach { json_options: OPTIONS.into(), node_name: "worker-1".into() },
    )
    .await
    .unwrap();
    let device = attached.device.clone().unwrap();
    assert!(device.starts_with("/dev/disk/by-id/scsi-0QEMU_QEMU_HARDDISK_"));
    assert_eq!(engine.disks().await[0].name, "pvc_0001");

    let waited = handle(
        &svc,
        &Command::WaitForAttach { device_path: device.clone(), json_options: None },
    )
    .await
    .unwrap();
    assert_eq!(waited.device.as_deref(), Some(device.as_str()));

    let name = handle(&svc, &Command::GetVolumeName { json_options: OPTIONS.into() })
        .await
        .unwrap();
    let volume_name = name.volume_name.unwrap();
    assert_eq!(volume_name, "pvc_0001");

    let is = handle(
        &svc,
        &Command::IsAttached { json_options: OPTIONS.into(), node_name: "worker-1".into() },
    )
    .await
    .unwrap();
    assert_eq!(is.attached, Some(true));

    let detached = handle(
        &svc,
        &Command::Detach { volume_name, node_name: "worker-1".into() },
    )
    .await
    .unwrap();
    assert_eq!(detached.status, FlexStatus::Success);

    let is = handle(
        &svc,
        &Command::IsAttached { json_options: OPTIONS.into(), node_name: "worker-1".into() },
    )
    .await
    .unwrap();
    assert_eq!(is.attached, Some(false));
}

#[tokio::test]
async fn bad_options_fail_to_parse() {
    let (_, svc) = service().await;
    let err = handle(
        &svc,
        &Command::Attach { json_options: "{not json".into(), node_name: "worker-1".into() },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, OvirtErrorKind::ParseError);
}

#[tokio::test]
async fn unknown_node_is_failure() {
    let (_, svc) = service().await;
    let err = handle(
        &svc,
        &Command::Attach { json_options: OPTIONS.into(), node_name: "worker-9".into() },
    )
    .await
    .unwrap_err();
    let r: flexdriver_lib::response::FlexResponse = err.into();
    assert_eq!(r.status, FlexStatus::Failure);
    assert_eq!(r.message, "VM worker-9 doesn't exist");
}

#[tokio::test]
async fn mount_callouts_are_not_supported() {
    let (_, svc) = service().await;
    let r = handle(&svc, &Command::UnmountDevice { mount_dir: "/mnt/x".into() })
        .await
        .unwrap();
    assert_eq!(r.status, FlexStatus::NotSupported);
}

#[tokio::test]
async fn create_and_delete_volume() {
    let (engine, svc) = service().await;
    let created = handle(
        &svc,
        &Command::CreateVolume {
            name: "pvc-7".into(),
            storage_domain: "data1".into(),
            size: "512M".into(),
            thick: false,
            read_only: false,
        },
    )
    .await
    .unwrap();
    let id = created.volume_name.unwrap();
    assert_eq!(engine.disks().await[0].provisioned_size, Some(512 << 20));

    handle(&svc, &Command::DeleteVolume { disk_id: id.clone() }).await.unwrap();
    // Second delete is a no-op
    handle(&svc, &Command::DeleteVolume { disk_id: id }).await.unwrap();
    assert!(engine.disks().await.is_empty());
}
